//! Sandboxed prompt templating and resilient multi-provider LLM execution.
//!
//! The conventional flow: validate and render a template with
//! [`PromptTemplate`], send the rendered prompt through [`LlmClient`], and
//! persist the run with [`ExecutionTrail`]. The default provider pairing is
//! Anthropic with `claude-sonnet-4-20250514`.

pub use promptcraft_audit::{AuditError, ExecutionTrail};
pub use promptcraft_core::{
    Completion, CompletionRequest, PromptcraftError, Provider, RawCompletion, Value,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use promptcraft_llm::{
    calculate_cost, rates, retry_with_backoff, AnthropicAdapter, LlmClient, LlmClientBuilder,
    OpenAiAdapter, RetryPolicy,
};
pub use promptcraft_prompt::{
    merge_variables, sanitize_input, validate_template, validate_url, PromptTemplate, ScopePolicy,
};
