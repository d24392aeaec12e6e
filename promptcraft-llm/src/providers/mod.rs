//! Per-provider request/response mappers. Adapters hold no retry logic; they
//! translate one wire format each and normalize token usage naming.

mod anthropic;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;

use promptcraft_core::PromptcraftError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Both provider families wrap failures in an `{"error": {"message": ...}}`
/// envelope; fall back to the raw body when it doesn't parse.
pub(crate) fn status_error(status: u16, body: &str) -> PromptcraftError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());
    PromptcraftError::ProviderStatus { status, message }
}

pub(crate) fn transport_error(err: reqwest::Error) -> PromptcraftError {
    PromptcraftError::Transport(err.to_string())
}
