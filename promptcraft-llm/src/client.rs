use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use promptcraft_core::{
    Completion, CompletionRequest, PromptcraftError, Provider, RawCompletion,
};

use crate::pricing;
use crate::providers::{AnthropicAdapter, OpenAiAdapter};
use crate::retry::{retry_with_backoff, RetryPolicy};

const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
const TIMEOUT_VAR: &str = "LLM_TIMEOUT";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Keep-alive bound for the shared connection pool.
const MAX_IDLE_CONNECTIONS: usize = 5;

/// Unified client over both provider adapters.
///
/// One pooled HTTP transport is built at construction time and shared by the
/// adapters for the lifetime of the client; the configured timeout bounds
/// each individual attempt. Dropping the client releases the pool.
#[derive(Debug)]
pub struct LlmClient {
    anthropic: AnthropicAdapter,
    openai: OpenAiAdapter,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::default()
    }

    /// Builds a client from the process environment: `ANTHROPIC_API_KEY`,
    /// `OPENAI_API_KEY`, and `LLM_TIMEOUT` (seconds, default 30).
    pub fn from_env() -> Result<Self, PromptcraftError> {
        let mut builder = Self::builder();
        if let Ok(key) = env::var(ANTHROPIC_KEY_VAR) {
            builder = builder.anthropic_api_key(key);
        }
        if let Ok(key) = env::var(OPENAI_KEY_VAR) {
            builder = builder.openai_api_key(key);
        }
        if let Ok(raw) = env::var(TIMEOUT_VAR) {
            let seconds = raw
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or_else(|| {
                    PromptcraftError::InvalidConfig(format!(
                        "{TIMEOUT_VAR} must be a non-negative number of seconds, got '{raw}'"
                    ))
                })?;
            builder = builder.timeout(Duration::from_secs_f64(seconds));
        }
        builder.build()
    }

    /// Sends a rendered prompt to the requested provider, retrying transient
    /// failures, and returns the unified completion with cost attached.
    pub async fn generate(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, PromptcraftError> {
        tracing::debug!(
            provider = %request.provider,
            model = %request.model,
            max_tokens = request.max_tokens,
            "dispatching completion request"
        );
        let raw = retry_with_backoff(self.retry, || self.dispatch(&request)).await?;

        if pricing::rates(request.provider, &request.model).is_none() {
            tracing::warn!(
                provider = %request.provider,
                model = %request.model,
                "no pricing entry for model, recording zero cost"
            );
        }
        let cost_usd = pricing::calculate_cost(
            request.provider,
            &request.model,
            raw.input_tokens,
            raw.output_tokens,
        );
        tracing::info!(
            provider = %request.provider,
            model = %request.model,
            input_tokens = raw.input_tokens,
            output_tokens = raw.output_tokens,
            cost_usd,
            "completion received"
        );
        Ok(Completion {
            text: raw.text,
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            total_tokens: raw.input_tokens + raw.output_tokens,
            cost_usd,
            provider: request.provider,
            model: request.model,
        })
    }

    async fn dispatch(
        &self,
        request: &CompletionRequest,
    ) -> Result<RawCompletion, PromptcraftError> {
        match request.provider {
            Provider::Anthropic => self.anthropic.complete(request).await,
            Provider::OpenAi => self.openai.complete(request).await,
        }
    }
}

#[derive(Default)]
pub struct LlmClientBuilder {
    anthropic_api_key: Option<String>,
    openai_api_key: Option<String>,
    anthropic_base_url: Option<String>,
    openai_base_url: Option<String>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
}

impl fmt::Debug for LlmClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| if key.is_some() { "<redacted>" } else { "<none>" };
        f.debug_struct("LlmClientBuilder")
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("openai_base_url", &self.openai_base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl LlmClientBuilder {
    pub fn anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = Some(key.into());
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn anthropic_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.anthropic_base_url = Some(base_url.into());
        self
    }

    pub fn openai_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openai_base_url = Some(base_url.into());
        self
    }

    /// Per-attempt request timeout; the default is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<LlmClient, PromptcraftError> {
        for base_url in [&self.anthropic_base_url, &self.openai_base_url]
            .into_iter()
            .flatten()
        {
            Url::parse(base_url).map_err(|err| {
                PromptcraftError::InvalidConfig(format!("invalid base URL '{base_url}': {err}"))
            })?;
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .build()
            .map_err(|err| PromptcraftError::InvalidConfig(err.to_string()))?;

        // A missing key stays empty and surfaces as an auth failure from the
        // provider, matching how the credentials are injected in deployment.
        let mut anthropic =
            AnthropicAdapter::new(self.anthropic_api_key.unwrap_or_default(), http.clone());
        if let Some(base_url) = self.anthropic_base_url {
            anthropic = anthropic.with_base_url(base_url);
        }
        let mut openai = OpenAiAdapter::new(self.openai_api_key.unwrap_or_default(), http);
        if let Some(base_url) = self.openai_base_url {
            openai = openai.with_base_url(base_url);
        }

        Ok(LlmClient {
            anthropic,
            openai,
            retry: self.retry.unwrap_or_default(),
        })
    }
}
