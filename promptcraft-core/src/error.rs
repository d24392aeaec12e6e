use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptcraftError {
    #[error("Template validation failed: {0}")]
    TemplateRejected(String),
    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),
    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
    #[error("Provider returned HTTP {status}: {message}")]
    ProviderStatus { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("LLM call failed after {attempts} attempts: {source}")]
    CallFailed {
        attempts: u32,
        #[source]
        source: Box<PromptcraftError>,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PromptcraftError {
    /// Transient errors are the only ones worth retrying: the same call may
    /// succeed on a later attempt. Everything else is deterministic given the
    /// same input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PromptcraftError::ProviderStatus { .. } | PromptcraftError::Transport(_)
        )
    }
}
