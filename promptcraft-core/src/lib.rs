mod error;
mod types;
mod value;

pub use error::PromptcraftError;
pub use types::{
    Completion, CompletionRequest, Provider, RawCompletion, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use value::Value;
