//! Anthropic Messages API adapter

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use promptcraft_core::{CompletionRequest, PromptcraftError, RawCompletion};

use super::{status_error, transport_error};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug)]
pub struct AnthropicAdapter {
    base_url: String,
    api_key: SecretString,
    http: Client,
}

impl AnthropicAdapter {
    /// The `http` client is shared with the other adapters so all calls draw
    /// from one connection pool.
    pub fn new(api_key: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: SecretString::new(api_key.into()),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    /// Single-user-turn request; the response text is the first content
    /// block. Usage counts come back already named input/output.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<RawCompletion, PromptcraftError> {
        let body = MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![MessageBody {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        };

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret().as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let response: MessagesResponse = response.json().await.map_err(transport_error)?;
        let text = response
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .unwrap_or_default();
        Ok(RawCompletion {
            text,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<MessageBody>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
