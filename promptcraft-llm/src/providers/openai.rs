//! OpenAI Chat Completions API adapter

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use promptcraft_core::{CompletionRequest, PromptcraftError, RawCompletion};

use super::{status_error, transport_error};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Clone, Debug)]
pub struct OpenAiAdapter {
    base_url: String,
    api_key: SecretString,
    http: Client,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: SecretString::new(api_key.into()),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Single-user-turn chat request; the response text is the first choice's
    /// message content. `prompt_tokens`/`completion_tokens` are renamed to
    /// the unified input/output counts.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<RawCompletion, PromptcraftError> {
        let body = ChatCompletionRequest {
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
            .post(self.chat_completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let response: ChatCompletionResponse = response.json().await.map_err(transport_error)?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(RawCompletion {
            text,
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
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
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
