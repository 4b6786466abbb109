use super::conversation::ChatMessage;
use crate::error::{assistant_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Something that can continue a conversation
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> BotResult<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

/// Client for an OpenAI-compatible chat completion API
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }
}

/// Text of the first choice in a completion response
fn first_choice(response: &Value) -> BotResult<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| assistant_error("Completion response has no content"))
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> BotResult<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: 128,
            temperature: 0.5,
            top_p: 0.5,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(assistant_error(&format!(
                "Chat API returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        debug!("Chat completion usage: {}", json["usage"]);
        first_choice(&json)
    }
}
