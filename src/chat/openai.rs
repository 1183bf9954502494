//! OpenAI chat completion — plain text completion only (no tools, no
//! streaming, no model catalog).

use super::{ChatError, ChatMessage, ChatProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";

pub struct OpenAiChat {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");
        Self { api_key, client }
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let mut wire_messages = vec![json!({"role": "system", "content": system_prompt})];
        wire_messages.extend(
            messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content})),
        );

        let body = json!({
            "model": MODEL,
            "messages": wire_messages,
            "max_tokens": max_tokens,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Transient(format!("request timed out: {e}"))
                } else {
                    ChatError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ChatError::Transient(format!("openai returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Fatal(format!("openai returned {status}: {body}")));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Fatal(format!("failed to parse openai response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChatError::Fatal("no completion in openai response".into()))
    }
}
