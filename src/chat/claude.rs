//! Anthropic chat completion — `x-api-key` header, separate `system` field,
//! `/v1/messages` shape.

use super::{ChatError, ChatMessage, ChatProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeChat {
    api_key: String,
    client: reqwest::Client,
}

impl ClaudeChat {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");
        Self { api_key, client }
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ChatProvider for ClaudeChat {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let wire_messages: Vec<_> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let body = json!({
            "model": MODEL,
            "system": system_prompt,
            "messages": wire_messages,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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
            return Err(ChatError::Transient(format!("anthropic returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Fatal(format!("anthropic returned {status}: {body}")));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Fatal(format!("failed to parse anthropic response: {e}")))?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|b| b.text)
            .ok_or_else(|| ChatError::Fatal("no content blocks in anthropic response".into()))
    }
}
