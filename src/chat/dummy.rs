//! Deterministic chat provider used when no API credentials are configured
//! and in tests — never makes a network call.

use super::{ChatError, ChatMessage, ChatProvider};
use async_trait::async_trait;

pub struct DummyChat;

impl DummyChat {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for DummyChat {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _system_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let mut reply = if last_user.is_empty() {
            "Разбрах. Продължавай!".to_string()
        } else {
            format!("Добре те разбирам. Нека продължим: \"{last_user}\"")
        };

        // max_tokens is a rough word budget here; the dummy never grows the
        // fixed template beyond it.
        let word_budget = max_tokens.max(1) as usize;
        let words: Vec<&str> = reply.split_whitespace().collect();
        if words.len() > word_budget {
            reply = words[..word_budget].join(" ");
        }

        Ok(reply)
    }
}
