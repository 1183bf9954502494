//! Chat Provider: a pluggable interface to an external LLM.
//!
//! One capability — `complete(messages, system_prompt, max_tokens) -> text`
//! — behind a trait object, with provider selection reduced to a fixed
//! `auto`-picks-first-available rule instead of a general registry.

pub mod claude;
pub mod dummy;
pub mod openai;

pub use claude::ClaudeChat;
pub use dummy::DummyChat;
pub use openai::OpenAiChat;

use crate::config::ChatProviderKind;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use crate::error::ChatError;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// The single capability required of every variant.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ChatError>;
}

/// Picks the provider per `CHAT_PROVIDER`, with `auto` selecting the first
/// variant whose credentials are present, falling back to `dummy`.
pub fn select_provider(
    kind: ChatProviderKind,
    openai_api_key: Option<&str>,
    anthropic_api_key: Option<&str>,
    timeout: Duration,
) -> Arc<dyn ChatProvider> {
    match kind {
        ChatProviderKind::Dummy => Arc::new(DummyChat::new()),
        ChatProviderKind::OpenAi => match openai_api_key {
            Some(key) => Arc::new(OpenAiChat::new(key.to_string(), timeout)),
            None => Arc::new(DummyChat::new()),
        },
        ChatProviderKind::Claude => match anthropic_api_key {
            Some(key) => Arc::new(ClaudeChat::new(key.to_string(), timeout)),
            None => Arc::new(DummyChat::new()),
        },
        ChatProviderKind::Auto => {
            if let Some(key) = openai_api_key {
                Arc::new(OpenAiChat::new(key.to_string(), timeout))
            } else if let Some(key) = anthropic_api_key {
                Arc::new(ClaudeChat::new(key.to_string(), timeout))
            } else {
                Arc::new(DummyChat::new())
            }
        }
    }
}

/// Runs `complete`, retrying exactly once on a transient error.
pub async fn complete_with_retry(
    provider: &dyn ChatProvider,
    messages: &[ChatMessage],
    system_prompt: &str,
    max_tokens: u32,
) -> Result<String, ChatError> {
    match provider.complete(messages, system_prompt, max_tokens).await {
        Ok(text) => Ok(text),
        Err(ChatError::Transient(_)) => provider.complete(messages, system_prompt, max_tokens).await,
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_falls_back_to_dummy_without_credentials() {
        let provider = select_provider(ChatProviderKind::Auto, None, None, Duration::from_secs(6));
        assert_eq!(provider.name(), "dummy");
    }

    #[test]
    fn auto_prefers_openai_when_both_present() {
        let provider = select_provider(
            ChatProviderKind::Auto,
            Some("sk-test"),
            Some("anthropic-test"),
            Duration::from_secs(6),
        );
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn explicit_provider_without_key_falls_back_to_dummy() {
        let provider = select_provider(ChatProviderKind::OpenAi, None, None, Duration::from_secs(6));
        assert_eq!(provider.name(), "dummy");
    }
}
