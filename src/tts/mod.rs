//! TTS Adapter: synthesizes spoken Bulgarian for the Coach's replies.
//!
//! One capability — `synthesize(text) -> (bytes, content_type)` — behind a
//! trait object, with a single external-process backend instead of a
//! swappable voice registry, since the Bulgarian-coaching surface never
//! needs voice selection.

pub mod espeak;
pub mod silence;

pub use espeak::EspeakTts;
pub use silence::SilenceTts;

use async_trait::async_trait;
use std::sync::Arc;

pub use crate::error::TtsError;

/// Picks `espeak-ng` when it's reachable on `PATH`, falling back to the
/// silent synthesizer otherwise — mirrors `chat::select_provider`'s
/// availability-gated fallback.
pub fn select_backend() -> Arc<dyn TextToSpeech> {
    let espeak = EspeakTts::new();
    if espeak.is_ready() {
        Arc::new(espeak)
    } else {
        Arc::new(SilenceTts::new())
    }
}

pub const MAX_TTS_TEXT_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub audio: Vec<u8>,
    pub content_type: &'static str,
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_ready(&self) -> bool;

    /// Synthesizes `text` (already validated to be non-empty and at most
    /// `MAX_TTS_TEXT_CHARS` characters) into audio bytes.
    async fn synthesize(&self, text: &str) -> Result<SynthesisResult, TtsError>;
}

/// Validates incoming request text against the synthesis length bound,
/// shared by both the HTTP surface and callers that bypass it in tests.
pub fn validate_text(text: &str) -> Result<(), TtsError> {
    if text.is_empty() {
        return Err(TtsError::InvalidText("text must not be empty".into()));
    }
    if text.chars().count() > MAX_TTS_TEXT_CHARS {
        return Err(TtsError::InvalidText(format!(
            "text exceeds {MAX_TTS_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_invalid() {
        assert!(validate_text("").is_err());
    }

    #[test]
    fn over_length_text_is_invalid() {
        let text: String = "а".repeat(MAX_TTS_TEXT_CHARS + 1);
        assert!(validate_text(&text).is_err());
    }

    #[test]
    fn in_range_text_is_valid() {
        assert!(validate_text("Здравей, как си?").is_ok());
    }
}
