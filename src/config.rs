//! Process-wide configuration, read once from the environment at startup.
//!
//! Uses the familiar `env::var` + default idiom but centralizes every
//! tunable into one struct instead of scattering `env::var` calls through
//! the component modules.

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProviderKind {
    Auto,
    Dummy,
    OpenAi,
    Claude,
}

impl ChatProviderKind {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "dummy" => Self::Dummy,
            "openai" => Self::OpenAi,
            "claude" | "anthropic" => Self::Claude,
            _ => Self::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L1Language {
    Pl,
    Ru,
    Uk,
    Sr,
}

impl L1Language {
    fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "RU" => Self::Ru,
            "UK" => Self::Uk,
            "SR" => Self::Sr,
            _ => Self::Pl,
        }
    }

    /// The contrast-note lookup key used against `GrammarItem::contrast_notes`.
    pub fn code(self) -> &'static str {
        match self {
            L1Language::Pl => "PL",
            L1Language::Ru => "RU",
            L1Language::Uk => "UK",
            L1Language::Sr => "SR",
        }
    }
}

/// Configuration error — a malformed value is a startup failure (exit code 2).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is out of range: {reason}")]
    OutOfRange {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub whisper_model: String,
    pub vad_tail_ms: u64,
    pub vad_aggressiveness: u8,
    pub beam_size_partial: usize,
    pub beam_size_final: usize,
    pub no_speech_threshold: f32,
    pub chat_provider: ChatProviderKind,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub l1_language: L1Language,
    pub port: u16,
    pub content_dir: String,
    pub min_utt_ms: u64,
    pub max_utt_ms: u64,
    pub partial_interval_ms: u64,
    pub ws_backpressure_max_events: usize,
    pub ws_backpressure_max_bytes: usize,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub chat_timeout_secs: u64,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vad_aggressiveness: u8 = env_parse("ASR_VAD_AGGRESSIVENESS", 2);
        if vad_aggressiveness > 3 {
            return Err(ConfigError::OutOfRange {
                var: "ASR_VAD_AGGRESSIVENESS",
                value: vad_aggressiveness.to_string(),
                reason: "must be in 0..=3",
            });
        }

        let vad_tail_ms: u64 = env_parse("ASR_VAD_TAIL_MS", 250);
        if !(150..=600).contains(&vad_tail_ms) {
            return Err(ConfigError::OutOfRange {
                var: "ASR_VAD_TAIL_MS",
                value: vad_tail_ms.to_string(),
                reason: "must be in 150..=600",
            });
        }

        let no_speech_threshold: f32 = env_parse("ASR_NO_SPEECH_THRESHOLD", 0.6);
        if !(0.0..=1.0).contains(&no_speech_threshold) {
            return Err(ConfigError::OutOfRange {
                var: "ASR_NO_SPEECH_THRESHOLD",
                value: no_speech_threshold.to_string(),
                reason: "must be in 0.0..=1.0",
            });
        }

        Ok(Self {
            whisper_model: env_or("WHISPER_MODEL", "small"),
            vad_tail_ms,
            vad_aggressiveness,
            beam_size_partial: env_parse("ASR_BEAM_SIZE_PARTIAL", 1),
            beam_size_final: env_parse("ASR_BEAM_SIZE_FINAL", 3),
            no_speech_threshold,
            chat_provider: ChatProviderKind::parse(&env_or("CHAT_PROVIDER", "auto")),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            l1_language: L1Language::parse(&env_or("L1_LANGUAGE", "PL")),
            port: env_parse("PORT", 8000),
            content_dir: env_or("CONTENT_DIR", "content"),
            min_utt_ms: env_parse("ASR_MIN_UTT_MS", 300),
            max_utt_ms: env_parse("ASR_MAX_UTT_MS", 30_000),
            partial_interval_ms: env_parse("ASR_PARTIAL_INTERVAL_MS", 500),
            ws_backpressure_max_events: env_parse("WS_BACKPRESSURE_MAX_EVENTS", 64),
            ws_backpressure_max_bytes: env_parse("WS_BACKPRESSURE_MAX_BYTES", 262_144),
            heartbeat_interval_ms: env_parse("HEARTBEAT_INTERVAL_MS", 20_000),
            heartbeat_timeout_ms: env_parse("HEARTBEAT_TIMEOUT_MS", 40_000),
            chat_timeout_secs: env_parse("CHAT_TIMEOUT_SECS", 6),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l1_language_parse_defaults_to_pl() {
        assert_eq!(L1Language::parse("bogus"), L1Language::Pl);
        assert_eq!(L1Language::parse("ru"), L1Language::Ru);
    }

    #[test]
    fn chat_provider_parse_is_case_insensitive() {
        assert_eq!(ChatProviderKind::parse("OpenAI"), ChatProviderKind::OpenAi);
        assert_eq!(ChatProviderKind::parse("CLAUDE"), ChatProviderKind::Claude);
    }
}
