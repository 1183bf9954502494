//! Crate-wide error taxonomy.
//!
//! Each component boundary gets its own `thiserror` enum. The closed
//! `error.kind` strings sent to the client are produced by
//! `SessionError::wire_kind`.

use thiserror::Error;

pub use crate::vad::VadError;

#[derive(Error, Debug)]
pub enum AsrError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("transient decode failure: {0}")]
    Transient(String),
    #[error("fatal decode failure: {0}")]
    Fatal(String),
    #[error("invalid audio: {0}")]
    InvalidAudio(String),
}

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
    #[error("invalid text: {0}")]
    InvalidText(String),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("transient error: {0}")]
    Transient(String),
    #[error("fatal error: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("parse error in {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Session-fatal errors, surfaced to the client as `{"type":"error",...}`
/// then the socket is closed.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("malformed client frame: {0}")]
    Protocol(String),
    #[error("audio format violation: {0}")]
    AudioFormat(String),
    #[error("client too slow to keep up")]
    Backpressure,
}

impl SessionError {
    /// The closed `error.kind` string sent on the wire.
    pub fn wire_kind(&self) -> &'static str {
        match self {
            SessionError::Protocol(_) => "protocol",
            SessionError::AudioFormat(_) => "audio_format",
            SessionError::Backpressure => "backpressure",
        }
    }

    /// Whether this error terminates the session (only `AsrFatal`,
    /// `AudioFormat`, `Backpressure` are session-fatal).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Protocol(_))
    }
}
