//! Voice Activity Detection.
//!
//! Trait-based so the binary classifier backing the segmenter can be
//! swapped, even though only one concrete implementation is wired up today.

pub mod segmenter;
pub mod webrtc;

pub use segmenter::{SegmenterEvent, VadSegmenter};
pub use webrtc::WebRtcVad;

#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("invalid audio: {0}")]
    InvalidAudio(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct VadResult {
    pub is_speech: bool,
    pub confidence: f32,
}

/// A frame-by-frame speech/non-speech classifier. Must never suspend —
/// classification is pure CPU-bound computation.
pub trait VoiceActivityDetection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classify one 20 ms frame (320 samples at 16 kHz).
    fn detect(&self, samples: &[i16]) -> Result<VadResult, VadError>;
}
