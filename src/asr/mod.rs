//! ASR Engine Adapter: a thread-safe handle over the decoder.
//!
//! This server needs only one decoder, not a swappable multi-backend
//! registry, so the `OnceCell`-backed global and the `Arc<dyn SpeechToAsr>`
//! handle remain but there's no runtime adapter selection.

pub mod scheduler;
pub mod whisper;

pub use scheduler::AsrScheduler;
pub use whisper::WhisperAsr;

use async_trait::async_trait;

pub use crate::error::AsrError;

/// Decode options shared by partial and final calls.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOpts {
    pub beam_size: i32,
    pub temperature: f32,
    pub no_speech_threshold: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FinalResult {
    pub text: String,
    pub duration_ms: u64,
}

/// A thread-safe handle over a speech decoder.
#[async_trait]
pub trait SpeechToAsr: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run a throwaway decode on silence so the first user turn isn't
    /// penalized by lazy init. Must complete before `/health` reports
    /// `asr_ready: true`.
    async fn warm_up(&self) -> Result<(), AsrError>;

    /// Fast, lower-beam decode over the accumulated audio so far. Called at
    /// most once at a time per session.
    async fn decode_partial(&self, audio: Vec<i16>, opts: DecodeOpts) -> Result<String, AsrError>;

    /// Exactly one call per completed utterance.
    async fn decode_final(
        &self,
        audio: Vec<i16>,
        opts: DecodeOpts,
    ) -> Result<FinalResult, AsrError>;
}
