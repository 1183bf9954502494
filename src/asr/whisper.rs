//! Local Whisper decode over `whisper-rs`.
//!
//! Model discovery is a single env-var override plus a fixed search path —
//! no speed/quality preference ladder across several model sizes, just one
//! `WHISPER_MODEL` value that selects the model file directly.

use super::{AsrError, DecodeOpts, FinalResult, SpeechToAsr};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

const SAMPLE_RATE: usize = 16_000;
/// whisper.cpp rounds internally; padding to 1050ms avoids it reporting a
/// shorter segment than was actually decoded.
const WHISPER_MIN_MS: usize = 1050;

static WHISPER_CTX: OnceCell<Arc<Mutex<WhisperContext>>> = OnceCell::new();

pub struct WhisperAsr {
    model_path: PathBuf,
}

impl WhisperAsr {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_path: Self::resolve_model_path(model_id),
        }
    }

    fn search_dirs() -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from("models/whisper")];
        if let Some(data_dir) = dirs::data_dir() {
            dirs.push(data_dir.join("whisper"));
        }
        dirs.push(PathBuf::from("/usr/local/share/whisper"));
        dirs
    }

    fn resolve_model_path(model_id: &str) -> PathBuf {
        let file_name = format!("ggml-{model_id}.bin");
        for dir in Self::search_dirs() {
            let path = dir.join(&file_name);
            if path.exists() {
                info!("ASR: using model '{}' at {:?}", model_id, path);
                return path;
            }
        }
        warn!(
            "ASR: model '{}' not found under any search dir, expecting {}",
            model_id, file_name
        );
        PathBuf::from("models/whisper").join(file_name)
    }

    fn decode_sync(
        ctx: &Arc<Mutex<WhisperContext>>,
        mut samples: Vec<f32>,
        opts: DecodeOpts,
    ) -> Result<(String, u64), AsrError> {
        if samples.is_empty() {
            return Ok((String::new(), 0));
        }

        let min_samples = WHISPER_MIN_MS * SAMPLE_RATE / 1000;
        let duration_ms = (samples.len() * 1000 / SAMPLE_RATE) as u64;
        if samples.len() < min_samples {
            samples.resize(min_samples, 0.0);
        }

        let ctx_guard = ctx.lock();
        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: opts.beam_size,
            patience: -1.0,
        });
        params.set_language(Some("bg"));
        params.set_translate(false);
        params.set_no_context(true);
        params.set_single_segment(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_temperature(opts.temperature);
        params.set_no_speech_thold(opts.no_speech_threshold);
        params.set_n_threads(num_cpus::get().min(4) as i32);

        let mut state = ctx_guard
            .create_state()
            .map_err(|e| AsrError::Fatal(format!("create_state: {e}")))?;

        state
            .full(params, &samples)
            .map_err(|e| AsrError::Transient(format!("full: {e}")))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| AsrError::Transient(format!("segments: {e}")))?;

        let mut text = String::new();
        for i in 0..num_segments {
            let seg = state
                .full_get_segment_text(i)
                .map_err(|e| AsrError::Transient(format!("segment {i}: {e}")))?;
            text.push_str(&seg);
        }

        Ok((text.trim().to_string(), duration_ms))
    }
}

#[async_trait]
impl SpeechToAsr for WhisperAsr {
    fn name(&self) -> &'static str {
        "whisper"
    }

    async fn warm_up(&self) -> Result<(), AsrError> {
        if WHISPER_CTX.get().is_some() {
            return Ok(());
        }

        if !self.model_path.exists() {
            return Err(AsrError::ModelNotLoaded(format!(
                "model not found: {:?}",
                self.model_path
            )));
        }

        let path = self.model_path.clone();
        let ctx = tokio::task::spawn_blocking(move || {
            WhisperContext::new_with_params(
                path.to_str().unwrap_or(""),
                WhisperContextParameters::default(),
            )
        })
        .await
        .map_err(|e| AsrError::ModelNotLoaded(format!("join error: {e}")))?
        .map_err(|e| AsrError::ModelNotLoaded(e.to_string()))?;

        WHISPER_CTX
            .set(Arc::new(Mutex::new(ctx)))
            .map_err(|_| AsrError::ModelNotLoaded("context already set".into()))?;

        // Throwaway decode on silence so the first real turn doesn't pay
        // init cost.
        let ctx = WHISPER_CTX.get().unwrap().clone();
        let silence = vec![0.0f32; SAMPLE_RATE];
        let opts = DecodeOpts {
            beam_size: 1,
            temperature: 0.0,
            no_speech_threshold: 0.6,
        };
        tokio::task::spawn_blocking(move || Self::decode_sync(&ctx, silence, opts))
            .await
            .map_err(|e| AsrError::ModelNotLoaded(format!("warm-up join error: {e}")))??;

        info!("ASR: warm-up complete");
        Ok(())
    }

    async fn decode_partial(&self, audio: Vec<i16>, opts: DecodeOpts) -> Result<String, AsrError> {
        let ctx = WHISPER_CTX
            .get()
            .ok_or_else(|| AsrError::ModelNotLoaded("not warmed up".into()))?
            .clone();
        let samples = crate::audio::samples_to_f32(&audio);

        let result = tokio::task::spawn_blocking(move || Self::decode_sync(&ctx, samples, opts))
            .await
            .map_err(|e| AsrError::Transient(format!("join error: {e}")))?;

        match result {
            Ok((text, _)) => Ok(text),
            Err(AsrError::Transient(_)) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    async fn decode_final(
        &self,
        audio: Vec<i16>,
        opts: DecodeOpts,
    ) -> Result<FinalResult, AsrError> {
        let ctx = WHISPER_CTX
            .get()
            .ok_or_else(|| AsrError::ModelNotLoaded("not warmed up".into()))?
            .clone();
        let samples = crate::audio::samples_to_f32(&audio);

        let attempt = {
            let ctx = ctx.clone();
            let samples = samples.clone();
            tokio::task::spawn_blocking(move || Self::decode_sync(&ctx, samples, opts))
                .await
                .map_err(|e| AsrError::Transient(format!("join error: {e}")))?
        };

        let (text, duration_ms) = match attempt {
            Ok(pair) => pair,
            Err(AsrError::Transient(_)) => {
                let retry_opts = DecodeOpts {
                    beam_size: 1,
                    ..opts
                };
                let retry = tokio::task::spawn_blocking(move || {
                    Self::decode_sync(&ctx, samples, retry_opts)
                })
                .await
                .map_err(|e| AsrError::Transient(format!("join error: {e}")))?;

                // Second transient failure degrades this turn to an empty
                // final rather than surfacing an error.
                match retry {
                    Ok(pair) => pair,
                    Err(AsrError::Transient(_)) => (String::new(), 0),
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(FinalResult { text, duration_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_to_search_dir_even_when_missing() {
        let asr = WhisperAsr::new("small");
        assert!(asr.model_path.ends_with("ggml-small.bin"));
    }

    #[test]
    fn search_dirs_nonempty() {
        assert!(!WhisperAsr::search_dirs().is_empty());
    }
}
