//! Fallback synthesizer used when `espeak-ng` is not on `PATH` and in tests
//! — a duration-per-character silence model emitting a WAV container instead
//! of raw PCM, since the HTTP surface promises a decodable `audio/wav` body
//! regardless of backend.

use super::{SynthesisResult, TextToSpeech, TtsError};
use async_trait::async_trait;

const SAMPLE_RATE: u32 = 16_000;
const MS_PER_CHAR: u64 = 80;
const MIN_DURATION_MS: u64 = 200;
const MAX_DURATION_MS: u64 = 15_000;

pub struct SilenceTts;

impl SilenceTts {
    pub fn new() -> Self {
        Self
    }

    fn duration_ms(text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        (chars * MS_PER_CHAR).clamp(MIN_DURATION_MS, MAX_DURATION_MS)
    }
}

impl Default for SilenceTts {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a 16-bit PCM mono WAV file containing `num_samples` zero samples
/// at `SAMPLE_RATE`.
fn silent_wav(num_samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).expect("in-memory WAV writer never fails to open");
        for _ in 0..num_samples {
            writer.write_sample(0i16).expect("writing to an in-memory buffer never fails");
        }
        writer.finalize().expect("finalizing an in-memory WAV buffer never fails");
    }
    cursor.into_inner()
}

#[async_trait]
impl TextToSpeech for SilenceTts {
    fn name(&self) -> &'static str {
        "silence"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn synthesize(&self, text: &str) -> Result<SynthesisResult, TtsError> {
        if text.is_empty() {
            return Err(TtsError::InvalidText("text must not be empty".into()));
        }
        let duration_ms = Self::duration_ms(text);
        let num_samples = (SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
        Ok(SynthesisResult {
            audio: silent_wav(num_samples),
            content_type: "audio/wav",
        })
    }
}
