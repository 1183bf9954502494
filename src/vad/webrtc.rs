//! WebRTC-style VAD via the `earshot` crate.
//!
//! An ultra-fast rule-based classifier, using a chunking-and-majority-vote
//! trick for frame sizes that aren't a multiple of earshot's native
//! 240-sample (15 ms) chunk. Aggressiveness selects a distinct
//! `VoiceActivityProfile` — the four levels are meaningfully different
//! rather than all mapping onto `VERY_AGGRESSIVE`.

use super::{VadError, VadResult, VoiceActivityDetection};
use earshot::{VoiceActivityDetector, VoiceActivityProfile};
use parking_lot::Mutex;

/// earshot requires multiples of this many samples (15 ms @ 16 kHz).
const EARSHOT_CHUNK: usize = 240;

pub struct WebRtcVad {
    detector: Mutex<VoiceActivityDetector>,
    aggressiveness: u8,
}

impl WebRtcVad {
    pub fn new(aggressiveness: u8) -> Self {
        let aggressiveness = aggressiveness.min(3);
        let profile = match aggressiveness {
            0 => VoiceActivityProfile::QUALITY,
            1 => VoiceActivityProfile::LBR,
            2 => VoiceActivityProfile::AGGRESSIVE,
            _ => VoiceActivityProfile::VERY_AGGRESSIVE,
        };

        Self {
            detector: Mutex::new(VoiceActivityDetector::new(profile)),
            aggressiveness,
        }
    }

    fn confidence_for(&self, is_speech: bool) -> f32 {
        if is_speech {
            0.9 - (self.aggressiveness as f32 * 0.1)
        } else {
            0.1
        }
    }
}

impl Default for WebRtcVad {
    fn default() -> Self {
        Self::new(2)
    }
}

impl VoiceActivityDetection for WebRtcVad {
    fn name(&self) -> &'static str {
        "webrtc"
    }

    fn detect(&self, samples: &[i16]) -> Result<VadResult, VadError> {
        if samples.is_empty() {
            return Err(VadError::InvalidAudio("empty frame".into()));
        }

        let is_speech = if samples.len() % EARSHOT_CHUNK == 0 {
            let mut detector = self.detector.lock();
            detector
                .predict_16khz(samples)
                .map_err(|e| VadError::InferenceFailed(format!("{e:?}")))?
        } else {
            let mut speech_chunks = 0;
            let mut total_chunks = 0;
            for chunk in samples.chunks(EARSHOT_CHUNK) {
                if chunk.len() < EARSHOT_CHUNK {
                    continue;
                }
                let mut detector = self.detector.lock();
                if detector
                    .predict_16khz(chunk)
                    .map_err(|e| VadError::InferenceFailed(format!("{e:?}")))?
                {
                    speech_chunks += 1;
                }
                total_chunks += 1;
            }
            total_chunks > 0 && speech_chunks * 2 > total_chunks
        };

        Ok(VadResult {
            is_speech,
            confidence: self.confidence_for(is_speech),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_not_speech() {
        let vad = WebRtcVad::new(2);
        let silence = vec![0i16; 320];
        let result = vad.detect(&silence).unwrap();
        assert!(!result.is_speech);
    }

    #[test]
    fn aggressiveness_clamps_to_3() {
        let vad = WebRtcVad::new(10);
        assert_eq!(vad.aggressiveness, 3);
    }

    #[test]
    fn empty_samples_error() {
        let vad = WebRtcVad::new(2);
        assert!(vad.detect(&[]).is_err());
    }

    #[test]
    fn handles_non_multiple_of_earshot_chunk() {
        let vad = WebRtcVad::new(2);
        // 320 is not a multiple of 240 — exercises the chunk/majority-vote path.
        let samples = vec![0i16; 320];
        assert!(vad.detect(&samples).is_ok());
    }
}
