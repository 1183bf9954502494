//! Utterance segmentation state machine.
//!
//! Turns a stream of per-frame VAD decisions into `SpeechStart` / `PartialTick`
//! / `Utterance` events via an explicit two-state machine with tail
//! hysteresis and a forced-close path for runaway utterances.

use super::{VadResult, VoiceActivityDetection};
use std::sync::Arc;
use std::time::Duration;

/// 20 ms per frame.
const FRAME_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterEvent {
    SpeechStart {
        turn_seq: u64,
    },
    PartialTick {
        turn_seq: u64,
        elapsed_ms: u64,
    },
    Utterance {
        turn_seq: u64,
        start_ms: u64,
        end_ms: u64,
        audio: Vec<i16>,
        truncated: bool,
    },
    /// A speech run ended before reaching `min_utt_ms` and was dropped
    /// without ever becoming an `Utterance`. Still closes out the
    /// `SpeechStart` the caller already saw, so the `speaking` flag the
    /// client observes always toggles back off.
    SpeechDropped {
        turn_seq: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Speaking,
}

/// Tunables controlling when an utterance starts, ticks, and closes.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    pub vad_tail_ms: u64,
    pub min_utt_ms: u64,
    pub max_utt_ms: u64,
    pub partial_interval_ms: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            vad_tail_ms: 250,
            min_utt_ms: 300,
            max_utt_ms: 30_000,
            partial_interval_ms: 500,
        }
    }
}

/// Frame-by-frame utterance segmenter for one session.
///
/// Not `Send`-shared: owned exclusively by the session's drive loop, which
/// exclusively owns all of that session's VAD state.
pub struct VadSegmenter {
    vad: Arc<dyn VoiceActivityDetection>,
    config: SegmenterConfig,
    state: State,
    turn_seq: u64,
    elapsed_in_turn_ms: u64,
    tail_silence_ms: u64,
    since_last_tick_ms: u64,
    buffer: Vec<i16>,
    start_ms: u64,
}

impl VadSegmenter {
    pub fn new(vad: Arc<dyn VoiceActivityDetection>, config: SegmenterConfig) -> Self {
        Self {
            vad,
            config,
            state: State::Idle,
            turn_seq: 0,
            elapsed_in_turn_ms: 0,
            tail_silence_ms: 0,
            since_last_tick_ms: 0,
            buffer: Vec::new(),
            start_ms: 0,
        }
    }

    /// Apply the tunables that may be changed by a `configure` control
    /// message. Only takes effect at the next utterance boundary — never
    /// mid-utterance.
    pub fn reconfigure(&mut self, config: SegmenterConfig) {
        if self.state == State::Idle {
            self.config = config;
        }
    }

    pub fn current_turn_seq(&self) -> u64 {
        self.turn_seq
    }

    /// Snapshot of the audio accumulated so far in the current turn, for the
    /// scheduler to run a partial decode against on a `PartialTick`.
    pub fn current_audio(&self) -> &[i16] {
        &self.buffer
    }

    /// Feed one 20 ms frame of samples. Pure CPU-bound computation; never
    /// suspends.
    pub fn push_frame(&mut self, samples: &[i16]) -> Result<Vec<SegmenterEvent>, super::VadError> {
        let VadResult { is_speech, .. } = self.vad.detect(samples)?;
        let mut events = Vec::new();

        match self.state {
            State::Idle => {
                if is_speech {
                    self.turn_seq += 1;
                    self.state = State::Speaking;
                    self.elapsed_in_turn_ms = 0;
                    self.tail_silence_ms = 0;
                    self.since_last_tick_ms = 0;
                    self.start_ms = 0;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    events.push(SegmenterEvent::SpeechStart {
                        turn_seq: self.turn_seq,
                    });
                }
            }
            State::Speaking => {
                self.buffer.extend_from_slice(samples);
                self.elapsed_in_turn_ms += FRAME_MS;
                self.since_last_tick_ms += FRAME_MS;

                if is_speech {
                    self.tail_silence_ms = 0;
                } else {
                    self.tail_silence_ms += FRAME_MS;
                }

                if self.tail_silence_ms >= self.config.vad_tail_ms {
                    if self.elapsed_in_turn_ms < self.config.min_utt_ms {
                        // Too short to be a real utterance (a VAD blip) — drop it
                        // without decoding, but still tell the client speaking
                        // has stopped so the flag it saw on SpeechStart toggles
                        // back off.
                        let turn_seq = self.turn_seq;
                        self.reset_to_idle();
                        events.push(SegmenterEvent::SpeechDropped { turn_seq });
                    } else {
                        events.push(self.close_utterance(false));
                    }
                } else if self.elapsed_in_turn_ms >= self.config.max_utt_ms {
                    events.push(self.close_utterance(true));
                } else if self.since_last_tick_ms >= self.config.partial_interval_ms {
                    self.since_last_tick_ms = 0;
                    events.push(SegmenterEvent::PartialTick {
                        turn_seq: self.turn_seq,
                        elapsed_ms: self.elapsed_in_turn_ms,
                    });
                }
            }
        }

        Ok(events)
    }

    /// Abort the current turn without emitting an `Utterance` event, per the
    /// `stop` control message contract.
    pub fn cancel(&mut self) {
        self.reset_to_idle();
    }

    fn reset_to_idle(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
        self.elapsed_in_turn_ms = 0;
        self.tail_silence_ms = 0;
        self.since_last_tick_ms = 0;
    }

    fn close_utterance(&mut self, truncated: bool) -> SegmenterEvent {
        let start_ms = self.start_ms;
        let end_ms = self.elapsed_in_turn_ms;
        let audio = std::mem::take(&mut self.buffer);
        let turn_seq = self.turn_seq;
        self.reset_to_idle();

        SegmenterEvent::Utterance {
            turn_seq,
            start_ms,
            end_ms,
            audio,
            truncated,
        }
    }

    pub fn tail_duration(&self) -> Duration {
        Duration::from_millis(self.config.vad_tail_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::VadError;

    /// A scripted VAD that replays a fixed is_speech sequence, one call per frame.
    struct ScriptedVad {
        script: parking_lot::Mutex<std::collections::VecDeque<bool>>,
    }

    impl ScriptedVad {
        fn new(script: Vec<bool>) -> Self {
            Self {
                script: parking_lot::Mutex::new(script.into()),
            }
        }
    }

    impl VoiceActivityDetection for ScriptedVad {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn detect(&self, _samples: &[i16]) -> Result<VadResult, VadError> {
            let is_speech = self.script.lock().pop_front().unwrap_or(false);
            Ok(VadResult {
                is_speech,
                confidence: 1.0,
            })
        }
    }

    fn frame() -> Vec<i16> {
        vec![0i16; 320]
    }

    #[test]
    fn silence_only_emits_nothing() {
        let vad = Arc::new(ScriptedVad::new(vec![false; 10]));
        let mut seg = VadSegmenter::new(vad, SegmenterConfig::default());
        for _ in 0..10 {
            let events = seg.push_frame(&frame()).unwrap();
            assert!(events.is_empty());
        }
    }

    #[test]
    fn speech_then_tail_closes_utterance() {
        // vad_tail_ms 250 / FRAME_MS 20 == 12.5 -> 13 silent frames needed.
        let mut script = vec![true; 5];
        script.extend(vec![false; 13]);
        let vad = Arc::new(ScriptedVad::new(script));
        let mut seg = VadSegmenter::new(vad, SegmenterConfig::default());

        let mut saw_start = false;
        let mut closed = None;
        for _ in 0..18 {
            for ev in seg.push_frame(&frame()).unwrap() {
                match ev {
                    SegmenterEvent::SpeechStart { turn_seq } => {
                        assert_eq!(turn_seq, 1);
                        saw_start = true;
                    }
                    SegmenterEvent::Utterance { truncated, .. } => {
                        closed = Some(truncated);
                    }
                    _ => {}
                }
            }
        }
        assert!(saw_start);
        assert_eq!(closed, Some(false));
    }

    #[test]
    fn blip_shorter_than_min_utt_ms_is_dropped() {
        // 1 speech frame + 13 silent frames (tail threshold) = 280ms, below
        // the default 300ms min_utt_ms. One more `true` primes the next
        // turn's SpeechStart.
        let mut script = vec![true; 1];
        script.extend(vec![false; 13]);
        script.push(true);
        let vad = Arc::new(ScriptedVad::new(script));
        let mut seg = VadSegmenter::new(vad, SegmenterConfig::default());

        let mut saw_utterance = false;
        let mut saw_dropped = false;
        for _ in 0..14 {
            for ev in seg.push_frame(&frame()).unwrap() {
                match ev {
                    SegmenterEvent::Utterance { .. } => saw_utterance = true,
                    SegmenterEvent::SpeechDropped { turn_seq } => {
                        assert_eq!(turn_seq, 1);
                        saw_dropped = true;
                    }
                    _ => {}
                }
            }
        }
        assert!(!saw_utterance, "a sub-min_utt_ms blip must not produce an Utterance");
        assert!(saw_dropped, "a sub-min_utt_ms blip must still close out the SpeechStart");

        // The segmenter must be back in Idle and ready for a fresh turn.
        let events = seg.push_frame(&[1i16; 320]).unwrap();
        assert!(matches!(events[0], SegmenterEvent::SpeechStart { turn_seq: 2 }));
    }

    #[test]
    fn utterance_at_exactly_min_utt_ms_is_emitted() {
        // 2 speech frames + 13 silent frames = 300ms, exactly min_utt_ms.
        let mut script = vec![true; 2];
        script.extend(vec![false; 13]);
        let vad = Arc::new(ScriptedVad::new(script));
        let mut seg = VadSegmenter::new(vad, SegmenterConfig::default());

        let mut closed = None;
        for _ in 0..15 {
            for ev in seg.push_frame(&frame()).unwrap() {
                if let SegmenterEvent::Utterance { end_ms, start_ms, .. } = ev {
                    closed = Some(end_ms - start_ms);
                }
            }
        }
        assert_eq!(closed, Some(300));
    }

    #[test]
    fn max_utt_ms_forces_truncated_close() {
        let config = SegmenterConfig {
            max_utt_ms: 100,
            ..SegmenterConfig::default()
        };
        let vad = Arc::new(ScriptedVad::new(vec![true; 20]));
        let mut seg = VadSegmenter::new(vad, config);

        let mut truncated_seen = false;
        for _ in 0..20 {
            for ev in seg.push_frame(&frame()).unwrap() {
                if let SegmenterEvent::Utterance { truncated, .. } = ev {
                    truncated_seen = true;
                    assert!(truncated);
                }
            }
        }
        assert!(truncated_seen);
    }

    #[test]
    fn cancel_resets_without_emitting_utterance() {
        let vad = Arc::new(ScriptedVad::new(vec![true; 5]));
        let mut seg = VadSegmenter::new(vad, SegmenterConfig::default());
        for _ in 0..5 {
            seg.push_frame(&frame()).unwrap();
        }
        seg.cancel();
        assert_eq!(seg.current_turn_seq(), 1);
        // Starting a new speech run should get a fresh turn.
        let vad2 = Arc::new(ScriptedVad::new(vec![true; 1]));
        let mut seg2 = VadSegmenter::new(vad2, SegmenterConfig::default());
        let events = seg2.push_frame(&frame()).unwrap();
        assert!(matches!(events[0], SegmenterEvent::SpeechStart { turn_seq: 1 }));
    }

    #[test]
    fn reconfigure_ignored_mid_utterance() {
        let vad = Arc::new(ScriptedVad::new(vec![true; 3]));
        let mut seg = VadSegmenter::new(vad, SegmenterConfig::default());
        seg.push_frame(&frame()).unwrap();
        let new_config = SegmenterConfig {
            vad_tail_ms: 600,
            ..SegmenterConfig::default()
        };
        seg.reconfigure(new_config);
        assert_eq!(seg.config.vad_tail_ms, 250);
    }
}
