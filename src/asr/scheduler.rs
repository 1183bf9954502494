//! Per-session ASR Scheduler.
//!
//! Drives the decoder from VAD events with "at most one decode in flight"
//! enforced via a generation counter plus a busy flag — a turn epoch that
//! invalidates in-flight decodes whose turn has already ended, the same
//! technique call-id epochs use to invalidate stale work after a hangup.
//! Decodes run as spawned tasks so the session's frame-ingestion loop is
//! never blocked by one: decode is a suspension point, but pushing frames
//! into the ring must not be.

use super::{DecodeOpts, FinalResult, SpeechToAsr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum AsrEvent {
    Partial { turn_seq: u64, text: String },
    Final {
        turn_seq: u64,
        text: String,
        duration_ms: u64,
    },
    /// `AsrError::Fatal` from the engine; always ends the session.
    Fatal { turn_seq: u64, message: String },
}

pub struct AsrScheduler {
    engine: Arc<dyn SpeechToAsr>,
    partial_opts: DecodeOpts,
    final_opts: DecodeOpts,
    generation: Arc<AtomicU64>,
    partial_busy: Arc<AtomicBool>,
    events_tx: mpsc::UnboundedSender<AsrEvent>,
    events_rx: mpsc::UnboundedReceiver<AsrEvent>,
}

impl AsrScheduler {
    pub fn new(engine: Arc<dyn SpeechToAsr>, partial_opts: DecodeOpts, final_opts: DecodeOpts) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            partial_opts,
            final_opts,
            generation: Arc::new(AtomicU64::new(0)),
            partial_busy: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx,
        }
    }

    /// A new turn has begun; any still-running decode from the previous
    /// turn becomes stale and its result will be discarded on arrival.
    pub fn on_speech_start(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.partial_busy.store(false, Ordering::SeqCst);
    }

    /// Request a partial decode. Coalesced (silently dropped) if one is
    /// already running for this turn.
    pub fn on_partial_tick(&mut self, turn_seq: u64, audio_so_far: Vec<i16>) {
        if audio_so_far.is_empty() {
            return;
        }
        if self.partial_busy.swap(true, Ordering::SeqCst) {
            return;
        }

        let engine = self.engine.clone();
        let opts = self.partial_opts;
        let generation = self.generation.clone();
        let my_generation = generation.load(Ordering::SeqCst);
        let busy = self.partial_busy.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = engine.decode_partial(audio_so_far, opts).await;
            busy.store(false, Ordering::SeqCst);
            if generation.load(Ordering::SeqCst) != my_generation {
                return;
            }
            if let Ok(text) = result {
                if !text.is_empty() {
                    let _ = tx.send(AsrEvent::Partial { turn_seq, text });
                }
            }
        });
    }

    /// Cancel any in-flight partial (best-effort, result discarded) and run
    /// the final decode exactly once. The resulting `Final` event is always
    /// emitted for `turn_seq`, even if the decode produced empty text.
    pub fn on_utterance(&mut self, turn_seq: u64, audio: Vec<i16>) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.partial_busy.store(false, Ordering::SeqCst);

        let engine = self.engine.clone();
        let opts = self.final_opts;
        let generation = self.generation.clone();
        let my_generation = generation.load(Ordering::SeqCst);
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = engine.decode_final(audio, opts).await;
            if generation.load(Ordering::SeqCst) != my_generation {
                return;
            }
            match result {
                Ok(FinalResult { text, duration_ms }) => {
                    let _ = tx.send(AsrEvent::Final {
                        turn_seq,
                        text,
                        duration_ms,
                    });
                }
                Err(e) => {
                    let _ = tx.send(AsrEvent::Fatal {
                        turn_seq,
                        message: e.to_string(),
                    });
                }
            }
        });
    }

    /// Discard the current turn's work with no event emitted for it, per the
    /// `stop` control message / socket-close contract.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.partial_busy.store(false, Ordering::SeqCst);
    }

    pub async fn next_event(&mut self) -> Option<AsrEvent> {
        self.events_rx.recv().await
    }
}
