//! Per-session driver loop, tying the Frame Ring, VAD Segmenter
//!, ASR Scheduler, Grammar Analyzer, and Coach Orchestrator
//! together over one `/ws/asr` connection.
//!
//! One task reads the socket and feeds a channel, a second drains a bounded
//! outbound queue back to the socket, and the connection's own future runs
//! the turn state machine in between. The outbound queue selectively evicts
//! droppable messages under backpressure rather than growing unbounded.

use super::protocol::{ClientMessage, ServerMessage};
use crate::asr::scheduler::AsrEvent;
use crate::asr::{AsrScheduler, DecodeOpts, SpeechToAsr};
use crate::audio::{frames_from_bytes, Frame, FrameRing};
use crate::chat::ChatProvider;
use crate::coach::CoachOrchestrator;
use crate::config::Config;
use crate::content::{ContentStore, Level};
use crate::error::SessionError;
use crate::grammar::analyze;
use crate::vad::{SegmenterEvent, VadSegmenter, VoiceActivityDetection};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Shared dependencies handed to every session, built once in `main`.
pub struct SessionDeps {
    pub vad_factory: Arc<dyn Fn() -> Arc<dyn VoiceActivityDetection> + Send + Sync>,
    pub asr_engine: Arc<dyn SpeechToAsr>,
    pub chat: Arc<dyn ChatProvider>,
    pub content: Arc<ContentStore>,
    pub config: Config,
}

struct OutboundQueue {
    queue: Mutex<VecDeque<(String, bool)>>,
    notify: Notify,
    bytes: std::sync::atomic::AtomicUsize,
    closed: AtomicBool,
    max_events: usize,
    max_bytes: usize,
}

enum PushOutcome {
    Queued,
    BackpressureExceeded,
}

impl OutboundQueue {
    fn new(max_events: usize, max_bytes: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            bytes: std::sync::atomic::AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            max_events,
            max_bytes,
        }
    }

    fn is_droppable(msg: &ServerMessage) -> bool {
        matches!(msg, ServerMessage::Partial { .. })
    }

    /// Enqueues `msg`. Overflow drops the oldest `partial` first;
    /// non-droppable kinds (`final`, `coach`, `error`, ...) are never
    /// dropped — if there's still no room after evicting every droppable
    /// entry, the caller must close the session with `error.kind =
    /// "backpressure"`.
    fn push(&self, msg: &ServerMessage) -> PushOutcome {
        let json = match serde_json::to_string(msg) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize server message: {e}");
                return PushOutcome::Queued;
            }
        };
        let size = json.len();
        let droppable = Self::is_droppable(msg);

        let mut queue = self.queue.lock();
        while queue.len() >= self.max_events
            || self.bytes.load(Ordering::SeqCst) + size > self.max_bytes
        {
            let evicted = queue
                .iter()
                .position(|(_, is_droppable)| *is_droppable)
                .map(|idx| queue.remove(idx).unwrap());
            match evicted {
                Some((evicted_json, _)) => {
                    self.bytes.fetch_sub(evicted_json.len(), Ordering::SeqCst);
                }
                None if droppable => {
                    // Nothing evictable and this message is itself droppable: coalesce it away.
                    return PushOutcome::Queued;
                }
                None => {
                    return PushOutcome::BackpressureExceeded;
                }
            }
        }

        self.bytes.fetch_add(size, Ordering::SeqCst);
        queue.push_back((json, droppable));
        drop(queue);
        self.notify.notify_one();
        PushOutcome::Queued
    }

    async fn pop(&self) -> Option<String> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            if let Some((json, _)) = self.queue.lock().pop_front() {
                return Some(json);
            }
            self.notify.notified().await;
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

/// Pushes `msg`, turning an unevictable overflow into the session-fatal
/// `SessionError::Backpressure` so every call site closes the same way:
/// non-droppable kinds that can't be buffered close the session with
/// `error.kind = "backpressure"`.
fn push_or_backpressure(outbound: &OutboundQueue, msg: &ServerMessage) -> Result<(), SessionError> {
    match outbound.push(msg) {
        PushOutcome::Queued => Ok(()),
        PushOutcome::BackpressureExceeded => Err(SessionError::Backpressure),
    }
}

/// Runs one `/ws/asr` connection to completion.
pub async fn run_session(socket: WebSocket, deps: Arc<SessionDeps>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let outbound = Arc::new(OutboundQueue::new(
        deps.config.ws_backpressure_max_events,
        deps.config.ws_backpressure_max_bytes,
    ));

    let writer_outbound = outbound.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(json) = writer_outbound.pop().await {
            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let ring = FrameRing::default();
    let reader_ring = ring.clone();
    let (control_tx, mut control_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMessage>();
    let reader_outbound = outbound.clone();

    let reader_task = tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(WsMessage::Binary(data)) => match frames_from_bytes(&data) {
                    Ok(frames) => {
                        for frame in frames {
                            reader_ring.push(frame);
                        }
                    }
                    Err(e) => {
                        let _ = reader_outbound.push(&ServerMessage::Error {
                            kind: "audio_format",
                            message: e.to_string(),
                            fatal: true,
                        });
                        reader_outbound.close();
                        break;
                    }
                },
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if control_tx.send(client_msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = reader_outbound.push(&ServerMessage::Error {
                            kind: "protocol",
                            message: e.to_string(),
                            fatal: false,
                        });
                    }
                },
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = control_tx.send(ClientMessage::Stop);
    });

    outbound.push(&ServerMessage::Ready);

    let vad = (deps.vad_factory)();
    let mut segmenter = VadSegmenter::new(
        vad,
        crate::vad::segmenter::SegmenterConfig {
            vad_tail_ms: deps.config.vad_tail_ms,
            min_utt_ms: deps.config.min_utt_ms,
            max_utt_ms: deps.config.max_utt_ms,
            partial_interval_ms: deps.config.partial_interval_ms,
        },
    );
    let mut scheduler = AsrScheduler::new(
        deps.asr_engine.clone(),
        DecodeOpts {
            beam_size: deps.config.beam_size_partial as i32,
            temperature: 0.0,
            no_speech_threshold: deps.config.no_speech_threshold,
        },
        DecodeOpts {
            beam_size: deps.config.beam_size_final as i32,
            temperature: 0.0,
            no_speech_threshold: deps.config.no_speech_threshold,
        },
    );

    let learner_level = Level::B1;
    let mut stopping = false;
    let mut last_activity = tokio::time::Instant::now();

    loop {
        tokio::select! {
            frame = ring.pop() => {
                last_activity = tokio::time::Instant::now();
                if let Err(fatal) = handle_frame(frame, &mut segmenter, &mut scheduler, &outbound) {
                    let _ = outbound.push(&ServerMessage::Error {
                        kind: fatal.wire_kind(),
                        message: fatal.to_string(),
                        fatal: true,
                    });
                    break;
                }
            }
            event = scheduler.next_event() => {
                match event {
                    Some(AsrEvent::Partial { turn_seq, text }) => {
                        outbound.push(&ServerMessage::Partial { turn_seq, text });
                    }
                    Some(AsrEvent::Final { turn_seq, text, duration_ms }) => {
                        if let Err(fatal) = push_or_backpressure(&outbound, &ServerMessage::Final { turn_seq, text: text.clone(), duration_ms }) {
                            let _ = outbound.push(&ServerMessage::Error { kind: fatal.wire_kind(), message: fatal.to_string(), fatal: true });
                            break;
                        }
                        let corrections = analyze(&text, deps.config.l1_language);
                        let orchestrator = CoachOrchestrator::new(&deps.content, deps.config.l1_language.code(), learner_level);
                        let payload = orchestrator.compose(turn_seq, &text, corrections, deps.chat.as_ref()).await;
                        if let Err(fatal) = push_or_backpressure(&outbound, &ServerMessage::Coach { turn_seq, payload }) {
                            let _ = outbound.push(&ServerMessage::Error { kind: fatal.wire_kind(), message: fatal.to_string(), fatal: true });
                            break;
                        }
                    }
                    Some(AsrEvent::Fatal { message, .. }) => {
                        let _ = outbound.push(&ServerMessage::Error {
                            kind: "asr_fatal",
                            message,
                            fatal: true,
                        });
                        break;
                    }
                    None => break,
                }
            }
            control = control_rx.recv() => {
                last_activity = tokio::time::Instant::now();
                match control {
                    Some(ClientMessage::Start) => {
                        info!("session start acknowledged");
                    }
                    Some(ClientMessage::Stop) => {
                        segmenter.cancel();
                        scheduler.cancel();
                        if stopping {
                            break;
                        }
                        stopping = true;
                    }
                    Some(ClientMessage::Configure { vad_tail_ms }) => {
                        if let Some(tail_ms) = vad_tail_ms {
                            segmenter.reconfigure(crate::vad::segmenter::SegmenterConfig {
                                vad_tail_ms: tail_ms,
                                min_utt_ms: deps.config.min_utt_ms,
                                max_utt_ms: deps.config.max_utt_ms,
                                partial_interval_ms: deps.config.partial_interval_ms,
                            });
                        }
                    }
                    Some(ClientMessage::Ping) => {
                        outbound.push(&ServerMessage::Pong);
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(deps.config.heartbeat_interval_ms)) => {
                let idle_ms = last_activity.elapsed().as_millis() as u64;
                if idle_ms >= deps.config.heartbeat_timeout_ms {
                    warn!("session idle for {idle_ms}ms, closing");
                    let _ = outbound.push(&ServerMessage::Error {
                        kind: "timeout",
                        message: format!("no client activity for {idle_ms}ms"),
                        fatal: true,
                    });
                    break;
                } else if idle_ms >= deps.config.heartbeat_interval_ms {
                    outbound.push(&ServerMessage::Ping);
                }
            }
        }
    }

    outbound.close();
    reader_task.abort();
    let _ = writer_task.await;
}

/// Feeds one frame through the VAD segmenter and ASR scheduler. Returns
/// `Err` for session-fatal VAD errors (inference failure on malformed audio).
fn handle_frame(
    frame: Frame,
    segmenter: &mut VadSegmenter,
    scheduler: &mut AsrScheduler,
    outbound: &Arc<OutboundQueue>,
) -> Result<(), SessionError> {
    let samples = frame.samples;
    let events = segmenter
        .push_frame(&samples)
        .map_err(|e| SessionError::AudioFormat(e.to_string()))?;

    for event in events {
        match event {
            SegmenterEvent::SpeechStart { turn_seq } => {
                scheduler.on_speech_start();
                push_or_backpressure(
                    outbound,
                    &ServerMessage::Vad {
                        speaking: true,
                        turn_seq,
                        truncated: false,
                    },
                )?;
            }
            SegmenterEvent::PartialTick { turn_seq, .. } => {
                scheduler.on_partial_tick(turn_seq, segmenter.current_audio().to_vec());
            }
            SegmenterEvent::Utterance {
                turn_seq,
                audio,
                truncated,
                ..
            } => {
                push_or_backpressure(
                    outbound,
                    &ServerMessage::Vad {
                        speaking: false,
                        turn_seq,
                        truncated,
                    },
                )?;
                scheduler.on_utterance(turn_seq, audio);
            }
            SegmenterEvent::SpeechDropped { turn_seq } => {
                push_or_backpressure(
                    outbound,
                    &ServerMessage::Vad {
                        speaking: false,
                        turn_seq,
                        truncated: false,
                    },
                )?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_drops_oldest_partial_on_overflow() {
        let queue = OutboundQueue::new(2, 1_000_000);
        assert!(matches!(
            queue.push(&ServerMessage::Partial { turn_seq: 1, text: "a".into() }),
            PushOutcome::Queued
        ));
        assert!(matches!(
            queue.push(&ServerMessage::Partial { turn_seq: 1, text: "ab".into() }),
            PushOutcome::Queued
        ));
        // Third push exceeds max_events=2; oldest partial should be evicted.
        assert!(matches!(
            queue.push(&ServerMessage::Partial { turn_seq: 1, text: "abc".into() }),
            PushOutcome::Queued
        ));
        let remaining = queue.queue.lock().len();
        assert_eq!(remaining, 2);
    }

    #[test]
    fn outbound_never_drops_final_events() {
        let queue = OutboundQueue::new(1, 1_000_000);
        queue.push(&ServerMessage::Partial { turn_seq: 1, text: "a".into() });
        let outcome = queue.push(&ServerMessage::Final {
            turn_seq: 1,
            text: "done".into(),
            duration_ms: 100,
        });
        assert!(matches!(outcome, PushOutcome::Queued));
    }

    #[test]
    fn outbound_signals_backpressure_when_no_partial_to_evict() {
        let queue = OutboundQueue::new(1, 1_000_000);
        queue.push(&ServerMessage::Final { turn_seq: 1, text: "a".into(), duration_ms: 1 });
        let outcome = queue.push(&ServerMessage::Final { turn_seq: 2, text: "b".into(), duration_ms: 1 });
        assert!(matches!(outcome, PushOutcome::BackpressureExceeded));
    }
}
