//! PCM frame validation and the fixed-capacity frame ring.
//!
//! The ring is single-producer (the socket reader task), single-consumer (the
//! VAD segmenter). A plain `parking_lot::Mutex<VecDeque<_>>` plus a `Notify`
//! gives a non-blocking-push / awaitable-pop contract, including the
//! drop-oldest-on-overflow behavior a generic SPSC ring (e.g. `ringbuf`)
//! doesn't expose directly.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// 16 kHz mono, 20 ms frames — exactly 320 i16 samples.
pub const FRAME_SAMPLES: usize = 320;

/// Ring capacity: 2 seconds of audio at 20 ms/frame.
pub const RING_CAPACITY_FRAMES: usize = 100;

/// A single 20 ms PCM frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub samples: [i16; FRAME_SAMPLES],
}

/// Error returned when client audio doesn't conform to the fixed frame size.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("audio byte length {0} is not a multiple of {} samples ({} bytes)", FRAME_SAMPLES, FRAME_SAMPLES * 2)]
pub struct FrameSizeError(pub usize);

/// Split a raw little-endian i16 PCM byte buffer into whole 320-sample frames.
///
/// The server accepts only whole multiples of 320 samples and rejects
/// anything else — there's no partial-frame buffering across WebSocket
/// messages.
pub fn frames_from_bytes(data: &[u8]) -> Result<Vec<Frame>, FrameSizeError> {
    if data.len() % 2 != 0 {
        return Err(FrameSizeError(data.len()));
    }
    let sample_count = data.len() / 2;
    if sample_count == 0 || sample_count % FRAME_SAMPLES != 0 {
        return Err(FrameSizeError(data.len()));
    }

    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();

    Ok(samples
        .chunks_exact(FRAME_SAMPLES)
        .map(|chunk| {
            let mut buf = [0i16; FRAME_SAMPLES];
            buf.copy_from_slice(chunk);
            Frame { samples: buf }
        })
        .collect())
}

/// Convert PCM i16 samples into f32 in `[-1.0, 1.0]`, the format the ASR
/// decoder expects.
pub fn samples_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

struct RingInner {
    queue: Mutex<VecDeque<Frame>>,
    notify: Arc<Notify>,
    dropped: AtomicU64,
    capacity: usize,
}

/// Fixed-capacity SPSC frame ring. Overflow drops the oldest frame and
/// increments `frames_dropped()` — it never blocks the producer and never
/// terminates the session.
pub struct FrameRing {
    inner: Arc<RingInner>,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RingInner {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                notify: Arc::new(Notify::new()),
                dropped: AtomicU64::new(0),
                capacity,
            }),
        }
    }

    /// Non-blocking push. Drops the oldest frame on overflow.
    pub fn push(&self, frame: Frame) {
        let mut queue = self.inner.queue.lock();
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(frame);
        drop(queue);
        self.inner.notify.notify_one();
    }

    /// Awaitable pop — suspends the caller until a frame is available.
    pub async fn pop(&self) -> Frame {
        loop {
            if let Some(frame) = self.inner.queue.lock().pop_front() {
                return frame;
            }
            self.inner.notify.notified().await;
        }
    }

    /// Total frames dropped to overflow since creation.
    pub fn frames_dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl Clone for FrameRing {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new(RING_CAPACITY_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_multiple_of_320() {
        let bytes = vec![0u8; 319 * 2];
        assert!(frames_from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_odd_byte_count() {
        let bytes = vec![0u8; 641];
        assert!(frames_from_bytes(&bytes).is_err());
    }

    #[test]
    fn accepts_exact_frame() {
        let bytes = vec![0u8; FRAME_SAMPLES * 2];
        let frames = frames_from_bytes(&bytes).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn accepts_multiple_frames() {
        let bytes = vec![0u8; FRAME_SAMPLES * 2 * 3];
        let frames = frames_from_bytes(&bytes).unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[tokio::test]
    async fn push_pop_roundtrip() {
        let ring = FrameRing::new(4);
        ring.push(Frame {
            samples: [1i16; FRAME_SAMPLES],
        });
        let frame = ring.pop().await;
        assert_eq!(frame.samples[0], 1);
        assert_eq!(ring.frames_dropped(), 0);
    }

    #[test]
    fn overflow_drops_oldest_and_counts() {
        let ring = FrameRing::new(2);
        for i in 0..3i16 {
            ring.push(Frame {
                samples: [i; FRAME_SAMPLES],
            });
        }
        assert_eq!(ring.frames_dropped(), 1);
        let queue = ring.inner.queue.lock();
        assert_eq!(queue.len(), 2);
        // Oldest (i=0) was dropped; i=1 and i=2 remain.
        assert_eq!(queue.front().unwrap().samples[0], 1);
    }
}
