use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::warn;

use super::frame::AudioFrame;

/// Outcome of a queue push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The frame was enqueued and will be processed in order.
    Accepted,
    /// The queue was full; the incoming frame was discarded.
    Dropped,
}

/// Bounded FIFO handoff buffer between the capture producer and the
/// processing loop.
///
/// `push` is O(1) and never waits on the consumer: when the queue is full the
/// incoming frame is dropped so the real-time capture path is never
/// throttled. Accepted frames are popped in push order; a dropped frame never
/// reappears.
pub struct FrameQueue {
    frames: Mutex<VecDeque<AudioFrame>>,
    capacity: usize,
    dropped: AtomicU64,
    notify: Notify,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueue a frame, or drop it if the queue is at capacity.
    pub fn push(&self, frame: AudioFrame) -> PushOutcome {
        let accepted = {
            let mut frames = self.lock();
            if frames.len() >= self.capacity {
                false
            } else {
                frames.push_back(frame);
                true
            }
        };

        if accepted {
            self.notify.notify_one();
            PushOutcome::Accepted
        } else {
            self.dropped.fetch_add(1, Ordering::SeqCst);
            warn!("frame queue full, dropping incoming frame");
            PushOutcome::Dropped
        }
    }

    /// Dequeue the oldest accepted frame, if any.
    pub fn try_pop(&self) -> Option<AudioFrame> {
        self.lock().pop_front()
    }

    /// Current occupancy.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total frames dropped due to overflow since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Discard all queued frames.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Future that resolves once a frame has been pushed. The consumer drains
    /// with `try_pop` and only waits here when the queue is empty.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Wake the consumer without enqueueing anything (used for shutdown).
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AudioFrame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
