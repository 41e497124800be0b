use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::latch::ErrorLatch;

/// Consumer callback invoked once per successfully denoised frame, in capture
/// order, on the processing task. Receives the denoised samples and the
/// frame's LSNR estimate; the slice length is the session frame size.
pub type FrameCallback = Arc<dyn Fn(&[f32], f32) -> anyhow::Result<()> + Send + Sync>;

/// Hands completed frames to the registered consumer callback one at a time.
///
/// A callback error or panic is latched and the loop moves on to the next
/// frame; a misbehaving consumer never tears down the session.
pub struct CallbackDispatcher {
    callback: FrameCallback,
    errors: Arc<ErrorLatch>,
    delivered: Arc<AtomicU64>,
}

impl CallbackDispatcher {
    pub fn new(callback: FrameCallback, errors: Arc<ErrorLatch>, delivered: Arc<AtomicU64>) -> Self {
        Self {
            callback,
            errors,
            delivered,
        }
    }

    pub fn dispatch(&self, frame: &[f32], lsnr: f32) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        match catch_unwind(AssertUnwindSafe(|| (self.callback)(frame, lsnr))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.errors.record(format!("frame callback failed: {e:#}")),
            Err(_) => self.errors.record("frame callback panicked"),
        }
    }

    /// Frames handed to the consumer so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }
}
