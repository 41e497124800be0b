use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::frame::AudioFrame;
use super::queue::{FrameQueue, PushOutcome};
use crate::error::SessionError;
use crate::session::ErrorLatch;

/// Push boundary handed to capture drivers while a session is processing.
///
/// Cloneable and cheap. `push_frame` copies the samples into the session's
/// frame queue and never waits on the processing side, so it is safe to call
/// from a real-time capture context. Frames pushed while the session is not
/// processing are discarded.
#[derive(Clone)]
pub struct CaptureSink {
    queue: Arc<FrameQueue>,
    errors: Arc<ErrorLatch>,
    active: Arc<AtomicBool>,
    frame_size: usize,
    epoch: Instant,
}

impl CaptureSink {
    pub(crate) fn new(
        queue: Arc<FrameQueue>,
        errors: Arc<ErrorLatch>,
        active: Arc<AtomicBool>,
        frame_size: usize,
    ) -> Self {
        Self {
            queue,
            errors,
            active,
            frame_size,
            epoch: Instant::now(),
        }
    }

    /// Samples per frame the session expects.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hand one raw frame to the session. The sample count must equal
    /// [`frame_size`](Self::frame_size); mis-sized frames are rejected and
    /// latched as a capture error.
    pub fn push_frame(&self, samples: &[f32]) -> PushOutcome {
        if !self.active.load(Ordering::SeqCst) {
            return PushOutcome::Dropped;
        }

        if samples.len() != self.frame_size {
            self.errors.record(SessionError::Capture(format!(
                "expected {} samples per frame, got {}",
                self.frame_size,
                samples.len()
            )));
            return PushOutcome::Dropped;
        }

        let frame = AudioFrame {
            samples: samples.to_vec(),
            timestamp_ms: self.epoch.elapsed().as_millis() as u64,
        };
        self.queue.push(frame)
    }

    /// Surface a device-side failure. Diagnostic only: the session keeps
    /// running and the frame for that period is simply absent.
    pub fn report_error(&self, message: impl Into<String>) {
        self.errors
            .record(SessionError::Capture(message.into()));
    }
}

/// A capture driver producing fixed-size mono frames at the session's frame
/// period.
///
/// Implementations:
/// - real device drivers wrapping a platform capture API
/// - [`WavFileSource`](super::WavFileSource) for offline runs and tests
///
/// The registry starts the source after the processing loop is live and stops
/// it first on the way down.
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Begin producing frames into `sink`.
    async fn start(&mut self, sink: CaptureSink) -> Result<()>;

    /// Stop producing frames. No pushes may happen after this returns.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the source is currently producing frames
    fn is_capturing(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}
