use std::time::Duration;
use thiserror::Error;

/// Error kinds produced by session operations.
///
/// The public boolean surface never propagates these: a failed operation
/// latches the message as the session's last error and reports `false`.
/// Internal code returns them through `Result` as usual.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session or engine resources could not be allocated.
    #[error("failed to allocate session resources: {0}")]
    Allocation(String),

    /// A caller-supplied argument was rejected (empty model, negative
    /// parameter value).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation requires a later lifecycle state than the current one.
    #[error("session is not initialized")]
    NotInitialized,

    /// `start` was called while the session is already processing.
    #[error("session is already processing")]
    AlreadyProcessing,

    /// The handle does not resolve to a live session.
    #[error("unknown or released session handle")]
    InvalidHandle,

    /// Producer-side capture failure. Diagnostic only; the session keeps
    /// running and the frame for that period is simply not produced.
    #[error("audio capture error: {0}")]
    Capture(String),

    /// Inference failed for a single frame. The frame is skipped and the
    /// session stays in its current state.
    #[error("frame processing error: {0}")]
    Processing(String),

    /// The processing loop did not acknowledge the stop signal within the
    /// configured bound and was aborted.
    #[error("processing loop did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}
