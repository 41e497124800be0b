//! Boundary shim for the external denoising inference engine.
//!
//! The session layer only ever talks to these traits; the neural runtime
//! itself (model parsing, network execution) lives behind an
//! [`EngineFactory`] implementation supplied at registry construction.

mod passthrough;

pub use passthrough::{PassthroughEngine, PassthroughFactory, PASSTHROUGH_FRAME_SIZE};

use anyhow::Result;

use crate::audio::StreamFormat;
use crate::session::DenoiseParams;

/// One live engine instance bound to a session.
///
/// `process` consumes one raw frame and fills `output` (same length) with the
/// denoised frame, returning the frame's LSNR estimate. The parameter
/// snapshot passed in is the one current at dequeue time; the engine applies
/// it before processing the frame. Instance teardown is `Drop`.
pub trait DenoiseEngine: Send {
    /// Stream format this instance was constructed with. Fixed for the
    /// lifetime of the instance.
    fn stream_format(&self) -> StreamFormat;

    /// Denoise a single frame.
    fn process(&mut self, input: &[f32], output: &mut [f32], params: DenoiseParams)
        -> Result<f32>;
}

/// Builds engine instances from an opaque model blob.
///
/// The blob is passed through unmodified; its format is an engine concern.
pub trait EngineFactory: Send + Sync {
    fn build(&self, model: &[u8], params: DenoiseParams) -> Result<Box<dyn DenoiseEngine>>;
}
