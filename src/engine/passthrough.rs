use anyhow::{ensure, Result};
use tracing::info;

use super::{DenoiseEngine, EngineFactory};
use crate::audio::{StreamFormat, CHANNEL_COUNT, SAMPLE_RATE};
use crate::session::DenoiseParams;

/// Frame size used by the passthrough engine: 10 ms at 48 kHz.
pub const PASSTHROUGH_FRAME_SIZE: usize = 480;

/// Engine stand-in that copies input to output unchanged and reports a
/// synthetic LSNR derived from the frame energy.
///
/// Used by the demo binary and the integration tests to exercise the full
/// pipeline; a real inference runtime plugs in as another [`EngineFactory`].
pub struct PassthroughEngine {
    format: StreamFormat,
    params: DenoiseParams,
}

impl DenoiseEngine for PassthroughEngine {
    fn stream_format(&self) -> StreamFormat {
        self.format
    }

    fn process(&mut self, input: &[f32], output: &mut [f32], params: DenoiseParams) -> Result<f32> {
        ensure!(
            input.len() == output.len(),
            "input/output length mismatch: {} vs {}",
            input.len(),
            output.len()
        );
        ensure!(
            input.len() == self.format.frame_size,
            "expected {} samples per frame, got {}",
            self.format.frame_size,
            input.len()
        );

        self.params = params;
        output.copy_from_slice(input);

        // Mean frame energy in dB stands in for the real engine's estimate.
        let energy =
            input.iter().map(|s| s * s).sum::<f32>() / self.format.frame_size as f32;
        Ok(10.0 * (energy + 1e-10).log10())
    }
}

impl PassthroughEngine {
    /// Parameters last applied by `process`.
    pub fn params(&self) -> DenoiseParams {
        self.params
    }
}

/// Factory for [`PassthroughEngine`] instances. Accepts any non-empty blob
/// as a "model".
pub struct PassthroughFactory;

impl EngineFactory for PassthroughFactory {
    fn build(&self, model: &[u8], params: DenoiseParams) -> Result<Box<dyn DenoiseEngine>> {
        ensure!(!model.is_empty(), "model blob is empty");
        params.validate()?;

        info!(
            "passthrough engine ready: {} Hz, {} ch, {} samples/frame",
            SAMPLE_RATE, CHANNEL_COUNT, PASSTHROUGH_FRAME_SIZE
        );

        Ok(Box::new(PassthroughEngine {
            format: StreamFormat {
                sample_rate: SAMPLE_RATE,
                channels: CHANNEL_COUNT,
                frame_size: PASSTHROUGH_FRAME_SIZE,
            },
            params,
        }))
    }
}
