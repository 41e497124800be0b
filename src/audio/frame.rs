/// Sample rate every session runs at, fixed by the inference engine family.
pub const SAMPLE_RATE: u32 = 48_000;

/// Channel count every session runs at (mono).
pub const CHANNEL_COUNT: u16 = 1;

/// Stream format fixed at initialize time.
///
/// Sample rate and channel count are constant across engines; the frame size
/// is determined by the engine instance when it is constructed and does not
/// change for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Samples per frame
    pub frame_size: usize,
}

/// A single mono frame of f32 samples
///
/// The sample count always equals the session's frame size; length-checking
/// happens at the capture boundary before a frame is created.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (f32, mono)
    pub samples: Vec<f32>,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}
