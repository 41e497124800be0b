pub mod capture;
pub mod file;
pub mod frame;
pub mod queue;

pub use capture::{CaptureSink, CaptureSource};
pub use file::{FeedPacing, WavFileSource};
pub use frame::{AudioFrame, StreamFormat, CHANNEL_COUNT, SAMPLE_RATE};
pub use queue::{FrameQueue, PushOutcome};
