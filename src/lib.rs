pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;

pub use audio::{
    AudioFrame, CaptureSink, CaptureSource, FeedPacing, FrameQueue, PushOutcome, StreamFormat,
    WavFileSource, CHANNEL_COUNT, SAMPLE_RATE,
};
pub use config::{Config, PipelineConfig};
pub use engine::{DenoiseEngine, EngineFactory, PassthroughFactory};
pub use error::SessionError;
pub use session::{
    DenoiseParams, FrameCallback, SessionHandle, SessionRegistry, SessionState, SessionStats,
};
