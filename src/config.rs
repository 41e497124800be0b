use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
}

/// Tunables for the frame pipeline. Defaults assume a 10 ms frame period at
/// 48 kHz.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frame-queue capacity, in frames. Sane range is roughly 8-16.
    pub queue_capacity: usize,

    /// Upper bound on the cooperative stop wait, in milliseconds.
    pub stop_timeout_ms: u64,

    /// Processing-loop idle wait between empty queue polls, in milliseconds.
    pub idle_poll_ms: u64,

    /// Maximum number of concurrently allocated sessions.
    pub max_sessions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            stop_timeout_ms: 2000,
            idle_poll_ms: 2,
            max_sessions: 32,
        }
    }
}

impl PipelineConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms.max(1))
    }
}

impl Config {
    /// Load from a config file; missing files fall back to defaults so the
    /// pipeline is runnable without one.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
