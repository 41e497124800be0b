use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Point-in-time statistics for a denoise session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// Whether the processing loop is currently running
    pub is_processing: bool,

    /// When processing first started, if it ever did
    pub started_at: Option<DateTime<Utc>>,

    /// Frames delivered to the consumer callback
    pub frames_processed: u64,

    /// Frames dropped at the queue due to overflow
    pub frames_dropped: u64,

    /// Current frame-queue occupancy
    pub queue_depth: usize,
}
