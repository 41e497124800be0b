use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a denoise session.
///
/// `Uninitialized → Initialized → Processing ⇄ Stopped → Released`. The
/// middle three states may cycle through repeated restarts; `Released` is
/// terminal. A transition that fails leaves the state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Processing,
    Stopped,
    Released,
}

impl SessionState {
    /// States with a live engine instance: parameter updates and queue
    /// queries are valid here.
    pub fn is_operable(&self) -> bool {
        matches!(
            self,
            SessionState::Initialized | SessionState::Processing | SessionState::Stopped
        )
    }

    /// States from which `start` may spawn the processing loop.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionState::Initialized | SessionState::Stopped)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::Processing => "processing",
            SessionState::Stopped => "stopped",
            SessionState::Released => "released",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
