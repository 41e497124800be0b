use std::fmt::Display;
use std::sync::{Mutex, PoisonError};
use tracing::error;

/// Single-slot holder for the most recent error message.
///
/// Every failure overwrites the slot; readers may observe an error newer than
/// the one their own call produced. Best-effort diagnostic, not an audit log.
#[derive(Default)]
pub struct ErrorLatch {
    slot: Mutex<String>,
}

impl ErrorLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, replacing whatever was latched before.
    pub fn record(&self, err: impl Display) {
        let message = err.to_string();
        error!("{message}");
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = message;
    }

    /// The latest message, or an empty string if nothing has failed yet.
    pub fn last(&self) -> String {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
