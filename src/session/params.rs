use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

use crate::error::SessionError;

/// Hot-swappable processing parameters, validated as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DenoiseParams {
    /// Post-filter strength; 0 disables the post filter.
    pub post_filter_beta: f32,
    /// Ceiling on attenuation in dB, bounding over-suppression.
    pub atten_lim_db: f32,
}

impl DenoiseParams {
    pub fn new(post_filter_beta: f32, atten_lim_db: f32) -> Result<Self, SessionError> {
        let params = Self {
            post_filter_beta,
            atten_lim_db,
        };
        params.validate()?;
        Ok(params)
    }

    /// All fields must be finite and non-negative.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.post_filter_beta.is_finite() || self.post_filter_beta < 0.0 {
            return Err(SessionError::InvalidArgument(format!(
                "post-filter beta must be >= 0, got {}",
                self.post_filter_beta
            )));
        }
        if !self.atten_lim_db.is_finite() || self.atten_lim_db < 0.0 {
            return Err(SessionError::InvalidArgument(format!(
                "attenuation limit must be >= 0 dB, got {}",
                self.atten_lim_db
            )));
        }
        Ok(())
    }
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            post_filter_beta: 0.02,
            atten_lim_db: 100.0,
        }
    }
}

/// Snapshot holder for the current parameters.
///
/// `set` validates and replaces the whole value; `snapshot` copies the whole
/// value out. The processing loop therefore observes either the old or the
/// new parameters in full, never a torn mix, and a rejected update leaves the
/// stored value untouched.
pub struct ParameterStore {
    current: RwLock<DenoiseParams>,
}

impl ParameterStore {
    pub fn new(params: DenoiseParams) -> Self {
        Self {
            current: RwLock::new(params),
        }
    }

    pub fn set(&self, params: DenoiseParams) -> Result<(), SessionError> {
        params.validate()?;
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = params;
        Ok(())
    }

    pub fn set_post_filter_beta(&self, beta: f32) -> Result<(), SessionError> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = DenoiseParams {
            post_filter_beta: beta,
            ..*current
        };
        next.validate()?;
        *current = next;
        Ok(())
    }

    pub fn set_atten_lim_db(&self, atten_lim_db: f32) -> Result<(), SessionError> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = DenoiseParams {
            atten_lim_db,
            ..*current
        };
        next.validate()?;
        *current = next;
        Ok(())
    }

    /// Latest published parameters.
    pub fn snapshot(&self) -> DenoiseParams {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(DenoiseParams::default())
    }
}
