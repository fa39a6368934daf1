//! Retry budget and backoff shape.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry configuration for a single write.
///
/// The backoff before retry `n` (0-based) is `base * factor^n`, optionally
/// scaled by a random jitter multiplier in `[0.5, 1.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial attempt).
    pub retries: u32,
    /// Backoff before the first retry.
    pub base: Duration,
    /// Growth factor applied per retry. Must be greater than 1.
    pub factor: f64,
    /// Apply 50-150% jitter to each backoff.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_millis(400),
            factor: 1.6,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryConfigError {
    #[error("retry base delay must be positive")]
    ZeroBase,
    #[error("retry factor must be a finite number greater than 1 (got {0})")]
    InvalidFactor(f64),
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.base.is_zero() {
            return Err(RetryConfigError::ZeroBase);
        }
        if !self.factor.is_finite() || self.factor <= 1.0 {
            return Err(RetryConfigError::InvalidFactor(self.factor));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    #[must_use]
    pub fn without_jitter(self) -> Self {
        Self {
            jitter: false,
            ..self
        }
    }
}
