//! Exponential backoff with optional jitter.
//!
//! `wait = base * factor^attempt`, scaled by a multiplier in `[0.5, 1.5)` when
//! jitter is enabled. The random sample comes from an injected
//! [`JitterSource`] so tests can pin it.

use std::time::Duration;

use safewrite_types::RetryConfig;

/// Source of uniform samples in `[0, 1)` for jitter.
pub trait JitterSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadJitter;

impl JitterSource for ThreadJitter {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Always returns the same sample. Values are clamped into `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

impl<F> JitterSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn sample(&self) -> f64 {
        self()
    }
}

/// Wait before retry `attempt` (0 before the first retry, 1 before the second, ...).
///
/// Jittered waits are rounded to the nearest millisecond. Unjittered waits are
/// exact to the nanosecond.
#[must_use]
pub fn compute_wait(attempt: u32, config: &RetryConfig, jitter: &dyn JitterSource) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let growth = config.factor.powi(exponent);

    if config.jitter {
        let millis = config.base.as_secs_f64() * 1000.0 * growth;
        let scaled = millis * (0.5 + jitter.sample());
        return duration_from_f64(scaled.round(), 1_000_000.0);
    }

    let nanos = config.base.as_nanos() as f64 * growth;
    duration_from_f64(nanos.round(), 1.0)
}

/// Convert a non-negative count of `unit_nanos`-sized units, saturating at
/// `Duration::MAX`.
fn duration_from_f64(units: f64, unit_nanos: f64) -> Duration {
    let nanos = units * unit_nanos;
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Duration::from_nanos(u64::MAX);
    }
    Duration::from_nanos(nanos.max(0.0) as u64)
}
