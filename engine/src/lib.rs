//! Score synchronization for safewrite.
//!
//! [`ScoreSync`] reads a ticket, computes its priority score and writes the
//! score back through a [`WriteCoordinator`], so bursts of refreshes for the
//! same ticket collapse into one write and conflicting writes are retried.
//!
//! This crate has no terminal or process concerns; the binary wires it to
//! configuration and prints outcomes.

mod error;
mod sync;

pub use error::SyncError;
pub use sync::{FieldOverrides, RefreshOutcome, ScoreSync, retry_policy};

pub use safewrite_config::{SafewriteConfig, WriteConfig};
pub use safewrite_coordinator::{RetryPolicy, WriteCoordinator, WriteError};
pub use safewrite_remote::{Credentials, FieldMapping, RecordClient, RemoteError};
pub use safewrite_types::{PriorityPoints, ScoreBreakdown};
