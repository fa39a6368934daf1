//! Core domain types for safewrite.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod failure;
mod options;
mod retry;
pub mod score;

pub use failure::{ResponseBody, WriteFailure};
pub use options::{DEFAULT_WRITE_KEY, WriteOptions};
pub use retry::{RetryConfig, RetryConfigError};
pub use score::{FieldOption, Priority, PriorityPoints, ScoreBreakdown, ScoreInputs};
