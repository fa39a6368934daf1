//! Observational side channel for retries and failed writes.
//!
//! Sinks see every scheduled retry and every write that gave up. They cannot
//! influence control flow.

use std::time::Duration;

use crate::retry::Classification;

/// A retry about to be slept on.
#[derive(Debug, Clone, Copy)]
pub struct RetryScheduled<'a> {
    pub key: &'a str,
    /// 1 for the first retry.
    pub retry: u32,
    pub wait: Duration,
    pub status: Option<u16>,
    pub text: &'a str,
    pub class: Classification,
}

/// A write that surfaced its error to the caller.
#[derive(Debug, Clone, Copy)]
pub struct WriteGaveUp<'a> {
    pub key: &'a str,
    /// Total task invocations, including the initial attempt.
    pub attempts: u32,
    pub status: Option<u16>,
    pub text: &'a str,
    pub class: Classification,
}

pub trait DiagnosticSink: Send + Sync {
    fn retry_scheduled(&self, event: &RetryScheduled<'_>);

    fn write_gave_up(&self, event: &WriteGaveUp<'_>);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn retry_scheduled(&self, event: &RetryScheduled<'_>) {
        tracing::warn!(
            key = event.key,
            retry = event.retry,
            wait_ms = event.wait.as_millis(),
            status = event.status,
            class = ?event.class,
            text = event.text,
            "Retrying write"
        );
    }

    fn write_gave_up(&self, event: &WriteGaveUp<'_>) {
        tracing::warn!(
            key = event.key,
            attempts = event.attempts,
            status = event.status,
            class = ?event.class,
            text = event.text,
            "Write failed"
        );
    }
}
