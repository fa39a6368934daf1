//! Test doubles shared by the unit tests in this crate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use safewrite_types::WriteFailure;
use thiserror::Error;

use crate::diagnostics::{DiagnosticSink, RetryScheduled, WriteGaveUp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stub failure (status {status:?}): {body:?}")]
pub struct StubError {
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl StubError {
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            body: None,
        }
    }

    pub fn plain(body: &str) -> Self {
        Self {
            status: None,
            body: Some(body.to_string()),
        }
    }

    pub fn with_body(self, body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..self
        }
    }
}

impl WriteFailure for StubError {
    fn status(&self) -> Option<u16> {
        self.status
    }

    fn body_text(&self) -> Option<String> {
        self.body.clone()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRetry {
    pub key: String,
    pub retry: u32,
    pub wait: Duration,
    pub status: Option<u16>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RecordedGiveUp {
    pub key: String,
    pub attempts: u32,
    pub status: Option<u16>,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    retries: Mutex<Vec<RecordedRetry>>,
    give_ups: Mutex<Vec<RecordedGiveUp>>,
}

impl RecordingSink {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn retries(&self) -> Vec<RecordedRetry> {
        self.retries.lock().unwrap().clone()
    }

    pub fn give_ups(&self) -> Vec<RecordedGiveUp> {
        self.give_ups.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn retry_scheduled(&self, event: &RetryScheduled<'_>) {
        self.retries.lock().unwrap().push(RecordedRetry {
            key: event.key.to_string(),
            retry: event.retry,
            wait: event.wait,
            status: event.status,
            text: event.text.to_string(),
        });
    }

    fn write_gave_up(&self, event: &WriteGaveUp<'_>) {
        self.give_ups.lock().unwrap().push(RecordedGiveUp {
            key: event.key.to_string(),
            attempts: event.attempts,
            status: event.status,
        });
    }
}
