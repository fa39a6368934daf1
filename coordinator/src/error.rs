use std::sync::Arc;

use safewrite_types::WriteFailure;
use thiserror::Error;

/// A queued or debounced write was torn down before it produced an outcome.
///
/// Only happens when the task driving the write panics or the runtime shuts
/// down underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("write was abandoned before it settled")]
pub struct Abandoned;

/// Outcome error of a coordinated write.
///
/// `Task` carries the error returned by the caller's task, unchanged. The
/// error is shared because every caller that joined a debounce burst
/// receives the same failure.
#[derive(Debug, Error)]
pub enum WriteError<E> {
    #[error(transparent)]
    Task(Arc<E>),
    #[error(transparent)]
    Abandoned(#[from] Abandoned),
}

impl<E> Clone for WriteError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Task(err) => Self::Task(Arc::clone(err)),
            Self::Abandoned(a) => Self::Abandoned(*a),
        }
    }
}

impl<E> WriteError<E> {
    /// The task's own error, if the write got far enough to produce one.
    #[must_use]
    pub fn task_error(&self) -> Option<&E> {
        match self {
            Self::Task(err) => Some(err),
            Self::Abandoned(_) => None,
        }
    }
}

impl<E: WriteFailure> WriteFailure for WriteError<E> {
    fn status(&self) -> Option<u16> {
        self.task_error().and_then(WriteFailure::status)
    }

    fn body_text(&self) -> Option<String> {
        self.task_error().and_then(WriteFailure::body_text)
    }
}
