//! Single-writer serialization queue.
//!
//! Every unit of work enqueued on a [`WriteQueue`] runs alone, in submission
//! order. The queue keeps a tail pointer to the completion signal of the most
//! recently enqueued unit; each new unit waits on its predecessor's signal and
//! publishes its own when it settles.
//!
//! ```text
//! enqueue(u1) -> [u1] --settled--> [u2] --settled--> [u3]
//!                       Fulfilled     Rejected / torn down: still advances
//! ```
//!
//! A failing unit never stalls the chain: the successor advances whether the
//! predecessor fulfilled, rejected, or was torn down without reporting.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::Abandoned;

/// How a unit of work settled. Published to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Fulfilled,
    Rejected,
}

#[derive(Debug, Default)]
struct Chain {
    tail: Mutex<Option<oneshot::Receiver<Settled>>>,
    submitted: AtomicU64,
}

/// Cheap to clone; clones share the same chain.
#[derive(Debug, Clone, Default)]
pub struct WriteQueue {
    chain: Arc<Chain>,
}

impl WriteQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `unit` behind everything already enqueued.
    ///
    /// Returns immediately. The unit starts once its predecessor settled and
    /// runs to completion even if the returned handle is dropped. Must be
    /// called from within a tokio runtime.
    pub fn enqueue<F, T, E>(&self, unit: F) -> QueueHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<Abandoned> + Send + 'static,
    {
        let (settled_tx, settled_rx) = oneshot::channel();
        let seq = self.chain.submitted.fetch_add(1, Ordering::Relaxed);
        let predecessor = self
            .chain
            .tail
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .replace(settled_rx);

        let task = tokio::spawn(async move {
            if let Some(predecessor) = predecessor {
                match predecessor.await {
                    Ok(Settled::Fulfilled) => {}
                    Ok(Settled::Rejected) => {
                        tracing::debug!(seq, "Previous queued write failed; continuing");
                    }
                    Err(_) => {
                        tracing::warn!(seq, "Previous queued write was torn down; continuing");
                    }
                }
            }

            let outcome = unit.await;
            let settled = if outcome.is_ok() {
                Settled::Fulfilled
            } else {
                Settled::Rejected
            };
            // The successor may not exist yet, or ever.
            let _ = settled_tx.send(settled);
            outcome
        });

        QueueHandle {
            task,
            _error: std::marker::PhantomData,
        }
    }

    /// Number of units submitted over the queue's lifetime.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.chain.submitted.load(Ordering::Relaxed)
    }
}

/// Resolves to the outcome of one enqueued unit.
#[must_use = "dropping the handle does not cancel the unit, but discards its outcome"]
pub struct QueueHandle<T, E> {
    task: JoinHandle<Result<T, E>>,
    _error: std::marker::PhantomData<fn() -> E>,
}

impl<T, E> Future for QueueHandle<T, E>
where
    E: From<Abandoned>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(join_err)) => {
                if join_err.is_panic() {
                    tracing::error!("Queued write panicked: {join_err}");
                } else {
                    tracing::warn!("Queued write was cancelled: {join_err}");
                }
                Poll::Ready(Err(E::from(Abandoned)))
            }
        }
    }
}

impl<T, E> std::fmt::Debug for QueueHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
