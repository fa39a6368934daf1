//! Write coordination for a remote record API that races under concurrent writes.
//!
//! # Architecture
//!
//! [`WriteCoordinator::safe_update`] composes three stages, outer to inner:
//!
//! ```text
//! safe_update(task, options)
//!     -> debounce(key)            collapse a burst of calls into one write
//!     -> queue.enqueue(..)        one write in flight per coordinator
//!     -> sleep(pre_wait)          let the remote system settle
//!     -> run_with_retry(task)     retry conflicts and transient failures
//! ```
//!
//! - [`debounce`] - keyed timers with outcome fan-out
//! - [`queue`] - single-writer chain, failure-isolated per unit
//! - [`retry`] - bounded retry, classification, [`retry::ConflictMatcher`]
//! - [`backoff`] - exponential backoff with injectable jitter
//! - [`diagnostics`] - observational sink for retries and failures
//!
//! # Ordering
//!
//! Within one key only the last call of a burst runs, and every caller of the
//! burst receives its outcome. Across keys, the queue runs writes in the order
//! their debounce windows elapsed. Nothing is cancelled: a write handed to the
//! queue runs to completion even if every handle is dropped, and a task that
//! never finishes stalls the queue.

pub mod backoff;
pub mod debounce;
pub mod diagnostics;
mod error;
pub mod queue;
pub mod retry;
#[cfg(test)]
mod testing;

use std::future::Future;
use std::sync::Arc;

pub use debounce::{DebounceHandle, Debouncer};
pub use error::{Abandoned, WriteError};
pub use queue::{QueueHandle, WriteQueue};
pub use retry::{Classification, ConflictMatcher, RetryClassifier, RetryPolicy, run_with_retry};
pub use safewrite_types::{RetryConfig, WriteFailure, WriteOptions};

/// Handle returned by [`WriteCoordinator::safe_update`].
pub type WriteHandle<T, E> = DebounceHandle<T, WriteError<E>>;

/// Owns one debounce table and one write queue.
///
/// Construct one per remote resource and share it by cloning; clones
/// coordinate with each other. Independent coordinators do not.
pub struct WriteCoordinator<T, E> {
    debouncer: Debouncer<T, WriteError<E>>,
    queue: WriteQueue,
    policy: Arc<RetryPolicy>,
}

impl<T, E> Clone for WriteCoordinator<T, E> {
    fn clone(&self) -> Self {
        Self {
            debouncer: self.debouncer.clone(),
            queue: self.queue.clone(),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<T, E> std::fmt::Debug for WriteCoordinator<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoordinator")
            .field("debouncer", &self.debouncer)
            .field("queue", &self.queue)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T, E> Default for WriteCoordinator<T, E> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<T, E> WriteCoordinator<T, E> {
    /// `policy` supplies backoff shape, classifier, jitter and diagnostics.
    /// Its retry count is overridden per call by [`WriteOptions::retries`].
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            debouncer: Debouncer::new(),
            queue: WriteQueue::new(),
            policy: Arc::new(policy),
        }
    }

    /// Whether a burst for `key` is still waiting for its debounce window.
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.debouncer.is_pending(key)
    }
}

impl<T, E> WriteCoordinator<T, E>
where
    T: Clone + Send + 'static,
    E: WriteFailure + Send + Sync + 'static,
{
    /// Coordinate one write.
    ///
    /// Returns immediately; the handle resolves once the burst this call
    /// joined has been written (or has failed). If a later call for the same
    /// key arrives within `options.debounce`, only the later call's task runs.
    /// Must be called from within a tokio runtime.
    pub fn safe_update<F, Fut>(&self, task: F, options: &WriteOptions) -> WriteHandle<T, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let queue = self.queue.clone();
        let policy = Arc::clone(&self.policy);
        let key = options.key.clone();
        let pre_wait = options.pre_wait;
        let retries = options.retries;

        let producer = move || {
            queue.enqueue(async move {
                if !pre_wait.is_zero() {
                    tokio::time::sleep(pre_wait).await;
                }
                let policy = if retries == policy.config.retries {
                    policy
                } else {
                    Arc::new(policy.as_ref().clone().with_retries(retries))
                };
                tracing::debug!(key = %key, retries, "Starting coordinated write");
                run_with_retry(&key, task, &policy)
                    .await
                    .map_err(|err| WriteError::Task(Arc::new(err)))
            })
        };

        self.debouncer
            .debounce(options.key.clone(), producer, options.debounce)
    }
}
