//! Keyed debounce with outcome fan-out.
//!
//! Calls for the same key that arrive within `wait` of each other form a
//! burst. Each call resets the key's timer and replaces the pending producer;
//! when the timer finally fires, the latest producer runs once and its
//! outcome is delivered to every caller of the burst.
//!
//! Timers are tokio tasks. A reset aborts the previous timer and bumps the
//! entry's generation, so a timer that already woke up but lost the race for
//! the table lock sees a newer generation and backs off.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::Abandoned;

type Producer<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;

/// One caller waiting on a burst's outcome.
struct Waiter<T, E> {
    tx: oneshot::Sender<Result<T, E>>,
}

impl<T, E> Waiter<T, E> {
    fn resolve(self, value: T) {
        // A dropped handle just means nobody is listening.
        let _ = self.tx.send(Ok(value));
    }

    fn reject(self, err: E) {
        let _ = self.tx.send(Err(err));
    }
}

struct DebounceEntry<T, E> {
    generation: u64,
    timer: JoinHandle<()>,
    producer: Producer<T, E>,
    waiters: Vec<Waiter<T, E>>,
}

struct Table<T, E> {
    next_generation: u64,
    entries: HashMap<String, DebounceEntry<T, E>>,
}

/// Keyed debounce table. Cheap to clone; clones share the same table.
pub struct Debouncer<T, E> {
    table: Arc<Mutex<Table<T, E>>>,
}

impl<T, E> Clone for Debouncer<T, E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T, E> Default for Debouncer<T, E> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_generation: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<T, E> fmt::Debug for Debouncer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("pending", &self.pending_keys())
            .finish()
    }
}

impl<T, E> Debouncer<T, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table<T, E>> {
        lock_table(&self.table)
    }

    /// Whether `key` has a burst waiting for its timer.
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Keys with a burst waiting for its timer, sorted.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn lock_table<T, E>(table: &Mutex<Table<T, E>>) -> MutexGuard<'_, Table<T, E>> {
    table
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl<T, E> Debouncer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + From<Abandoned> + Send + 'static,
{
    /// Join (or start) the burst for `key`.
    ///
    /// `producer` replaces any producer already pending for the key; only the
    /// last one of a burst is ever invoked. Must be called from within a
    /// tokio runtime.
    pub fn debounce<P, Fut>(&self, key: impl Into<String>, producer: P, wait: Duration) -> DebounceHandle<T, E>
    where
        P: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = key.into();
        let producer: Producer<T, E> = Box::new(move || producer().boxed());
        let (tx, rx) = oneshot::channel();
        let waiter = Waiter { tx };

        let mut table = self.lock();
        table.next_generation += 1;
        let generation = table.next_generation;
        // The timer cannot observe the table before this guard is released.
        let timer = tokio::spawn(fire(Arc::clone(&self.table), key.clone(), generation, wait));

        match table.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.timer.abort();
                entry.timer = timer;
                entry.generation = generation;
                entry.producer = producer;
                entry.waiters.push(waiter);
                tracing::trace!(
                    key = %occupied.key(),
                    waiters = occupied.get().waiters.len(),
                    "Debounce timer reset"
                );
            }
            Entry::Vacant(vacant) => {
                tracing::trace!(key = %vacant.key(), "Debounce burst started");
                vacant.insert(DebounceEntry {
                    generation,
                    timer,
                    producer,
                    waiters: vec![waiter],
                });
            }
        }

        DebounceHandle { rx }
    }
}

async fn fire<T, E>(table: Arc<Mutex<Table<T, E>>>, key: String, generation: u64, wait: Duration)
where
    T: Clone,
    E: Clone,
{
    tokio::time::sleep(wait).await;

    let entry = {
        let mut table = lock_table(&table);
        let current = table
            .entries
            .get(&key)
            .is_some_and(|entry| entry.generation == generation);
        if current {
            table.entries.remove(&key)
        } else {
            None
        }
    };
    // Superseded by a later call for the same key.
    let Some(DebounceEntry {
        producer, waiters, ..
    }) = entry
    else {
        return;
    };

    tracing::debug!(key = %key, waiters = waiters.len(), "Debounce window elapsed");
    match producer().await {
        Ok(value) => fan_out(waiters, value, Waiter::resolve),
        Err(err) => fan_out(waiters, err, Waiter::reject),
    }
}

/// Deliver one outcome to every waiter, cloning for all but the last.
fn fan_out<T, E, V: Clone>(waiters: Vec<Waiter<T, E>>, outcome: V, settle: fn(Waiter<T, E>, V)) {
    let mut waiters = waiters.into_iter().peekable();
    while let Some(waiter) = waiters.next() {
        if waiters.peek().is_some() {
            settle(waiter, outcome.clone());
        } else {
            settle(waiter, outcome);
            return;
        }
    }
}

/// Resolves to the outcome of the burst this call joined.
///
/// If the burst's producer never settles, neither does the handle.
#[must_use = "dropping the handle does not cancel the burst, but discards its outcome"]
pub struct DebounceHandle<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Future for DebounceHandle<T, E>
where
    E: From<Abandoned>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(Abandoned))),
        }
    }
}

impl<T, E> fmt::Debug for DebounceHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceHandle").finish_non_exhaustive()
    }
}
