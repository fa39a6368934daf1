//! Bounded retry with exponential backoff.
//!
//! # Retry Policy
//!
//! - Retries: 3 (4 total attempts)
//! - Initial delay: 400ms, growth factor 1.6
//! - Jitter: multiplier in [0.5, 1.5)
//!
//! # Retryable Conditions
//!
//! - HTTP 409 (conflict)
//! - HTTP 408, 429, 502, 503 (transient)
//! - Response text matching the [`ConflictMatcher`] ("not saved", "a change
//!   was made" by default), whatever the status
//!
//! Everything else, including failures without a status, is surfaced
//! immediately. When the budget runs out the last error is returned unchanged.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use safewrite_types::{RetryConfig, WriteFailure};

use crate::backoff::{JitterSource, ThreadJitter, compute_wait};
use crate::diagnostics::{DiagnosticSink, RetryScheduled, TracingSink, WriteGaveUp};

/// Phrases the remote system uses when a competing writer got there first.
pub const DEFAULT_CONFLICT_PATTERNS: &[&str] = &["not saved", "a change was made"];

const CONFLICT_STATUS: u16 = 409;

const TRANSIENT_STATUSES: &[u16] = &[408, 429, 502, 503];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Overload or unavailability.
    Transient,
    /// A competing writer changed the record.
    Conflict,
    /// Retrying will not help.
    Fatal,
}

impl Classification {
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Conflict)
    }
}

/// Decides whether an error's text signals an optimistic-concurrency conflict.
#[derive(Clone)]
pub struct ConflictMatcher(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl ConflictMatcher {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Case-insensitive substring match against any of `patterns`.
    ///
    /// An empty pattern list never matches.
    pub fn patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let alternation = patterns
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>();
        if alternation.is_empty() {
            return Ok(Self::never());
        }
        let regex: Regex = RegexBuilder::new(&alternation.join("|"))
            .case_insensitive(true)
            .build()?;
        Ok(Self::new(move |text| regex.is_match(text)))
    }

    #[must_use]
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        (self.0)(text)
    }
}

impl Default for ConflictMatcher {
    fn default() -> Self {
        Self::patterns(DEFAULT_CONFLICT_PATTERNS).unwrap_or_else(|e| {
            tracing::error!("Default conflict patterns failed to compile: {e}");
            Self::never()
        })
    }
}

impl fmt::Debug for ConflictMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConflictMatcher(<predicate>)")
    }
}

/// Maps a failure's status and text to a [`Classification`].
#[derive(Debug, Clone, Default)]
pub struct RetryClassifier {
    conflict: ConflictMatcher,
}

impl RetryClassifier {
    #[must_use]
    pub fn new(conflict: ConflictMatcher) -> Self {
        Self { conflict }
    }

    #[must_use]
    pub fn classify(&self, status: Option<u16>, text: &str) -> Classification {
        match status {
            Some(CONFLICT_STATUS) => Classification::Conflict,
            Some(s) if TRANSIENT_STATUSES.contains(&s) => Classification::Transient,
            _ if self.conflict.matches(text) => Classification::Conflict,
            _ => Classification::Fatal,
        }
    }
}

/// Everything [`run_with_retry`] needs besides the task itself.
#[derive(Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
    pub classifier: RetryClassifier,
    pub jitter: Arc<dyn JitterSource>,
    pub sink: Arc<dyn DiagnosticSink>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            classifier: RetryClassifier::default(),
            jitter: Arc::new(ThreadJitter),
            sink: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub fn with_classifier(self, classifier: RetryClassifier) -> Self {
        Self { classifier, ..self }
    }

    #[must_use]
    pub fn with_jitter(self, jitter: Arc<dyn JitterSource>) -> Self {
        Self { jitter, ..self }
    }

    #[must_use]
    pub fn with_sink(self, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink, ..self }
    }

    #[must_use]
    pub fn with_retries(self, retries: u32) -> Self {
        Self {
            config: self.config.with_retries(retries),
            ..self
        }
    }
}

/// Invoke `task` until it succeeds, fails non-retryably, or the retry budget
/// is spent. Returns the last error in the latter two cases.
///
/// `key` only labels diagnostics.
pub async fn run_with_retry<T, E, F, Fut>(key: &str, mut task: F, policy: &RetryPolicy) -> Result<T, E>
where
    E: WriteFailure,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match task().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let status = err.status();
        let text = err.body_text().unwrap_or_default();
        let class = policy.classifier.classify(status, &text);

        if !class.is_retryable() || attempt >= policy.config.retries {
            policy.sink.write_gave_up(&WriteGaveUp {
                key,
                attempts: attempt + 1,
                status,
                text: &text,
                class,
            });
            return Err(err);
        }

        let wait = compute_wait(attempt, &policy.config, policy.jitter.as_ref());
        policy.sink.retry_scheduled(&RetryScheduled {
            key,
            retry: attempt + 1,
            wait,
            status,
            text: &text,
            class,
        });
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}
