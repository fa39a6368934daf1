use std::time::Duration;

/// Key used when a caller does not name its write target.
pub const DEFAULT_WRITE_KEY: &str = "default-write";

/// Per-call options for a coordinated write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Writes sharing a key within the debounce window coalesce into one.
    pub key: String,
    /// Grace period inside the queue slot before the first attempt.
    pub pre_wait: Duration,
    /// Quiet period that must elapse after the last call for a key.
    pub debounce: Duration,
    /// Retry budget for the coalesced write.
    pub retries: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_WRITE_KEY.to_string(),
            pre_wait: Duration::from_millis(1000),
            debounce: Duration::from_millis(800),
            retries: 3,
        }
    }
}

impl WriteOptions {
    #[must_use]
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_pre_wait(self, pre_wait: Duration) -> Self {
        Self { pre_wait, ..self }
    }

    #[must_use]
    pub fn with_debounce(self, debounce: Duration) -> Self {
        Self { debounce, ..self }
    }

    #[must_use]
    pub fn with_retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }
}
