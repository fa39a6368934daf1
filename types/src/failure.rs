//! Inspection surface for failed writes.
//!
//! The retry classifier never looks at concrete error types. Anything a task
//! can fail with only has to say which HTTP-like status it carries (if any)
//! and what the remote system said about it.

use std::fmt;

/// A failure the retry classifier can inspect.
///
/// Both methods default to "nothing known", which classifies as
/// non-retryable.
pub trait WriteFailure {
    /// HTTP-like status code attached to the failure.
    fn status(&self) -> Option<u16> {
        None
    }

    /// Response body rendered as text, used for conflict detection.
    fn body_text(&self) -> Option<String> {
        None
    }
}

impl<E: WriteFailure + ?Sized> WriteFailure for std::sync::Arc<E> {
    fn status(&self) -> Option<u16> {
        (**self).status()
    }

    fn body_text(&self) -> Option<String> {
        (**self).body_text()
    }
}

/// Body of an error response: raw text, or JSON when it parsed as such.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Parse JSON bodies, keep anything else as text.
    #[must_use]
    pub fn from_text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) if value.is_object() || value.is_array() => Self::Json(value),
            _ => Self::Text(raw),
        }
    }

    /// Text form used for matching. JSON bodies are serialized compactly.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
