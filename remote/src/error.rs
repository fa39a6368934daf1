use safewrite_types::{ResponseBody, WriteFailure};
use thiserror::Error;

/// Non-2xx response from the remote API.
#[derive(Debug, Clone, Error)]
#[error("remote API returned {status}: {body}")]
pub struct ApiError {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::from_text(body),
        }
    }
}

impl WriteFailure for ApiError {
    fn status(&self) -> Option<u16> {
        Some(self.status)
    }

    fn body_text(&self) -> Option<String> {
        Some(self.body.to_text())
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RemoteError {
    /// The API error, when the remote answered with a non-2xx status.
    #[must_use]
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            RemoteError::Api(err) => Some(err),
            _ => None,
        }
    }
}

// Transport and decode failures carry no status and classify as fatal.
impl WriteFailure for RemoteError {
    fn status(&self) -> Option<u16> {
        self.api().map(|err| err.status)
    }

    fn body_text(&self) -> Option<String> {
        self.api().map(|err| err.body.to_text())
    }
}
