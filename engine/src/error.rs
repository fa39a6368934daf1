use safewrite_config::ConfigError;
use safewrite_coordinator::WriteError;
use safewrite_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A field the score cannot be computed or stored without is not mapped.
    #[error("missing {0} field mapping")]
    MissingField(&'static str),
    #[error("remote configuration is incomplete: {0}")]
    Unconfigured(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("score write failed: {0}")]
    Write(#[source] WriteError<RemoteError>),
}

impl From<WriteError<RemoteError>> for SyncError {
    fn from(err: WriteError<RemoteError>) -> Self {
        SyncError::Write(err)
    }
}
