use crate::repositories::trade_source::RemoteError;
use serde::Serialize;

/// Coarse classification carried by per-symbol outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    RemoteTransient,
    RemoteFailure,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Invalid request: sentinel without coverage, bad selector, bad interval.
    Config(String),
    /// A retryable remote failure that has not yet exhausted its attempts.
    RemoteTransient(String),
    /// Remote failure that aborts the current window.
    RemoteFailure(String),
    Storage(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Config(_) => ErrorKind::Config,
            SyncError::RemoteTransient(_) => ErrorKind::RemoteTransient,
            SyncError::RemoteFailure(_) => ErrorKind::RemoteFailure,
            SyncError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SyncError::Config(msg)
            | SyncError::RemoteTransient(msg)
            | SyncError::RemoteFailure(msg)
            | SyncError::Storage(msg) => msg,
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Config(msg) => write!(f, "config: {msg}"),
            SyncError::RemoteTransient(msg) => write!(f, "remote transient: {msg}"),
            SyncError::RemoteFailure(msg) => write!(f, "remote failure: {msg}"),
            SyncError::Storage(msg) => write!(f, "storage: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

/// Unavailable is transient until the retry budget runs out; rejected is final.
impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(msg) => SyncError::RemoteTransient(msg),
            RemoteError::Rejected(msg) => {
                SyncError::RemoteFailure(format!("remote rejected request: {msg}"))
            }
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Config => "config",
            ErrorKind::RemoteTransient => "remote_transient",
            ErrorKind::RemoteFailure => "remote_failure",
            ErrorKind::Storage => "storage",
        };
        f.write_str(label)
    }
}
