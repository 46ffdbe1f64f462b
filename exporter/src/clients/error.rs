use std::path::PathBuf;

/// Failure of a single external call (RPC or upgrade-manager state).
///
/// Every variant is an external-call failure: collectors log it and record
/// a failed query for the action that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connection refused, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success HTTP status.
    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
    /// The response or file could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Filesystem access failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The collection deadline passed before the call was made.
    #[error("collection cancelled: deadline exceeded")]
    Cancelled,
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.into(),
            source,
        }
    }
}
