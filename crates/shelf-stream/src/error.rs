use std::io;

use shelf_store::StoreError;
use thiserror::Error;

/// Errors from the stream adapters.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A caller-supplied argument is unusable (seek origin, position, buffer size).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying dataset operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Store(StoreError::Io(e)) => e,
            StreamError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            StreamError::Store(e @ StoreError::NotFound { .. }) => {
                io::Error::new(io::ErrorKind::NotFound, e)
            }
            StreamError::Store(e @ StoreError::ReadOnly { .. }) => {
                io::Error::new(io::ErrorKind::PermissionDenied, e)
            }
            other => io::Error::other(other),
        }
    }
}
