use shelf_store::StoreError;
use shelf_stream::StreamError;
use shelf_types::TypeError;
use thiserror::Error;

/// Errors surfaced by shelves, racks and storage.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// Nothing stored under this shelf or key.
    #[error("not found: {0}")]
    NotFound(String),

    /// An object is already stored and overwriting was not allowed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A key, name, seek origin or size is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The container's version stamp does not match this build.
    #[error("incompatible storage: {0}")]
    Incompatible(String),

    /// The codec failed to encode or decode an object.
    #[error("codec error: {0}")]
    Codec(String),

    /// The configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ShelfError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { path } => Self::NotFound(path),
            StoreError::Incompatible { path, reason } => {
                Self::Incompatible(format!("{path}: {reason}"))
            }
            StoreError::Type(e) => Self::from(e),
            other => Self::Store(other),
        }
    }
}

impl From<StreamError> for ShelfError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            StreamError::Store(e) => Self::from(e),
        }
    }
}

impl From<TypeError> for ShelfError {
    fn from(err: TypeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Result alias for shelf operations.
pub type ShelfResult<T> = Result<T, ShelfError>;
