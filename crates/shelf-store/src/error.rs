use shelf_types::TypeError;

/// Errors from dataset, namespace and container operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No member with this path exists.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// A member with this path already exists.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// The member exists but is not of the requested kind.
    #[error("{path} is not a {expected}")]
    WrongKind { path: String, expected: &'static str },

    /// A name or version failed validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A slice write would pass the end of the dataset.
    #[error("slice {start}..{end} out of bounds for {path} (len {len})")]
    OutOfBounds {
        path: String,
        start: u64,
        end: u64,
        len: u64,
    },

    /// The namespace was opened read-only.
    #[error("{path} is read-only")]
    ReadOnly { path: String },

    /// The container's version stamp does not match the running build.
    #[error("incompatible container {path}: {reason}")]
    Incompatible { path: String, reason: String },

    /// The location exists but carries no version stamp.
    #[error("not a shelf container: {path}")]
    NotAContainer { path: String },

    /// Attribute (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
