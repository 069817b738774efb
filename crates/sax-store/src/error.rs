/// Errors from remote object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The bucket name was rejected by the backend.
    #[error("invalid bucket name: {0}")]
    InvalidBucket(String),

    /// The object key cannot be represented by the backend.
    #[error("invalid object key {bucket}/{key}: {reason}")]
    InvalidKey {
        bucket: String,
        key: String,
        reason: String,
    },

    /// The backend client could not be configured.
    #[error("store configuration error: {0}")]
    Config(String),

    /// Any other failure reported by the backend (permissions, network, ...).
    #[error("backend error on {bucket}/{key}: {reason}")]
    Backend {
        bucket: String,
        key: String,
        reason: String,
    },
}

impl StoreError {
    /// Returns `true` if this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
