//! Error types for platform environment operations.

use std::fmt::Display;
use std::io;

use sax_store::StoreError;
use sax_transport::TransportError;
use thiserror::Error;

/// Coarse error category, for callers that branch on the kind of failure
/// rather than its details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    FailedPrecondition,
    Unimplemented,
    NotFound,
    Unavailable,
    Internal,
}

/// Errors that can occur in the platform environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A malformed argument, e.g. a remote path without an object separator.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation cannot run in the current state: no remote storage
    /// connection, or a file found where a directory was expected (or the
    /// other way around).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A capability this environment deliberately does not provide.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// Local filesystem failure.
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// Remote object store failure.
    #[error("{op} {path}: {source}")]
    Remote {
        op: &'static str,
        path: String,
        #[source]
        source: StoreError,
    },

    /// RPC transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration file.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EnvError {
    pub(crate) fn io(op: &'static str, path: impl Display, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_string(),
            source,
        }
    }

    pub(crate) fn remote(op: &'static str, path: impl Display, source: StoreError) -> Self {
        Self::Remote {
            op,
            path: path.to_string(),
            source,
        }
    }

    /// The coarse category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => ErrorCode::InvalidArgument,
            Self::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            Self::Unimplemented(_) => ErrorCode::Unimplemented,
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorCode::NotFound
            }
            Self::Remote { source, .. } if source.is_not_found() => ErrorCode::NotFound,
            Self::Remote {
                source: StoreError::InvalidBucket(_) | StoreError::InvalidKey { .. },
                ..
            } => ErrorCode::InvalidArgument,
            Self::Transport(TransportError::Unimplemented(_)) => ErrorCode::Unimplemented,
            Self::Transport(_) => ErrorCode::Unavailable,
            Self::Io { .. } | Self::Remote { .. } => ErrorCode::Internal,
        }
    }

    /// Returns `true` if the underlying backend reported a missing entry.
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }
}

/// Convenience type alias for environment operations.
pub type EnvResult<T> = Result<T, EnvError>;
