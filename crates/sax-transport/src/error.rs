use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        #[source]
        source: hyper::Error,
    },

    #[error("request failed: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("not implemented: {0}")]
    Unimplemented(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
