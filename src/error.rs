//! Error types for the PoW registration engine

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the registration engine and its chain adapter
#[derive(Error, Debug)]
pub enum Error {
    /// Chain connection errors
    #[error("Chain connection error: {0}")]
    Connection(String),

    /// Chain query errors
    #[error("Chain query error: {0}")]
    Query(String),

    /// Decoding errors
    #[error("Decoding error: {0}")]
    Decode(String),

    /// A chain operation kept failing after every retry
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: usize,
        last_error: String,
    },

    /// Subnet not found
    #[error("Subnet {0} does not exist")]
    SubnetNotFound(u16),

    /// Requested CUDA device or runtime cannot be used
    #[error("CUDA device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Every solver worker exited without producing a solution
    #[error("All {0} solver workers exited without a solution")]
    WorkersExited(usize),

    /// Extrinsic submission errors
    #[error("Extrinsic error: {0}")]
    Extrinsic(String),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Error::Query(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Error::DeviceUnavailable(msg.into())
    }

    pub fn extrinsic(msg: impl Into<String>) -> Self {
        Error::Extrinsic(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether retrying the same chain call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Query(_) | Error::Decode(_)
        )
    }

    /// Whether this error means the engine cannot continue at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::RetriesExhausted { .. }
                | Error::DeviceUnavailable(_)
                | Error::WorkersExited(_)
                | Error::SubnetNotFound(_)
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl From<subxt::Error> for Error {
    fn from(e: subxt::Error) -> Self {
        Error::Query(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<crate::chain::Error> for Error {
    fn from(e: crate::chain::Error) -> Self {
        match e {
            crate::chain::Error::Transaction(msg) => Error::Extrinsic(msg),
            crate::chain::Error::Decoding(msg) => Error::Decode(msg),
            crate::chain::Error::Connection(msg) => Error::Connection(msg),
            other => Error::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::connection("dropped").is_transient());
        assert!(Error::query("timeout").is_transient());
        assert!(!Error::device_unavailable("no gpu").is_transient());
    }

    #[test]
    fn test_fatal_classification() {
        let err = Error::RetriesExhausted {
            operation: "get_block".to_string(),
            attempts: 3,
            last_error: "timeout".to_string(),
        };
        assert!(err.is_fatal());
        assert!(Error::WorkersExited(4).is_fatal());
        assert!(!Error::query("x").is_fatal());
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = Error::RetriesExhausted {
            operation: "get_block".to_string(),
            attempts: 3,
            last_error: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "get_block failed after 3 attempts: connection reset"
        );
    }

    #[test]
    fn test_chain_error_conversion() {
        let err: Error = crate::chain::Error::Transaction("bad".to_string()).into();
        assert!(matches!(err, Error::Extrinsic(_)));
    }
}
