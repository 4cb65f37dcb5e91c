use crate::taxonomy::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad caller input, detected before anything reaches the engine.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A single-flight operation is already outstanding on this client.
    #[error("Operation already in progress: {0}")]
    OperationInProgress(&'static str),

    /// The operation is not valid in the client's current lifecycle phase.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Recoverable broker/engine condition; the caller may retry.
    #[error("Transient error {}: {}", .0.name(), .0.message())]
    Transient(ErrorCode),

    /// Connection-level failure; the client is being torn down.
    #[error("Fatal error {}: {}", .0.name(), .0.message())]
    Fatal(ErrorCode),

    #[error("Client closed")]
    ClientClosed,

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The engine completed an operation with an outcome of the wrong kind.
    #[error("Invalid response")]
    InvalidResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify an engine-reported code as transient or fatal.
    pub fn from_code(code: ErrorCode) -> Self {
        if code.is_fatal() {
            Error::Fatal(code)
        } else {
            Error::Transient(code)
        }
    }

    /// Only transient errors are worth retrying as-is. Everything else needs
    /// the caller to reset state (re-subscribe, recreate the client, ...).
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Transient(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// The taxonomy code carried by engine-originated errors.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Transient(code) | Error::Fatal(code) => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
