//! Error types for seriesq.
//!
//! [`SeriesError`] covers everything that stops or skips work on the client
//! side. [`StoreError`] is what a store reports through the completion
//! callback of a single request; it never aborts the invocation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SeriesError>;

/// Client-side errors.
#[derive(Error, Debug)]
pub enum SeriesError {
    /// Conflicting or missing command line options. Holds every message found.
    #[error("{}", .0.join("\n"))]
    Usage(Vec<String>),

    /// An identifier list could not be split into identifiers.
    #[error("{context} '{list}': {reason}")]
    Identifiers {
        /// Leading phrase, e.g. "no series identifiers in string".
        context: &'static str,
        /// The offending argument as given.
        list: String,
        /// What was wrong with it.
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store or ingest document could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Query text that does not parse.
    #[error("{0}")]
    Query(String),

    /// A metric name pattern in a query did not compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] globset::Error),
}

/// Failure status delivered with a request's completion.
///
/// `code` follows the negative-errno convention of the store protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub code: i32,
    pub message: String,
}

impl StoreError {
    pub const ENOENT: i32 = -2;
    pub const EIO: i32 = -5;
    pub const ENOMEM: i32 = -12;
    pub const EINVAL: i32 = -22;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Self::ENOENT, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(Self::EIO, message)
    }

    pub fn out_of_memory() -> Self {
        Self::new(Self::ENOMEM, "Cannot allocate memory")
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(Self::EINVAL, message)
    }
}

impl From<SeriesError> for StoreError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::not_found(e.to_string())
            }
            SeriesError::Io(e) => Self::io(e.to_string()),
            other => Self::invalid(other.to_string()),
        }
    }
}
