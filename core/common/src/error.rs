//! Common error types for goss.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Operation;

/// Top-level error type for goss operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A driver with the same name is already registered.
    #[error("Driver '{0}' is already registered")]
    DuplicateDriver(String),

    /// No driver is registered under the requested name.
    #[error("Driver '{0}' is not registered")]
    UnknownDriver(String),

    /// No driver has been activated on the kernel yet.
    #[error("No active driver; call use_driver first")]
    NoActiveDriver,

    /// The remote object does not exist.
    #[error("{op} {key}: object not found")]
    NotFound {
        /// Operation that observed the absence.
        op: Operation,
        /// Object key.
        key: String,
    },

    /// Local filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Local path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backend SDK reported a transport, auth or service failure.
    #[error("{op} {key}: backend error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Backend {
        /// Operation being performed.
        op: Operation,
        /// Object key or prefix.
        key: String,
        /// HTTP status code, when the backend returned one.
        status: Option<u16>,
        /// Message as reported by the backend.
        message: String,
    },

    /// The backend client could not be constructed.
    #[error("Failed to initialize '{driver}' backend: {message}")]
    BackendInit {
        /// Driver name.
        driver: String,
        /// Message from the SDK.
        message: String,
    },

    /// The object key cannot be used with this backend.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey {
        /// Offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Object content is not valid UTF-8 text.
    #[error("Object {key} is not valid UTF-8 text")]
    NotText {
        /// Object key.
        key: String,
    },
}

impl Error {
    /// Wrap an I/O error with the local path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a not-found error for `key`.
    pub fn not_found(op: Operation, key: impl Into<String>) -> Self {
        Error::NotFound {
            op,
            key: key.into(),
        }
    }

    /// Build a backend error carrying the SDK's status and message verbatim.
    pub fn backend(
        op: Operation,
        key: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Error::Backend {
            op,
            key: key.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether this error reports an absent remote object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Backend status code, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Backend { status, .. } => *status,
            Error::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
