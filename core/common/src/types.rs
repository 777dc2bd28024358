//! Common types used throughout goss.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A storage operation, carried in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Upload a local file.
    Put,
    /// Fetch object content.
    Get,
    /// Download an object to a local file.
    Save,
    /// Query object size.
    Size,
    /// Remove an object.
    Delete,
    /// Probe for existence.
    Exists,
    /// List objects under a prefix.
    Files,
}

impl Operation {
    /// Lowercase name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Save => "save",
            Operation::Size => "size",
            Operation::Delete => "delete",
            Operation::Exists => "exists",
            Operation::Files => "files",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `key` is a usable object key.
///
/// Keys use '/' as separator, must be relative, and every component must be
/// non-empty and neither `.` nor `..`.
///
/// # Errors
/// - Returns `InvalidKey` describing the first violation
pub fn validate_key(key: &str) -> crate::Result<()> {
    let invalid = |reason: &str| crate::Error::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key cannot be empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("key must not start with '/'"));
    }
    if key.contains('\0') {
        return Err(invalid("key must not contain NUL"));
    }
    for component in key.split('/') {
        match component {
            "" => return Err(invalid("key contains an empty component")),
            "." | ".." => return Err(invalid("key contains a relative component")),
            _ => {}
        }
    }
    Ok(())
}
