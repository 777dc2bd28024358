//! Common utilities and types shared across the goss crates.
//!
//! This module provides the error taxonomy every layer reports through and
//! the small value types (operations, object keys) used at the driver seam.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{validate_key, Operation};
