//! Driver trait: a named factory for one backend.

use std::sync::Arc;

use goss_common::Result;
use goss_config::Config;

use crate::storage::Storage;

/// Builds a [`Storage`] for one backend from configuration.
///
/// Drivers read their settings from the config scope named after them and
/// must not perform network I/O beyond what the SDK constructor itself does.
pub trait Driver: Send + Sync {
    /// Registry key; matched exactly and case-sensitively.
    fn name(&self) -> &str;

    /// Construct the backend client.
    ///
    /// # Errors
    /// - `Configuration` when required settings are absent or invalid
    /// - `BackendInit` when the SDK rejects the settings at construction time
    fn build(&self, config: &Config) -> Result<Arc<dyn Storage>>;
}

impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn build(&self, config: &Config) -> Result<Arc<dyn Storage>> {
        (**self).build(config)
    }
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn build(&self, config: &Config) -> Result<Arc<dyn Storage>> {
        (**self).build(config)
    }
}
