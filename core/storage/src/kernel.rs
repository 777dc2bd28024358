//! Driver registry and active-driver selection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use goss_common::{Error, Result};
use goss_config::Config;

use crate::driver::Driver;
use crate::storage::Storage;

struct ActiveDriver {
    name: String,
    storage: Arc<dyn Storage>,
}

/// Registry of drivers plus the single active storage.
///
/// A kernel starts empty, accepts drivers through [`Kernel::register_driver`]
/// and serves operations once [`Kernel::use_driver`] has built a storage.
/// The active storage is built once per activation and reused until the
/// next successful `use_driver`.
#[derive(Default)]
pub struct Kernel {
    drivers: HashMap<String, Arc<dyn Driver>>,
    active: Option<ActiveDriver>,
}

impl Kernel {
    /// Create a new empty kernel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver.
    ///
    /// # Preconditions
    /// - `driver.name()` must be unique within the kernel
    ///
    /// # Errors
    /// - `DuplicateDriver` if the name is taken; the existing driver is kept
    pub fn register_driver(&mut self, driver: impl Driver + 'static) -> Result<()> {
        let name = driver.name().to_string();
        if self.drivers.contains_key(&name) {
            return Err(Error::DuplicateDriver(name));
        }
        debug!(driver = %name, "Registering driver");
        self.drivers.insert(name, Arc::new(driver));
        Ok(())
    }

    /// Build the named driver's storage and make it active.
    ///
    /// # Postconditions
    /// - On success the previous storage is dropped and replaced
    /// - On failure the previous storage, if any, stays active
    ///
    /// # Errors
    /// - `UnknownDriver` if no driver is registered under `name`
    /// - Any error returned by the driver's `build`
    pub fn use_driver(&mut self, name: &str, config: &Config) -> Result<()> {
        let driver = self
            .drivers
            .get(name)
            .ok_or_else(|| Error::UnknownDriver(name.to_string()))?;

        let storage = driver.build(config)?;
        info!(driver = %name, "Driver activated");

        self.active = Some(ActiveDriver {
            name: name.to_string(),
            storage,
        });
        Ok(())
    }

    /// The active storage.
    ///
    /// # Errors
    /// - `NoActiveDriver` until `use_driver` has succeeded once
    pub fn storage(&self) -> Result<&dyn Storage> {
        self.active
            .as_ref()
            .map(|active| active.storage.as_ref())
            .ok_or(Error::NoActiveDriver)
    }

    /// Name of the active driver.
    pub fn active_driver(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    /// Names of all registered drivers, sorted.
    pub fn drivers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check if a driver is registered.
    pub fn has_driver(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("drivers", &self.drivers())
            .field("active", &self.active_driver())
            .finish()
    }
}
