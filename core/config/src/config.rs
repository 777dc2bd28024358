//! Loading and scoped lookup of goss settings.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use tracing::debug;

use goss_common::{Error, Result};

/// File name of the per-user configuration file.
pub const CONFIG_FILE_NAME: &str = ".goss.toml";

const DRIVER_KEY: &str = "driver";
const SHOW_PROGRESS_BAR_KEY: &str = "show_progress_bar";

/// Location of the per-user configuration file (`~/.goss.toml`).
///
/// # Errors
/// - Returns `Configuration` if the home directory cannot be determined
pub fn user_home_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or_else(|| Error::Configuration("Cannot determine user home directory".to_string()))
}

/// Read-only goss settings.
///
/// Top-level keys are `driver` (the active driver name), `show_progress_bar`,
/// and one table per driver scope.
#[derive(Clone, Default, PartialEq)]
pub struct Config {
    driver: Option<String>,
    show_progress_bar: bool,
    scopes: BTreeMap<String, toml::Table>,
}

impl Config {
    /// Start building a configuration programmatically.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `Configuration` if it is not valid TOML or fails validation
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");

        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        raw.parse::<Config>().map_err(|e| match e {
            Error::Configuration(msg) => {
                Error::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Load settings from `~/.goss.toml`.
    pub fn from_user_home() -> Result<Self> {
        Self::from_path(user_home_config_path()?)
    }

    /// Build settings from an already parsed table.
    ///
    /// # Errors
    /// - `Configuration` if `driver` is not a non-empty string,
    ///   `show_progress_bar` is not a bool, or any other top-level key is not
    ///   a table
    pub fn from_table(mut table: toml::Table) -> Result<Self> {
        let driver = match table.remove(DRIVER_KEY) {
            None => None,
            Some(toml::Value::String(name)) => {
                if name.is_empty() {
                    return Err(Error::Configuration("'driver' cannot be empty".to_string()));
                }
                Some(name)
            }
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "'driver' must be a string, found {}",
                    other.type_str()
                )))
            }
        };

        let show_progress_bar = match table.remove(SHOW_PROGRESS_BAR_KEY) {
            None => false,
            Some(toml::Value::Boolean(flag)) => flag,
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "'show_progress_bar' must be a boolean, found {}",
                    other.type_str()
                )))
            }
        };

        let mut scopes = BTreeMap::new();
        for (name, value) in table {
            match value {
                toml::Value::Table(scope) => {
                    scopes.insert(name, scope);
                }
                other => {
                    return Err(Error::Configuration(format!(
                        "Top-level key '{}' must be a driver table, found {}",
                        name,
                        other.type_str()
                    )))
                }
            }
        }

        Ok(Self {
            driver,
            show_progress_bar,
            scopes,
        })
    }

    /// Name of the active driver, if configured.
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    /// Whether transfers should report progress.
    pub fn show_progress_bar(&self) -> bool {
        self.show_progress_bar
    }

    /// Raw settings table of a driver scope.
    pub fn scope(&self, scope: &str) -> Option<&toml::Table> {
        self.scopes.get(scope)
    }

    /// Names of all configured driver scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    /// Look up `key` within a driver scope. Absence is `None`, not an error.
    pub fn get(&self, key: &str, scope: &str) -> Option<&toml::Value> {
        self.scopes.get(scope).and_then(|table| table.get(key))
    }

    /// Decode a driver scope into its typed settings record.
    ///
    /// A missing scope decodes as an empty table, so records whose fields
    /// all have defaults still succeed.
    ///
    /// # Errors
    /// - `Configuration` naming the scope when a field is missing or has the
    ///   wrong type
    pub fn driver_config<T: DeserializeOwned>(&self, scope: &str) -> Result<T> {
        let table = self.scopes.get(scope).cloned().unwrap_or_default();
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| Error::Configuration(format!("invalid [{}] settings: {}", scope, e)))
    }

    /// Copy of these settings with a different active driver.
    pub fn with_driver(mut self, name: impl Into<String>) -> Self {
        self.driver = Some(name.into());
        self
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let table: toml::Table = s
            .parse()
            .map_err(|e: toml::de::Error| Error::Configuration(e.to_string()))?;
        Self::from_table(table)
    }
}

// Scope contents hold credentials, so only their names are printed.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("driver", &self.driver)
            .field("show_progress_bar", &self.show_progress_bar)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Programmatic builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    table: toml::Table,
}

impl ConfigBuilder {
    /// Set the active driver name.
    pub fn driver(mut self, name: impl Into<String>) -> Self {
        self.table
            .insert(DRIVER_KEY.to_string(), toml::Value::String(name.into()));
        self
    }

    /// Enable or disable progress reporting.
    pub fn show_progress_bar(mut self, flag: bool) -> Self {
        self.table
            .insert(SHOW_PROGRESS_BAR_KEY.to_string(), toml::Value::Boolean(flag));
        self
    }

    /// Set `key` inside a driver scope, creating the scope if needed.
    ///
    /// A non-table value already stored under `scope` is replaced by the
    /// scope, so a scope named like a top-level setting fails in `build`.
    pub fn set(mut self, scope: &str, key: &str, value: impl Into<toml::Value>) -> Self {
        let entry = self
            .table
            .entry(scope.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        if let toml::Value::Table(scope_table) = entry {
            scope_table.insert(key.to_string(), value.into());
        }
        self
    }

    /// Validate and finish.
    pub fn build(self) -> Result<Config> {
        Config::from_table(self.table)
    }
}
