//! Configuration resolver for goss.
//!
//! Settings are loaded once, from an explicit file, from the conventional
//! `~/.goss.toml`, or from an injected table, and are read-only afterwards.
//! Each driver reads its own scope (a TOML table named after the driver) and
//! decodes it into a typed record with [`Config::driver_config`].

pub mod config;

pub use config::{user_home_config_path, Config, ConfigBuilder, CONFIG_FILE_NAME};
