//! goss: one client for every object-storage backend.
//!
//! [`Goss`] loads settings, registers the configured driver with a
//! [`Kernel`] and exposes the active backend's operations:
//!
//! ```no_run
//! # async fn run() -> goss::Result<()> {
//! let goss = goss::Goss::from_user_home()?;
//! goss.put("test/foo.txt", "foo.txt").await?;
//! assert_eq!(goss.get("test/foo.txt").await?, "foo");
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::{builtin_driver, Goss, BUILTIN_DRIVERS};

pub use goss_common::{Error, Operation, Result};
pub use goss_config::{user_home_config_path, Config, ConfigBuilder};
pub use goss_storage::{
    AliyunDriver, Driver, FileInfo, Kernel, LocalDriver, MemoryDriver, ProgressCallback,
    S3Storage, Storage, TencentDriver,
};
