//! The goss client facade.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use goss_common::{Error, Result};
use goss_config::{user_home_config_path, Config};
use goss_storage::{
    AliyunDriver, Driver, FileInfo, Kernel, LocalDriver, MemoryDriver, ProgressCallback, Storage,
    TencentDriver,
};

/// Names of the drivers shipped with goss.
pub const BUILTIN_DRIVERS: &[&str] = &["aliyun", "tencent", "local", "memory"];

/// Built-in driver registered under `name`, if there is one.
pub fn builtin_driver(name: &str) -> Option<Arc<dyn Driver>> {
    match name {
        "aliyun" => Some(Arc::new(AliyunDriver::new())),
        "tencent" => Some(Arc::new(TencentDriver::new())),
        "local" => Some(Arc::new(LocalDriver::new())),
        "memory" => Some(Arc::new(MemoryDriver::new())),
        _ => None,
    }
}

/// A ready-to-use storage client.
///
/// Construction loads the settings, registers the configured driver and
/// activates it, so settings errors surface here rather than on the first
/// operation.
pub struct Goss {
    kernel: Kernel,
    config: Config,
    progress: Option<ProgressCallback>,
}

impl Goss {
    /// Create a client from the configuration file at `config_path`.
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(Config::from_path(config_path)?)
    }

    /// Create a client from `~/.goss.toml`.
    pub fn from_user_home() -> Result<Self> {
        Self::new(user_home_config_path()?)
    }

    /// Create a client from injected settings.
    ///
    /// # Errors
    /// - `Configuration` if no `driver` is set, or its settings are invalid
    /// - `UnknownDriver` if `driver` names no built-in driver
    /// - `BackendInit` if the backend client cannot be constructed
    pub fn with_config(config: Config) -> Result<Self> {
        let name = config
            .driver()
            .ok_or_else(|| Error::Configuration("'driver' is not set".to_string()))?
            .to_string();
        let driver = builtin_driver(&name).ok_or_else(|| Error::UnknownDriver(name.clone()))?;

        let mut goss = Self {
            kernel: Kernel::new(),
            config,
            progress: None,
        };
        goss.kernel.register_driver(driver)?;
        goss.kernel.use_driver(&name, &goss.config)?;
        Ok(goss)
    }

    /// Register the Aliyun OSS driver.
    pub fn register_aliyun_driver(&mut self) -> Result<()> {
        self.kernel.register_driver(AliyunDriver::new())
    }

    /// Register the Tencent COS driver.
    pub fn register_tencent_driver(&mut self) -> Result<()> {
        self.kernel.register_driver(TencentDriver::new())
    }

    /// Register any driver.
    pub fn register_driver(&mut self, driver: impl Driver + 'static) -> Result<()> {
        self.kernel.register_driver(driver)
    }

    /// Switch to another registered driver, building it from the same settings.
    pub fn use_driver(&mut self, name: &str) -> Result<()> {
        self.kernel.use_driver(name, &self.config)
    }

    /// Report transfer progress of `put` and `save` to `callback` when
    /// `show_progress_bar` is enabled.
    ///
    /// Transfers are single requests, so progress is coarse: `put` reports
    /// `(0, total)` before the upload and `(total, total)` after it, `save`
    /// reports `(len, len)` once the file is written. No intermediate
    /// progress is reported.
    pub fn set_progress(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Settings this client was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The driver registry.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Mutable access to the driver registry.
    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    /// The active storage.
    pub fn storage(&self) -> Result<&dyn Storage> {
        self.kernel.storage()
    }

    fn report(&self, done: u64, total: u64) {
        if !self.config.show_progress_bar() {
            return;
        }
        if let Some(progress) = &self.progress {
            progress(done, total);
        }
    }

    /// Upload `local_path` to `key`.
    pub async fn put(&self, key: &str, local_path: impl AsRef<Path>) -> Result<()> {
        let local_path = local_path.as_ref();
        let storage = self.storage()?;

        let total = tokio::fs::metadata(local_path)
            .await
            .map(|meta| meta.len())
            .ok();
        if let Some(total) = total {
            self.report(0, total);
        }

        storage.put(key, local_path).await?;
        debug!(driver = %storage.name(), key = %key, "Put complete");

        if let Some(total) = total {
            self.report(total, total);
        }
        Ok(())
    }

    /// Content of `key` as text.
    pub async fn get(&self, key: &str) -> Result<String> {
        self.storage()?.get(key).await
    }

    /// Content of `key` as bytes.
    pub async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        self.storage()?.get_bytes(key).await
    }

    /// Download `key` into `local_path`.
    ///
    /// Progress is reported once, on completion.
    pub async fn save(&self, key: &str, local_path: impl AsRef<Path>) -> Result<()> {
        let local_path = local_path.as_ref();
        let storage = self.storage()?;
        storage.save(key, local_path).await?;
        debug!(driver = %storage.name(), key = %key, "Save complete");

        if let Ok(meta) = tokio::fs::metadata(local_path).await {
            self.report(meta.len(), meta.len());
        }
        Ok(())
    }

    /// Size of `key` in bytes.
    pub async fn size(&self, key: &str) -> Result<u64> {
        self.storage()?.size(key).await
    }

    /// Remove `key`; succeeds if it is already absent.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.storage()?.delete(key).await
    }

    /// Whether `key` exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.storage()?.exists(key).await
    }

    /// All objects under `prefix`.
    pub async fn files(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        self.storage()?.files(prefix).await
    }
}
