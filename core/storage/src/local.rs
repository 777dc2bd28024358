//! Local filesystem storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::any::Any;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use goss_common::{validate_key, Error, Operation, Result};
use goss_config::Config;

use crate::driver::Driver;
use crate::storage::{FileInfo, Storage};

/// Settings of the `[local]` scope.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// Directory holding the objects.
    pub root: PathBuf,
}

/// Local filesystem storage.
///
/// Objects are files under `root`; '/' in keys maps to subdirectories.
pub struct LocalStorage {
    name: String,
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - `Io` if the root cannot be created
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        }

        Ok(Self {
            name: "local".to_string(),
            root,
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert an object key to a filesystem path.
    fn to_fs_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        let mut fs_path = self.root.clone();
        for component in key.split('/') {
            fs_path.push(component);
        }
        Ok(fs_path)
    }

    /// Object key of a file below the root.
    fn to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let components: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        Some(components?.join("/"))
    }

    async fn file_metadata(&self, op: Operation, key: &str) -> Result<std::fs::Metadata> {
        let fs_path = self.to_fs_path(key)?;
        match fs::metadata(&fs_path).await {
            Ok(meta) if meta.is_file() => Ok(meta),
            Ok(_) => Err(Error::not_found(op, key)),
            Err(e) => Err(object_error(op, key, fs_path, e)),
        }
    }

    /// Content of the object file. A file removed after the metadata check
    /// is still reported as `NotFound`.
    async fn read_object(&self, op: Operation, key: &str) -> Result<Vec<u8>> {
        self.file_metadata(op, key).await?;
        let fs_path = self.to_fs_path(key)?;
        match fs::read(&fs_path).await {
            Ok(data) => Ok(data),
            Err(e) => Err(object_error(op, key, fs_path, e)),
        }
    }
}

/// Map a failure on an object file: absence is `NotFound`, the rest is `Io`.
fn object_error(op: Operation, key: &str, fs_path: PathBuf, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::not_found(op, key)
    } else {
        Error::io(fs_path, err)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, local_path: &Path) -> Result<()> {
        let fs_path = self.to_fs_path(key)?;
        debug!(key = %key, source = %local_path.display(), "Copying file into local storage");

        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }

        let data = fs::read(local_path)
            .await
            .map_err(|e| Error::io(local_path, e))?;
        fs::write(&fs_path, &data)
            .await
            .map_err(|e| Error::io(&fs_path, e))
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        self.read_object(Operation::Get, key).await
    }

    async fn save(&self, key: &str, local_path: &Path) -> Result<()> {
        let data = self.read_object(Operation::Save, key).await?;
        fs::write(local_path, &data)
            .await
            .map_err(|e| Error::io(local_path, e))
    }

    async fn size(&self, key: &str) -> Result<u64> {
        Ok(self.file_metadata(Operation::Size, key).await?.len())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let fs_path = self.to_fs_path(key)?;
        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = %key, "Delete of absent object");
                Ok(())
            }
            Err(e) => Err(Error::io(fs_path, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.file_metadata(Operation::Exists, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn files(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        let mut results = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(dir, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::io(&dir, e))?
            {
                let entry_path = entry.path();
                let fs_meta = entry
                    .metadata()
                    .await
                    .map_err(|e| Error::io(&entry_path, e))?;

                if fs_meta.is_dir() {
                    pending.push(entry_path);
                    continue;
                }

                let Some(key) = self.to_key(&entry_path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                let mut info = FileInfo::new(key, fs_meta.len());
                if let Ok(modified) = fs_meta.modified() {
                    info = info.with_last_modified(DateTime::<Utc>::from(modified));
                }
                results.push(info);
            }
        }

        results.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(results)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Driver for [`LocalStorage`], registered as "local".
#[derive(Debug, Clone, Default)]
pub struct LocalDriver;

impl LocalDriver {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver for LocalDriver {
    fn name(&self) -> &str {
        "local"
    }

    fn build(&self, config: &Config) -> Result<Arc<dyn Storage>> {
        let settings: LocalConfig = config.driver_config(self.name())?;
        if settings.root.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "[local] root cannot be empty".to_string(),
            ));
        }
        Ok(Arc::new(LocalStorage::new(settings.root)?))
    }
}
