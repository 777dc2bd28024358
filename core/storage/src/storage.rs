//! Storage capability trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use goss_common::{Error, Result};

/// Transfer progress callback, called with `(done_bytes, total_bytes)`.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// An object listed by [`Storage::files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    key: String,
    size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
}

impl FileInfo {
    /// Create an entry with the given key and size.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            etag: None,
        }
    }

    /// Attach the last modification time.
    pub fn with_last_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(modified);
        self
    }

    /// Attach the backend's entity tag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Full object key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last modification time, if the backend reports one.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Entity tag, if the backend reports one.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}

/// The operation set every backend provides.
///
/// Operations behave the same on every backend: a missing object is reported
/// as `NotFound` by `get`/`get_bytes`/`save`/`size`, as `false` by `exists`,
/// and is not an error for `delete`. Backend failures are returned as
/// `Backend` with the SDK's status and message; nothing is retried.
/// Every operation taking a key rejects it with `InvalidKey` before any I/O
/// when it fails [`goss_common::validate_key`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Name of the driver that built this storage (e.g., "aliyun", "local").
    fn name(&self) -> &str;

    /// Upload the content of `local_path` to `key`, overwriting it.
    ///
    /// # Errors
    /// - `Io` if the local file cannot be read
    /// - `Backend` on SDK failure
    async fn put(&self, key: &str, local_path: &Path) -> Result<()>;

    /// Fetch the full content of `key`.
    ///
    /// # Errors
    /// - `NotFound` if the object does not exist
    /// - `Backend` on SDK failure
    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>>;

    /// Fetch the full content of `key` as text.
    ///
    /// # Errors
    /// - As [`Storage::get_bytes`]
    /// - `NotText` if the content is not valid UTF-8
    async fn get(&self, key: &str) -> Result<String> {
        let data = self.get_bytes(key).await?;
        String::from_utf8(data).map_err(|_| Error::NotText {
            key: key.to_string(),
        })
    }

    /// Download `key` into `local_path`, creating or truncating it.
    ///
    /// # Errors
    /// - `NotFound` if the object does not exist
    /// - `Io` if the local file cannot be written
    async fn save(&self, key: &str, local_path: &Path) -> Result<()>;

    /// Size of `key` in bytes.
    ///
    /// # Errors
    /// - `NotFound` if the object does not exist
    async fn size(&self, key: &str) -> Result<u64>;

    /// Remove `key`. Removing an absent object succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// All objects whose key starts with `prefix`, sorted by key.
    ///
    /// Every page the backend needs is fetched before returning.
    async fn files(&self, prefix: &str) -> Result<Vec<FileInfo>>;

    /// Escape hatch to the concrete backend, for backend-specific calls.
    ///
    /// Downcasting this breaks the storage abstraction on purpose; code that
    /// uses it is tied to one backend.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStorage;
    use crate::memory::MemoryStorage;

    #[test]
    fn test_file_info_accessors() {
        let info = FileInfo::new("test/foo.txt", 3).with_etag("abc123");
        assert_eq!(info.key(), "test/foo.txt");
        assert_eq!(info.size(), 3);
        assert_eq!(info.etag(), Some("abc123"));
        assert_eq!(info.last_modified(), None);
    }

    #[test]
    fn test_file_info_serialization() {
        let modified = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let info = FileInfo::new("logs/app.log", 1024).with_last_modified(modified);

        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("etag"));

        let deserialized: FileInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, info);
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected_by_every_backend() {
        let temp = tempfile::TempDir::new().unwrap();
        let foo = temp.path().join("foo.txt");
        std::fs::write(&foo, "foo").unwrap();
        let target = temp.path().join("foo1.txt");

        let backends: Vec<Box<dyn Storage>> = vec![
            Box::new(MemoryStorage::new("memory")),
            Box::new(LocalStorage::new(temp.path().join("bucket")).unwrap()),
        ];

        for storage in &backends {
            for key in ["", "/abs", "../x", "dir/", "a//b", "a/./b"] {
                let invalid = |result: Result<()>| matches!(result, Err(Error::InvalidKey { .. }));
                let name = storage.name();

                assert!(invalid(storage.put(key, &foo).await), "{name} put {key:?}");
                assert!(invalid(storage.get(key).await.map(drop)), "{name} get {key:?}");
                assert!(invalid(storage.save(key, &target).await), "{name} save {key:?}");
                assert!(invalid(storage.size(key).await.map(drop)), "{name} size {key:?}");
                assert!(invalid(storage.delete(key).await), "{name} delete {key:?}");
                assert!(invalid(storage.exists(key).await.map(drop)), "{name} exists {key:?}");
            }
        }
    }
}
