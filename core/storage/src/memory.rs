//! In-memory storage backend for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::fs;
use tracing::debug;

use goss_common::{validate_key, Error, Operation, Result};
use goss_config::Config;

use crate::driver::Driver;
use crate::storage::{FileInfo, Storage};

#[derive(Debug, Clone)]
struct Object {
    data: Bytes,
    modified: DateTime<Utc>,
}

/// In-memory storage.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
pub struct MemoryStorage {
    name: String,
    objects: RwLock<BTreeMap<String, Object>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage reporting `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, op: Operation, key: &str) -> Result<Object> {
        validate_key(key)?;
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(op, key))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, local_path: &Path) -> Result<()> {
        validate_key(key)?;
        let data = fs::read(local_path)
            .await
            .map_err(|e| Error::io(local_path, e))?;
        debug!(key = %key, size = data.len(), "Storing object in memory");

        let object = Object {
            data: Bytes::from(data),
            modified: Utc::now(),
        };
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), object);
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.lookup(Operation::Get, key)?.data.to_vec())
    }

    async fn save(&self, key: &str, local_path: &Path) -> Result<()> {
        let object = self.lookup(Operation::Save, key)?;
        fs::write(local_path, &object.data)
            .await
            .map_err(|e| Error::io(local_path, e))
    }

    async fn size(&self, key: &str) -> Result<u64> {
        Ok(self.lookup(Operation::Size, key)?.data.len() as u64)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let removed = self
            .objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        debug!(key = %key, existed = removed.is_some(), "Deleted object from memory");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key))
    }

    async fn files(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| {
                FileInfo::new(key.clone(), object.data.len() as u64)
                    .with_last_modified(object.modified)
            })
            .collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Driver for [`MemoryStorage`]. Takes no settings.
///
/// Every activation starts from an empty store.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    name: String,
}

impl MemoryDriver {
    /// Driver registered as "memory".
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Driver registered under a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, _config: &Config) -> Result<Arc<dyn Storage>> {
        Ok(Arc::new(MemoryStorage::new(self.name.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(content: &str) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo.txt");
        std::fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[tokio::test]
    async fn test_put_get() {
        let storage = MemoryStorage::new("memory");
        let (_temp, foo) = fixture("foo");

        storage.put("test/foo.txt", &foo).await.unwrap();
        assert_eq!(storage.get("test/foo.txt").await.unwrap(), "foo");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let storage = MemoryStorage::new("memory");
        let err = storage.get("missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_binary_is_not_text() {
        let storage = MemoryStorage::new("memory");
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.bin");
        std::fs::write(&path, b"\xff\xfe\x00").unwrap();

        storage.put("blob.bin", &path).await.unwrap();
        assert!(matches!(
            storage.get("blob.bin").await,
            Err(Error::NotText { .. })
        ));
        assert_eq!(
            storage.get_bytes("blob.bin").await.unwrap(),
            b"\xff\xfe\x00".to_vec()
        );
    }

    #[tokio::test]
    async fn test_size() {
        let storage = MemoryStorage::new("memory");
        let (_temp, foo) = fixture("foo");

        storage.put("test/foo.txt", &foo).await.unwrap();
        assert_eq!(storage.size("test/foo.txt").await.unwrap(), 3);
        assert!(storage.size("test/nope.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_save() {
        let storage = MemoryStorage::new("memory");
        let (temp, foo) = fixture("foo");
        let target = temp.path().join("foo1.txt");

        storage.put("test/foo.txt", &foo).await.unwrap();
        storage.save("test/foo.txt", &target).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "foo");
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let storage = MemoryStorage::new("memory");
        let (_temp, foo) = fixture("foo");

        assert!(!storage.exists("test/foo.txt").await.unwrap());
        storage.put("test/foo.txt", &foo).await.unwrap();
        assert!(storage.exists("test/foo.txt").await.unwrap());

        storage.delete("test/foo.txt").await.unwrap();
        assert!(!storage.exists("test/foo.txt").await.unwrap());

        // Already absent.
        storage.delete("test/foo.txt").await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_files_by_prefix() {
        let storage = MemoryStorage::new("memory");
        let (_temp, foo) = fixture("foo");

        storage.put("test/foo.txt", &foo).await.unwrap();
        storage.put("test2/foo.txt", &foo).await.unwrap();
        storage.put("other/foo.txt", &foo).await.unwrap();

        let files = storage.files("test/").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key(), "test/foo.txt");
        assert_eq!(files[0].size(), 3);

        assert_eq!(storage.files("test").await.unwrap().len(), 2);
        assert_eq!(storage.files("").await.unwrap().len(), 3);
        assert_eq!(storage.len(), 3);
    }

    #[tokio::test]
    async fn test_put_missing_local_file_is_io_error() {
        let storage = MemoryStorage::new("memory");
        let temp = TempDir::new().unwrap();

        let err = storage
            .put("a.txt", &temp.path().join("absent.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_driver_builds_fresh_storage() {
        let driver = MemoryDriver::named("scratch");
        let storage = driver.build(&Config::default()).unwrap();

        assert_eq!(storage.name(), "scratch");
        let memory = storage.as_any().downcast_ref::<MemoryStorage>().unwrap();
        assert!(memory.is_empty());
    }
}
