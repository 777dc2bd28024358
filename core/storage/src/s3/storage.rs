//! Storage implementation over a `rust-s3` bucket client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ::s3::creds::Credentials;
use ::s3::error::S3Error;
use ::s3::region::Region;
use ::s3::Bucket;
use std::any::Any;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use goss_common::{validate_key, Error, Operation, Result};

use crate::storage::{FileInfo, Storage};

/// Everything needed to construct a bucket client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSettings {
    /// Bucket name as the service knows it.
    pub bucket: String,
    /// Signing region.
    pub region: String,
    /// Service endpoint, without the bucket.
    pub endpoint: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Address the bucket in the path instead of the host name.
    pub path_style: bool,
}

/// S3-compatible storage.
///
/// Built by the aliyun and tencent drivers. The client is constructed
/// without network access; credentials are first checked by the service on
/// the first request.
pub struct S3Storage {
    name: String,
    bucket: Box<Bucket>,
}

impl S3Storage {
    /// Create a storage reporting `name` over the bucket described by `settings`.
    ///
    /// # Errors
    /// - `BackendInit` if the SDK rejects the credentials or bucket
    pub fn new(name: impl Into<String>, settings: &BucketSettings) -> Result<Self> {
        let name = name.into();
        let init_error = |e: S3Error| Error::BackendInit {
            driver: name.clone(),
            message: e.to_string(),
        };

        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| Error::BackendInit {
            driver: name.clone(),
            message: e.to_string(),
        })?;

        let region = Region::Custom {
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
        };

        let bucket = Bucket::new(&settings.bucket, region, credentials).map_err(init_error)?;
        let bucket = if settings.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        debug!(
            driver = %name,
            bucket = %settings.bucket,
            endpoint = %settings.endpoint,
            "Bucket client created"
        );
        Ok(Self { name, bucket })
    }

    /// The underlying `rust-s3` bucket, for calls outside the storage trait.
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }
}

/// Map a response status to the storage error taxonomy.
fn check_status(op: Operation, key: &str, status: u16, body: &[u8]) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(Error::not_found(op, key)),
        _ => Err(Error::backend(
            op,
            key,
            Some(status),
            String::from_utf8_lossy(body).into_owned(),
        )),
    }
}

/// Wrap an SDK error without reinterpreting it.
fn sdk_error(op: Operation, key: &str, err: S3Error) -> Error {
    match err {
        S3Error::HttpFailWithBody(status, body) => {
            match check_status(op, key, status, body.as_bytes()) {
                Err(e) => e,
                Ok(()) => Error::backend(op, key, Some(status), body),
            }
        }
        other => Error::backend(op, key, None, other.to_string()),
    }
}

/// Delete outcome: an absent object counts as deleted.
fn absent_is_deleted(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Existence from a size probe: absence is `false`, failures are reported
/// against `exists`.
fn existence(result: Result<u64>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(Error::Backend {
            key,
            status,
            message,
            ..
        }) => Err(Error::Backend {
            op: Operation::Exists,
            key,
            status,
            message,
        }),
        Err(e) => Err(e),
    }
}

/// Object size from a HEAD response's Content-Length.
fn object_size(key: &str, status: u16, content_length: Option<i64>) -> Result<u64> {
    let length = content_length.ok_or_else(|| {
        Error::backend(
            Operation::Size,
            key,
            Some(status),
            "response carries no Content-Length",
        )
    })?;
    u64::try_from(length).map_err(|_| {
        Error::backend(
            Operation::Size,
            key,
            Some(status),
            format!("invalid Content-Length {}", length),
        )
    })
}

#[async_trait]
impl Storage for S3Storage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, local_path: &Path) -> Result<()> {
        validate_key(key)?;
        let data = fs::read(local_path)
            .await
            .map_err(|e| Error::io(local_path, e))?;
        debug!(driver = %self.name, key = %key, size = data.len(), "Uploading object");

        let response = self
            .bucket
            .put_object(key, &data)
            .await
            .map_err(|e| sdk_error(Operation::Put, key, e))?;
        check_status(Operation::Put, key, response.status_code(), response.bytes())
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        debug!(driver = %self.name, key = %key, "Fetching object");
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| sdk_error(Operation::Get, key, e))?;
        check_status(Operation::Get, key, response.status_code(), response.bytes())?;
        Ok(response.bytes().to_vec())
    }

    async fn save(&self, key: &str, local_path: &Path) -> Result<()> {
        validate_key(key)?;
        debug!(driver = %self.name, key = %key, target = %local_path.display(), "Downloading object");
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| sdk_error(Operation::Save, key, e))?;
        check_status(Operation::Save, key, response.status_code(), response.bytes())?;

        fs::write(local_path, response.bytes())
            .await
            .map_err(|e| Error::io(local_path, e))
    }

    async fn size(&self, key: &str) -> Result<u64> {
        validate_key(key)?;
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| sdk_error(Operation::Size, key, e))?;
        check_status(Operation::Size, key, status, b"")?;
        object_size(key, status, head.content_length)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        debug!(driver = %self.name, key = %key, "Deleting object");
        let result = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| sdk_error(Operation::Delete, key, e))
            .and_then(|response| {
                check_status(
                    Operation::Delete,
                    key,
                    response.status_code(),
                    response.bytes(),
                )
            });
        absent_is_deleted(result)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        existence(self.size(key).await)
    }

    async fn files(&self, prefix: &str) -> Result<Vec<FileInfo>> {
        debug!(driver = %self.name, prefix = %prefix, "Listing objects");
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| sdk_error(Operation::Files, prefix, e))?;

        let mut files: Vec<FileInfo> = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| {
                let mut info = FileInfo::new(object.key, object.size as u64);
                if let Ok(modified) = DateTime::parse_from_rfc3339(&object.last_modified) {
                    info = info.with_last_modified(modified.with_timezone(&Utc));
                }
                if let Some(etag) = object.e_tag {
                    info = info.with_etag(etag.trim_matches('"'));
                }
                info
            })
            .collect();

        files.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(files)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
