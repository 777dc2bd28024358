//! Tencent COS driver.

use serde::Deserialize;
use std::sync::Arc;

use goss_common::{Error, Result};
use goss_config::Config;

use super::storage::{BucketSettings, S3Storage};
use super::{parse_endpoint, require};
use crate::driver::Driver;
use crate::storage::Storage;

/// Registry name of the Tencent driver.
pub const TENCENT: &str = "tencent";

/// Settings of the `[tencent]` scope.
#[derive(Debug, Clone, Deserialize)]
pub struct TencentConfig {
    /// Bucket URL, `https://<bucket>-<appid>.cos.<region>.myqcloud.com`.
    pub url: String,
    /// SecretId.
    pub secret_id: String,
    /// SecretKey.
    pub secret_key: String,
}

impl TencentConfig {
    /// Validate and convert into bucket client settings.
    ///
    /// Bucket, region and service endpoint all come from the bucket URL.
    pub fn bucket_settings(&self) -> Result<BucketSettings> {
        require(TENCENT, "secret_id", &self.secret_id)?;
        require(TENCENT, "secret_key", &self.secret_key)?;

        let url = parse_endpoint(TENCENT, "url", &self.url)?;
        let host = url.host_str().unwrap_or_default();
        let labels: Vec<&str> = host.split('.').collect();

        let malformed = || {
            Error::Configuration(format!(
                "[tencent] url host '{}' is not of the form <bucket>-<appid>.cos.<region>.myqcloud.com",
                host
            ))
        };

        if labels.len() < 4 || labels[1] != "cos" || labels.iter().any(|l| l.is_empty()) {
            return Err(malformed());
        }
        let bucket = labels[0];
        if !bucket.contains('-') {
            return Err(malformed());
        }
        let region = labels[2];

        let mut endpoint = format!("{}://{}", url.scheme(), labels[1..].join("."));
        if let Some(port) = url.port() {
            endpoint.push_str(&format!(":{}", port));
        }

        Ok(BucketSettings {
            bucket: bucket.to_string(),
            region: region.to_string(),
            endpoint,
            access_key: self.secret_id.clone(),
            secret_key: self.secret_key.clone(),
            path_style: false,
        })
    }
}

/// Driver for Tencent COS, registered as "tencent".
#[derive(Debug, Clone, Default)]
pub struct TencentDriver;

impl TencentDriver {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver for TencentDriver {
    fn name(&self) -> &str {
        TENCENT
    }

    fn build(&self, config: &Config) -> Result<Arc<dyn Storage>> {
        let settings: TencentConfig = config.driver_config(TENCENT)?;
        Ok(Arc::new(S3Storage::new(TENCENT, &settings.bucket_settings()?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tencent(url: &str) -> TencentConfig {
        TencentConfig {
            url: url.to_string(),
            secret_id: "id".to_string(),
            secret_key: "key".to_string(),
        }
    }

    #[test]
    fn test_settings_from_bucket_url() {
        let settings = tencent("https://examplebucket-1250000000.cos.ap-guangzhou.myqcloud.com")
            .bucket_settings()
            .unwrap();

        assert_eq!(settings.bucket, "examplebucket-1250000000");
        assert_eq!(settings.region, "ap-guangzhou");
        assert_eq!(settings.endpoint, "https://cos.ap-guangzhou.myqcloud.com");
        assert_eq!(settings.access_key, "id");
    }

    #[test]
    fn test_settings_without_scheme() {
        let settings = tencent("examplebucket-1250000000.cos.ap-beijing.myqcloud.com/")
            .bucket_settings()
            .unwrap();
        assert_eq!(settings.region, "ap-beijing");
        assert_eq!(settings.endpoint, "https://cos.ap-beijing.myqcloud.com");
    }

    #[test]
    fn test_rejects_non_cos_url() {
        for url in [
            "https://oss-cn-hangzhou.aliyuncs.com",
            "https://examplebucket.cos.ap-guangzhou.myqcloud.com",
            "https://localhost",
        ] {
            assert!(
                matches!(tencent(url).bucket_settings(), Err(Error::Configuration(_))),
                "{url}"
            );
        }
    }

    #[test]
    fn test_build() {
        let config = Config::builder()
            .driver(TENCENT)
            .set(TENCENT, "url", "https://examplebucket-1250000000.cos.ap-guangzhou.myqcloud.com")
            .set(TENCENT, "secret_id", "id")
            .set(TENCENT, "secret_key", "key")
            .build()
            .unwrap();

        let storage = TencentDriver::new().build(&config).unwrap();
        assert_eq!(storage.name(), TENCENT);
        assert!(storage.as_any().downcast_ref::<S3Storage>().is_some());
    }

    #[test]
    fn test_build_without_scope() {
        let err = TencentDriver::new().build(&Config::default()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
