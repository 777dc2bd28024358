//! Aliyun OSS driver.

use serde::Deserialize;
use std::sync::Arc;

use goss_common::{Error, Result};
use goss_config::Config;

use super::storage::{BucketSettings, S3Storage};
use super::{parse_endpoint, require};
use crate::driver::Driver;
use crate::storage::Storage;

/// Registry name of the Aliyun driver.
pub const ALIYUN: &str = "aliyun";

/// Settings of the `[aliyun]` scope.
#[derive(Debug, Clone, Deserialize)]
pub struct AliyunConfig {
    /// Region endpoint, e.g. `https://oss-cn-hangzhou.aliyuncs.com`.
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// AccessKey ID.
    pub access_key_id: String,
    /// AccessKey secret.
    pub access_key_secret: String,
    /// Signing region; derived from the endpoint host when unset.
    #[serde(default)]
    pub region: Option<String>,
}

impl AliyunConfig {
    /// Validate and convert into bucket client settings.
    pub fn bucket_settings(&self) -> Result<BucketSettings> {
        require(ALIYUN, "bucket", &self.bucket)?;
        require(ALIYUN, "access_key_id", &self.access_key_id)?;
        require(ALIYUN, "access_key_secret", &self.access_key_secret)?;

        let url = parse_endpoint(ALIYUN, "endpoint", &self.endpoint)?;
        let host = url.host_str().unwrap_or_default();

        // oss-cn-hangzhou.aliyuncs.com -> oss-cn-hangzhou
        let region = match &self.region {
            Some(region) if !region.trim().is_empty() => region.trim().to_string(),
            _ => host
                .split('.')
                .next()
                .filter(|label| label.starts_with("oss-"))
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "[aliyun] cannot derive region from endpoint host '{}'; set region",
                        host
                    ))
                })?,
        };

        let endpoint = url.origin().ascii_serialization();

        Ok(BucketSettings {
            bucket: self.bucket.trim().to_string(),
            region,
            endpoint,
            access_key: self.access_key_id.clone(),
            secret_key: self.access_key_secret.clone(),
            path_style: false,
        })
    }
}

/// Driver for Aliyun OSS, registered as "aliyun".
#[derive(Debug, Clone, Default)]
pub struct AliyunDriver;

impl AliyunDriver {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver for AliyunDriver {
    fn name(&self) -> &str {
        ALIYUN
    }

    fn build(&self, config: &Config) -> Result<Arc<dyn Storage>> {
        let settings: AliyunConfig = config.driver_config(ALIYUN)?;
        Ok(Arc::new(S3Storage::new(ALIYUN, &settings.bucket_settings()?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::builder()
            .driver(ALIYUN)
            .set(ALIYUN, "endpoint", "oss-cn-hangzhou.aliyuncs.com")
            .set(ALIYUN, "bucket", "goss-test")
            .set(ALIYUN, "access_key_id", "id")
            .set(ALIYUN, "access_key_secret", "secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_settings_from_endpoint() {
        let aliyun: AliyunConfig = config().driver_config(ALIYUN).unwrap();
        let settings = aliyun.bucket_settings().unwrap();

        assert_eq!(settings.bucket, "goss-test");
        assert_eq!(settings.region, "oss-cn-hangzhou");
        assert_eq!(settings.endpoint, "https://oss-cn-hangzhou.aliyuncs.com");
        assert!(!settings.path_style);
    }

    #[test]
    fn test_explicit_region_wins() {
        let aliyun = AliyunConfig {
            endpoint: "https://oss-accelerate.aliyuncs.com".to_string(),
            bucket: "goss-test".to_string(),
            access_key_id: "id".to_string(),
            access_key_secret: "secret".to_string(),
            region: Some("oss-cn-shanghai".to_string()),
        };
        assert_eq!(aliyun.bucket_settings().unwrap().region, "oss-cn-shanghai");
    }

    #[test]
    fn test_region_not_derivable() {
        let aliyun = AliyunConfig {
            endpoint: "https://storage.example.com".to_string(),
            bucket: "goss-test".to_string(),
            access_key_id: "id".to_string(),
            access_key_secret: "secret".to_string(),
            region: None,
        };
        assert!(matches!(
            aliyun.bucket_settings(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_build() {
        let storage = AliyunDriver::new().build(&config()).unwrap();
        assert_eq!(storage.name(), ALIYUN);

        let s3 = storage.as_any().downcast_ref::<S3Storage>().unwrap();
        assert_eq!(s3.bucket().name(), "goss-test");
    }

    #[test]
    fn test_build_missing_settings() {
        let config = Config::builder()
            .set(ALIYUN, "endpoint", "oss-cn-hangzhou.aliyuncs.com")
            .build()
            .unwrap();

        let err = AliyunDriver::new().build(&config).err().unwrap();
        match err {
            Error::Configuration(msg) => assert!(msg.contains("bucket"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_build_empty_secret() {
        let config = Config::builder()
            .set(ALIYUN, "endpoint", "oss-cn-hangzhou.aliyuncs.com")
            .set(ALIYUN, "bucket", "goss-test")
            .set(ALIYUN, "access_key_id", "id")
            .set(ALIYUN, "access_key_secret", "")
            .build()
            .unwrap();

        assert!(matches!(
            AliyunDriver::new().build(&config),
            Err(Error::Configuration(_))
        ));
    }
}
