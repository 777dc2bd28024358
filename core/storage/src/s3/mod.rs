//! S3-compatible object storage backends.
//!
//! Aliyun OSS and Tencent COS both speak the S3 protocol, so their drivers
//! only differ in how settings map onto a bucket client:
//! - [`AliyunDriver`]: endpoint + bucket + access key pair
//! - [`TencentDriver`]: bucket URL + secret id/key

pub mod aliyun;
pub mod storage;
pub mod tencent;

pub use aliyun::{AliyunConfig, AliyunDriver};
pub use storage::{BucketSettings, S3Storage};
pub use tencent::{TencentConfig, TencentDriver};

use goss_common::{Error, Result};
use url::Url;

/// Parse an endpoint, defaulting to https when no scheme is given.
fn parse_endpoint(scope: &str, field: &str, raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Configuration(format!(
            "[{}] {} cannot be empty",
            scope, field
        )));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|e| {
        Error::Configuration(format!("[{}] {} '{}' is not a valid URL: {}", scope, field, raw, e))
    })?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Configuration(format!(
            "[{}] {} '{}' has no host",
            scope, field, raw
        )));
    }
    Ok(url)
}

/// Reject empty required settings.
fn require(scope: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!(
            "[{}] {} cannot be empty",
            scope, field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_adds_scheme() {
        let url = parse_endpoint("aliyun", "endpoint", "oss-cn-hangzhou.aliyuncs.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("oss-cn-hangzhou.aliyuncs.com"));
    }

    #[test]
    fn test_parse_endpoint_keeps_scheme() {
        let url = parse_endpoint("aliyun", "endpoint", "http://127.0.0.1:9000").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(9000));
    }

    #[test]
    fn test_parse_endpoint_rejects_empty() {
        assert!(matches!(
            parse_endpoint("aliyun", "endpoint", "  "),
            Err(Error::Configuration(_))
        ));
    }
}
