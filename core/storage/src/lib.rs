//! Storage abstraction for goss.
//!
//! This crate provides the operation set every object-storage backend
//! implements ([`Storage`]), the named factories that build backends from
//! configuration ([`Driver`]), and the [`Kernel`] that registers drivers and
//! dispatches to the active one.
//!
//! # Design Principles
//! - Backend isolation: adding a backend means adding a driver, nothing else
//! - Explicit state: the active backend lives in a kernel instance, not a global
//! - Uniform errors: absence is `NotFound`, SDK failures are `Backend`

pub mod driver;
pub mod kernel;
pub mod local;
pub mod memory;
pub mod s3;
pub mod storage;

pub use driver::Driver;
pub use kernel::Kernel;
pub use local::{LocalConfig, LocalDriver, LocalStorage};
pub use memory::{MemoryDriver, MemoryStorage};
pub use s3::{AliyunConfig, AliyunDriver, S3Storage, TencentConfig, TencentDriver};
pub use storage::{FileInfo, ProgressCallback, Storage};
