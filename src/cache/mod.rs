//! Key enumeration for Redis-compatible caches
//!
//! Provides:
//! - A cursor-driven, lazily pulled key scan over a glob pattern
//! - Offset pagination on top of the scan, plus an in-order page walker
//! - Bulk deletion by pattern or by prefix + id
//! - An external Redis backend and an embedded in-memory backend

pub mod config;
pub mod error;
pub mod glob;
mod keyspace;
pub mod memory;
pub mod page;
#[cfg(feature = "proxy")]
pub mod proxy;
pub mod scan;
mod scanner;
pub mod store;

pub use config::{CacheConfig, CacheProxyConfig, LoggingSection, ScanConfig};
pub use error::{ScanError, ScanResult};
pub use glob::GlobPattern;
pub use memory::{InMemoryConnection, InMemoryKeyStore, KeyStoreStats};
pub use page::{KeyPages, PageRequest};
#[cfg(feature = "proxy")]
pub use proxy::RedisProxyClient;
pub use scan::KeyScan;
pub use scanner::KeyScanner;
pub use store::{KeyStore, ScanBatch, ScanConnection};
