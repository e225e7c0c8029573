//! Redis proxy mode (external Redis backend)

mod client;

pub use client::{RedisProxyClient, RedisScanConnection};
