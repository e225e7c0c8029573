//! Redis proxy client for scanning external Redis servers

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};

use crate::cache::config::CacheProxyConfig;
use crate::cache::error::ScanResult;
use crate::cache::store::{KeyStore, ScanBatch, ScanConnection};

/// Redis proxy client that connects to external Redis servers
pub struct RedisProxyClient {
  client: Client,
  config: CacheProxyConfig,
}

impl RedisProxyClient {
  /// Create a new Redis proxy client from configuration.
  /// No connection is opened until the first scan.
  pub fn new(config: CacheProxyConfig) -> Result<Self, RedisError> {
    let client = Client::open(config.connection_url())?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &CacheProxyConfig {
    &self.config
  }

  /// Test the connection to Redis
  pub async fn test_connection(&self) -> Result<(), RedisError> {
    let mut conn = self.client.get_multiplexed_async_connection().await?;
    redis::cmd("PING").query_async::<()>(&mut conn).await?;
    Ok(())
  }
}

#[async_trait]
impl KeyStore for RedisProxyClient {
  type Connection = RedisScanConnection;

  async fn connect(&self) -> ScanResult<RedisScanConnection> {
    let conn = self.client.get_multiplexed_async_connection().await?;
    tracing::debug!(
      "Opened scan connection to {}:{}/{}",
      self.config.host,
      self.config.port,
      self.config.database
    );
    Ok(RedisScanConnection { conn })
  }
}

/// A dedicated connection used for one scan; dropping it closes it
pub struct RedisScanConnection {
  conn: MultiplexedConnection,
}

#[async_trait]
impl ScanConnection for RedisScanConnection {
  async fn scan_batch(
    &mut self,
    cursor: u64,
    pattern: &str,
    count: usize,
  ) -> ScanResult<ScanBatch> {
    let (next, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
      .arg(cursor)
      .arg("MATCH")
      .arg(pattern)
      .arg("COUNT")
      .arg(count)
      .query_async(&mut self.conn)
      .await?;
    Ok(ScanBatch::new(next, keys))
  }

  async fn delete(&mut self, keys: &[String]) -> ScanResult<u64> {
    if keys.is_empty() {
      return Ok(0);
    }
    let removed: u64 = redis::cmd("DEL")
      .arg(keys)
      .query_async(&mut self.conn)
      .await?;
    Ok(removed)
  }
}
