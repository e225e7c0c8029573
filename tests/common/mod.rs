//! Shared test fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use squirrelcache::cache::{
  InMemoryConnection, InMemoryKeyStore, KeyScanner, KeyStore, ScanBatch, ScanConfig,
  ScanConnection, ScanError, ScanResult,
};
use std::time::Duration;

/// Failures to inject into a [`FlakyStore`]
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
  /// Refuse every connection attempt
  pub refuse_connect: bool,
  /// Fail the n-th batch fetch (0-based) on each connection
  pub fail_batch: Option<usize>,
  /// Sleep before answering each batch
  pub batch_delay: Option<Duration>,
}

/// An in-memory store that misbehaves on demand
pub struct FlakyStore {
  pub inner: InMemoryKeyStore,
  pub plan: FaultPlan,
}

impl FlakyStore {
  pub fn new(inner: InMemoryKeyStore, plan: FaultPlan) -> Self {
    Self { inner, plan }
  }
}

pub struct FlakyConnection {
  inner: InMemoryConnection,
  plan: FaultPlan,
  batches: usize,
}

#[async_trait]
impl KeyStore for FlakyStore {
  type Connection = FlakyConnection;

  async fn connect(&self) -> ScanResult<FlakyConnection> {
    if self.plan.refuse_connect {
      return Err(ScanError::unavailable("connection refused"));
    }
    Ok(FlakyConnection {
      inner: self.inner.connect().await?,
      plan: self.plan.clone(),
      batches: 0,
    })
  }
}

#[async_trait]
impl ScanConnection for FlakyConnection {
  async fn scan_batch(
    &mut self,
    cursor: u64,
    pattern: &str,
    count: usize,
  ) -> ScanResult<ScanBatch> {
    let n = self.batches;
    self.batches += 1;
    if self.plan.fail_batch == Some(n) {
      return Err(ScanError::unavailable("connection reset by peer"));
    }
    if let Some(delay) = self.plan.batch_delay {
      tokio::time::sleep(delay).await;
    }
    self.inner.scan_batch(cursor, pattern, count).await
  }

  async fn delete(&mut self, keys: &[String]) -> ScanResult<u64> {
    self.inner.delete(keys).await
  }
}

pub fn scan_config(batch_size: usize) -> ScanConfig {
  ScanConfig {
    batch_size,
    batch_timeout_ms: 0,
  }
}

/// `count` keys named `{prefix}000`, `{prefix}001`, ...
pub fn numbered_keys(prefix: &str, count: usize) -> Vec<String> {
  (0..count).map(|i| format!("{}{:03}", prefix, i)).collect()
}

pub fn memory_scanner<I, K>(keys: I, batch_size: usize) -> KeyScanner<InMemoryKeyStore>
where
  I: IntoIterator<Item = K>,
  K: Into<String>,
{
  KeyScanner::new(InMemoryKeyStore::with_keys(keys), scan_config(batch_size))
}

pub fn flaky_scanner(
  store: InMemoryKeyStore,
  plan: FaultPlan,
  config: ScanConfig,
) -> KeyScanner<FlakyStore> {
  KeyScanner::new(FlakyStore::new(store, plan), config)
}
