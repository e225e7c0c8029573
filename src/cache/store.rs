//! Store seam for key enumeration
//!
//! A [`KeyStore`] hands out dedicated connections; each [`ScanConnection`]
//! speaks the store's cursor-scan primitive. Dropping a connection releases it.

use async_trait::async_trait;

use super::error::ScanResult;

/// One round trip of the store's cursor scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBatch {
  /// Continuation cursor; 0 means the iteration is complete
  pub cursor: u64,
  /// Raw matching keys, possibly empty even when `cursor != 0`
  pub keys: Vec<Vec<u8>>,
}

impl ScanBatch {
  pub fn new(cursor: u64, keys: Vec<Vec<u8>>) -> Self {
    Self { cursor, keys }
  }

  pub fn is_last(&self) -> bool {
    self.cursor == 0
  }
}

/// A connection-scoped handle to the store
#[async_trait]
pub trait ScanConnection: Send {
  /// Fetch the next batch for `pattern` starting at `cursor`.
  /// `count` is a work hint, not a bound on the batch size.
  async fn scan_batch(&mut self, cursor: u64, pattern: &str, count: usize)
    -> ScanResult<ScanBatch>;

  /// Delete keys, returning how many the store actually removed
  async fn delete(&mut self, keys: &[String]) -> ScanResult<u64>;
}

/// Source of scan connections
#[async_trait]
pub trait KeyStore: Send + Sync {
  type Connection: ScanConnection + 'static;

  /// Acquire a dedicated connection
  async fn connect(&self) -> ScanResult<Self::Connection>;
}
