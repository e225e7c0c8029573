//! Cursor-driven key scan
//!
//! A [`KeyScan`] owns one store connection and one cursor for a single
//! traversal of the keys matching a glob pattern. Keys are pulled one at a
//! time; a new batch is fetched only when the current one is drained.
//!
//! The traversal is weakly consistent: it is not a snapshot, the order is
//! whatever the store returns, and under concurrent mutation a key may be
//! missed or yielded more than once. Tests should only assert properties
//! that hold for a static keyspace.
//!
//! The connection is released as soon as the cursor is exhausted, a fetch
//! fails, or the scan is dropped, whichever comes first.

use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::time::Duration;

use super::config::ScanConfig;
use super::error::{ScanError, ScanResult};
use super::store::ScanConnection;

/// A single in-flight traversal of the keyspace
pub struct KeyScan<C: ScanConnection> {
  conn: Option<C>,
  pattern: String,
  cursor: u64,
  batch: VecDeque<Vec<u8>>,
  count: usize,
  timeout: Option<Duration>,
  exhausted: bool,
  yielded: u64,
}

impl<C: ScanConnection> KeyScan<C> {
  /// Start a traversal over `conn`, fetching the first batch eagerly so that
  /// an unavailable store is reported here rather than on the first pull.
  pub async fn open(conn: C, pattern: &str, config: &ScanConfig) -> ScanResult<Self> {
    if pattern.is_empty() {
      return Err(ScanError::InvalidPattern(pattern.to_string()));
    }

    let mut scan = Self {
      conn: Some(conn),
      pattern: pattern.to_string(),
      cursor: 0,
      batch: VecDeque::new(),
      count: config.count(),
      timeout: config.batch_timeout(),
      exhausted: false,
      yielded: 0,
    };
    scan.fetch().await?;
    Ok(scan)
  }

  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  /// Number of keys pulled so far, skipped ones included
  pub fn position(&self) -> u64 {
    self.yielded
  }

  /// True once the store cursor has wrapped and every buffered key was pulled
  pub fn is_finished(&self) -> bool {
    self.batch.is_empty() && (self.exhausted || self.conn.is_none())
  }

  /// True while the scan still holds its store connection
  pub fn holds_connection(&self) -> bool {
    self.conn.is_some()
  }

  /// Pull the next raw key
  pub async fn next_raw(&mut self) -> ScanResult<Option<Vec<u8>>> {
    while self.batch.is_empty() && !self.exhausted && self.conn.is_some() {
      self.fetch().await?;
    }

    match self.batch.pop_front() {
      Some(raw) => {
        self.yielded += 1;
        if self.batch.is_empty() && self.exhausted {
          self.release();
        }
        Ok(Some(raw))
      }
      None => {
        self.release();
        Ok(None)
      }
    }
  }

  /// Pull and decode the next key
  pub async fn next_key(&mut self) -> ScanResult<Option<String>> {
    Ok(self.next_raw().await?.map(decode_key))
  }

  /// Advance past the next key without decoding it.
  /// Returns false when the scan is already exhausted.
  pub async fn skip(&mut self) -> ScanResult<bool> {
    Ok(self.next_raw().await?.is_some())
  }

  /// Drain the remaining keys
  pub async fn collect_keys(mut self) -> ScanResult<Vec<String>> {
    let mut keys = Vec::new();
    while let Some(key) = self.next_key().await? {
      keys.push(key);
    }
    Ok(keys)
  }

  /// Turn the scan into a lazy stream of keys.
  ///
  /// A mid-scan failure is logged and ends the stream early.
  pub fn into_stream(self) -> impl Stream<Item = String> + Send
  where
    C: 'static,
  {
    stream::unfold(self, |mut scan| async move {
      match scan.next_key().await {
        Ok(Some(key)) => Some((key, scan)),
        Ok(None) => None,
        Err(e) => {
          tracing::warn!(
            "Scan for {:?} ended early after {} keys: {}",
            scan.pattern,
            scan.yielded,
            e
          );
          None
        }
      }
    })
  }

  async fn fetch(&mut self) -> ScanResult<()> {
    let Some(conn) = self.conn.as_mut() else {
      return Ok(());
    };

    let request = conn.scan_batch(self.cursor, &self.pattern, self.count);
    let result = match self.timeout {
      Some(limit) => match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(ScanError::Timeout(limit)),
      },
      None => request.await,
    };

    match result {
      Ok(batch) => {
        tracing::trace!(
          "Scan {:?}: cursor {} -> {}, {} keys",
          self.pattern,
          self.cursor,
          batch.cursor,
          batch.keys.len()
        );
        self.exhausted = batch.is_last();
        self.cursor = batch.cursor;
        self.batch.extend(batch.keys);
        if self.exhausted && self.batch.is_empty() {
          self.release();
        }
        Ok(())
      }
      Err(e) => {
        self.batch.clear();
        self.release();
        Err(e)
      }
    }
  }

  fn release(&mut self) {
    if self.conn.take().is_some() {
      tracing::debug!(
        "Released scan connection for {:?} after {} keys",
        self.pattern,
        self.yielded
      );
    }
  }
}

impl<C: ScanConnection> Drop for KeyScan<C> {
  fn drop(&mut self) {
    if self.conn.is_some() {
      tracing::debug!(
        "Scan for {:?} dropped at cursor {}, releasing connection",
        self.pattern,
        self.cursor
      );
    }
  }
}

/// Keys are decoded lossily; invalid UTF-8 becomes U+FFFD
pub fn decode_key(raw: Vec<u8>) -> String {
  match String::from_utf8(raw) {
    Ok(key) => key,
    Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
  }
}
