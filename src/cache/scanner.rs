//! Key enumeration facade
//!
//! Every operation comes in two flavours. The `try_` methods return a
//! [`ScanResult`] so callers can tell "no matching keys" apart from "store
//! unavailable". The plain methods log the failure and fall back to an empty
//! result, which is what most cache callers want.

use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

use super::config::ScanConfig;
use super::error::{ScanError, ScanResult};
use super::page::{collect_window, KeyPages, PageRequest};
use super::scan::KeyScan;
use super::store::KeyStore;

/// Scans and paginates the keys of a [`KeyStore`]
pub struct KeyScanner<S: KeyStore> {
  store: Arc<S>,
  config: ScanConfig,
}

impl<S: KeyStore> Clone for KeyScanner<S> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      config: self.config.clone(),
    }
  }
}

impl<S: KeyStore> KeyScanner<S> {
  pub fn new(store: S, config: ScanConfig) -> Self {
    Self::from_shared(Arc::new(store), config)
  }

  pub fn from_shared(store: Arc<S>, config: ScanConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn config(&self) -> &ScanConfig {
    &self.config
  }

  /// Open a scan on a dedicated connection
  pub async fn try_scan(&self, pattern: &str) -> ScanResult<KeyScan<S::Connection>> {
    if pattern.is_empty() {
      return Err(ScanError::InvalidPattern(String::new()));
    }
    let conn = self.store.connect().await?;
    KeyScan::open(conn, pattern, &self.config).await
  }

  /// Lazy sequence of keys matching `pattern`; empty if the store is
  /// unavailable, truncated if it fails mid-scan.
  pub async fn scan(&self, pattern: &str) -> BoxStream<'static, String> {
    match self.try_scan(pattern).await {
      Ok(scan) => scan.into_stream().boxed(),
      Err(e) => {
        tracing::warn!("Key scan for {:?} failed: {}", pattern, e);
        stream::empty().boxed()
      }
    }
  }

  /// All keys matching `pattern`
  pub async fn try_keys(&self, pattern: &str) -> ScanResult<Vec<String>> {
    self.try_scan(pattern).await?.collect_keys().await
  }

  pub async fn keys(&self, pattern: &str) -> Vec<String> {
    self.try_keys(pattern).await.unwrap_or_else(|e| {
      tracing::warn!("Key listing for {:?} failed: {}", pattern, e);
      Vec::new()
    })
  }

  /// One page of matching keys, walking a fresh scan from the start.
  /// A request with no window (zero size, overflow) is an empty page and
  /// never touches the store.
  pub async fn try_page(&self, pattern: &str, request: PageRequest) -> ScanResult<Vec<String>> {
    let Some(window) = request.window() else {
      return Ok(Vec::new());
    };
    let mut scan = self.try_scan(pattern).await?;
    collect_window(&mut scan, window).await
  }

  pub async fn page(&self, pattern: &str, page_index: usize, page_size: usize) -> Vec<String> {
    self
      .try_page(pattern, PageRequest::new(page_index, page_size))
      .await
      .unwrap_or_else(|e| {
        tracing::warn!(
          "Page {} (size {}) for {:?} failed: {}",
          page_index,
          page_size,
          pattern,
          e
        );
        Vec::new()
      })
  }

  /// Walk pages of `page_size` keys in order over a single cursor
  pub async fn pages(&self, pattern: &str, page_size: usize) -> ScanResult<KeyPages<S::Connection>> {
    let scan = self.try_scan(pattern).await?;
    Ok(KeyPages::new(scan, page_size))
  }
}
