//! Bulk key deletion built on the key scan

use std::collections::HashSet;
use std::fmt::Display;

use super::error::ScanResult;
use super::scanner::KeyScanner;
use super::store::{KeyStore, ScanConnection};

impl<S: KeyStore> KeyScanner<S> {
  /// Delete every key matching any of `patterns`.
  ///
  /// Keys are gathered first, de-duplicated across patterns, then deleted in
  /// chunks of the configured batch size. Returns the number of keys the
  /// store reported as removed.
  pub async fn try_delete_matching<P: AsRef<str>>(&self, patterns: &[P]) -> ScanResult<u64> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for pattern in patterns {
      for key in self.try_keys(pattern.as_ref()).await? {
        if seen.insert(key.clone()) {
          keys.push(key);
        }
      }
    }

    if keys.is_empty() {
      return Ok(0);
    }

    let mut conn = self.store().connect().await?;
    let mut removed = 0u64;
    for chunk in keys.chunks(self.config().count()) {
      removed += conn.delete(chunk).await?;
    }
    tracing::debug!(
      "Deleted {} of {} keys matching {} pattern(s)",
      removed,
      keys.len(),
      patterns.len()
    );
    Ok(removed)
  }

  pub async fn delete_matching<P: AsRef<str>>(&self, patterns: &[P]) -> u64 {
    self.try_delete_matching(patterns).await.unwrap_or_else(|e| {
      tracing::warn!("Bulk delete failed: {}", e);
      0
    })
  }

  /// Delete the keys matching `prefix + id` for each id
  pub async fn try_delete_by_ids<I, T>(&self, prefix: &str, ids: I) -> ScanResult<u64>
  where
    I: IntoIterator<Item = T>,
    T: Display,
  {
    let patterns: Vec<String> = ids.into_iter().map(|id| format!("{}{}", prefix, id)).collect();
    self.try_delete_matching(&patterns).await
  }

  pub async fn delete_by_ids<I, T>(&self, prefix: &str, ids: I) -> u64
  where
    I: IntoIterator<Item = T>,
    T: Display,
  {
    self.try_delete_by_ids(prefix, ids).await.unwrap_or_else(|e| {
      tracing::warn!("Delete by ids under {:?} failed: {}", prefix, e);
      0
    })
  }
}
