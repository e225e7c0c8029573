//! In-memory key store
//!
//! An ordered keyspace that speaks the same cursor protocol as Redis SCAN:
//! the cursor is a position, each batch visits `count` positions and returns
//! only the keys matching the pattern, and a zero cursor ends the iteration.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::error::ScanResult;
use super::glob::GlobPattern;
use super::store::{KeyStore, ScanBatch, ScanConnection};

/// Key store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStoreStats {
  pub keys: usize,
  pub open_connections: usize,
  pub batches_served: u64,
}

struct Shared {
  data: RwLock<BTreeMap<String, String>>,
  open_connections: AtomicUsize,
  batches_served: AtomicU64,
}

/// In-memory key store. Clones share the same keyspace.
#[derive(Clone)]
pub struct InMemoryKeyStore {
  shared: Arc<Shared>,
}

impl Default for InMemoryKeyStore {
  fn default() -> Self {
    Self::new()
  }
}

impl InMemoryKeyStore {
  pub fn new() -> Self {
    Self {
      shared: Arc::new(Shared {
        data: RwLock::new(BTreeMap::new()),
        open_connections: AtomicUsize::new(0),
        batches_served: AtomicU64::new(0),
      }),
    }
  }

  /// Build a store holding `keys`, each with an empty value
  pub fn with_keys<I, K>(keys: I) -> Self
  where
    I: IntoIterator<Item = K>,
    K: Into<String>,
  {
    let store = Self::new();
    {
      let mut data = store.shared.data.write();
      for key in keys {
        data.insert(key.into(), String::new());
      }
    }
    store
  }

  /// Insert or replace a key, returning the previous value
  pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    self.shared.data.write().insert(key.into(), value.into())
  }

  pub fn get(&self, key: &str) -> Option<String> {
    self.shared.data.read().get(key).cloned()
  }

  pub fn remove(&self, key: &str) -> bool {
    self.shared.data.write().remove(key).is_some()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.shared.data.read().contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.shared.data.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn flush(&self) {
    self.shared.data.write().clear();
  }

  pub fn stats(&self) -> KeyStoreStats {
    KeyStoreStats {
      keys: self.len(),
      open_connections: self.shared.open_connections.load(Ordering::Acquire),
      batches_served: self.shared.batches_served.load(Ordering::Relaxed),
    }
  }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
  type Connection = InMemoryConnection;

  async fn connect(&self) -> ScanResult<InMemoryConnection> {
    self.shared.open_connections.fetch_add(1, Ordering::AcqRel);
    Ok(InMemoryConnection {
      shared: self.shared.clone(),
      glob: None,
      resume: None,
    })
  }
}

/// A connection to an [`InMemoryKeyStore`]
pub struct InMemoryConnection {
  shared: Arc<Shared>,
  glob: Option<GlobPattern>,
  /// Cursor handed out by the last batch and the last key that batch visited
  resume: Option<(u64, String)>,
}

impl InMemoryConnection {
  fn glob_for(&mut self, pattern: &str) -> &GlobPattern {
    let stale = self.glob.as_ref().map(|g| g.as_str() != pattern).unwrap_or(true);
    if stale {
      self.glob = Some(GlobPattern::new(pattern));
    }
    self.glob.get_or_insert_with(|| GlobPattern::new(pattern))
  }
}

#[async_trait]
impl ScanConnection for InMemoryConnection {
  async fn scan_batch(
    &mut self,
    cursor: u64,
    pattern: &str,
    count: usize,
  ) -> ScanResult<ScanBatch> {
    let shared = self.shared.clone();
    let resume = self.resume.take();
    let glob = self.glob_for(pattern);
    let start = usize::try_from(cursor).unwrap_or(usize::MAX);
    let count = count.max(1);

    let (batch, resume) = {
      let data = shared.data.read();
      // Continue after the last visited key instead of walking from the front
      let mut visited: Box<dyn Iterator<Item = &String> + '_> = match &resume {
        Some((at, after)) if *at == cursor => Box::new(
          data
            .range::<str, _>((Bound::Excluded(after.as_str()), Bound::Unbounded))
            .map(|(k, _)| k),
        ),
        _ => Box::new(data.keys().skip(start)),
      };

      let mut keys = Vec::new();
      let mut last = None;
      for key in visited.by_ref().take(count) {
        if glob.matches(key) {
          keys.push(key.as_bytes().to_vec());
        }
        last = Some(key);
      }

      if visited.next().is_some() {
        let next = start.saturating_add(count) as u64;
        let resume = last.map(|key| (next, key.clone()));
        (ScanBatch::new(next, keys), resume)
      } else {
        (ScanBatch::new(0, keys), None)
      }
    };
    self.resume = resume;

    shared.batches_served.fetch_add(1, Ordering::Relaxed);
    Ok(batch)
  }

  async fn delete(&mut self, keys: &[String]) -> ScanResult<u64> {
    let mut data = self.shared.data.write();
    let removed = keys.iter().filter(|k| data.remove(k.as_str()).is_some()).count();
    Ok(removed as u64)
  }
}

impl Drop for InMemoryConnection {
  fn drop(&mut self) {
    self.shared.open_connections.fetch_sub(1, Ordering::AcqRel);
  }
}
