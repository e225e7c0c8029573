//! Cursor scan tests

mod common;

use common::{flaky_scanner, memory_scanner, numbered_keys, scan_config, FaultPlan};
use futures_util::StreamExt;
use squirrelcache::cache::{InMemoryKeyStore, KeyScanner, ScanConfig, ScanError};
use std::collections::HashSet;
use std::time::Duration;

// =============================================================================
// Basic Enumeration
// =============================================================================

#[tokio::test]
async fn test_scan_yields_matching_keys() {
  let scanner = memory_scanner(["user:1", "user:2", "session:1", "user:3"], 100);

  let keys: Vec<String> = scanner.scan("user:*").await.collect().await;
  let keys: HashSet<_> = keys.into_iter().collect();
  let expected: HashSet<_> = ["user:1", "user:2", "user:3"]
    .into_iter()
    .map(String::from)
    .collect();
  assert_eq!(keys, expected);
}

#[tokio::test]
async fn test_scan_spans_many_batches() {
  let all = numbered_keys("k", 250);
  let scanner = memory_scanner(all.clone(), 7);

  let keys = scanner.keys("k*").await;
  assert_eq!(keys.len(), 250);
  let unique: HashSet<_> = keys.iter().collect();
  assert_eq!(unique.len(), 250);
}

#[tokio::test]
async fn test_scan_skips_empty_batches() {
  // Only the last of 50 keys matches, so most batches come back empty
  let mut keys = numbered_keys("other:", 49);
  keys.push("target".to_string());
  let scanner = memory_scanner(keys, 3);

  assert_eq!(scanner.keys("target").await, vec!["target".to_string()]);
}

#[tokio::test]
async fn test_scan_empty_keyspace() {
  let scanner = memory_scanner(Vec::<String>::new(), 10);
  let keys: Vec<String> = scanner.scan("*").await.collect().await;
  assert!(keys.is_empty());
  assert!(scanner.try_keys("*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_no_matches() {
  let scanner = memory_scanner(["a1", "a2"], 10);
  assert!(scanner.keys("b*").await.is_empty());
}

#[tokio::test]
async fn test_scan_empty_pattern_is_rejected() {
  let scanner = memory_scanner(["a1"], 10);
  assert!(matches!(
    scanner.try_scan("").await,
    Err(ScanError::InvalidPattern(_))
  ));
  let keys: Vec<String> = scanner.scan("").await.collect().await;
  assert!(keys.is_empty());
}

#[tokio::test]
async fn test_scan_is_independent_per_call() {
  let store = InMemoryKeyStore::with_keys(["a1", "a2"]);
  let scanner = KeyScanner::new(store.clone(), scan_config(10));

  assert_eq!(scanner.keys("a*").await.len(), 2);
  store.set("a3", "v");
  assert_eq!(scanner.keys("a*").await.len(), 3);
}

#[tokio::test]
async fn test_skip_does_not_lose_position() {
  let scanner = memory_scanner(["a", "b", "c"], 2);
  let mut scan = scanner.try_scan("*").await.unwrap();

  let first = scan.next_key().await.unwrap().unwrap();
  assert!(scan.skip().await.unwrap());
  let third = scan.next_key().await.unwrap().unwrap();
  assert_eq!(scan.position(), 3);
  assert!(!scan.skip().await.unwrap());
  assert!(scan.is_finished());
  assert_ne!(first, third);
}

// =============================================================================
// Connection Lifecycle
// =============================================================================

#[tokio::test]
async fn test_connection_released_after_exhaustion() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 20));
  let scanner = KeyScanner::new(store.clone(), scan_config(5));

  let mut scan = scanner.try_scan("k*").await.unwrap();
  assert_eq!(store.stats().open_connections, 1);
  while scan.next_key().await.unwrap().is_some() {}
  assert!(!scan.holds_connection());
  assert_eq!(store.stats().open_connections, 0);
}

#[tokio::test]
async fn test_connection_released_on_early_drop() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 20));
  let scanner = KeyScanner::new(store.clone(), scan_config(5));

  let mut stream = scanner.scan("k*").await;
  assert!(stream.next().await.is_some());
  assert_eq!(store.stats().open_connections, 1);
  drop(stream);
  assert_eq!(store.stats().open_connections, 0);
}

#[tokio::test]
async fn test_stream_take_releases_connection() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 20));
  let scanner = KeyScanner::new(store.clone(), scan_config(5));

  let keys: Vec<String> = scanner.scan("k*").await.take(3).collect().await;
  assert_eq!(keys.len(), 3);
  assert_eq!(store.stats().open_connections, 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_connect_failure_yields_empty_scan() {
  let store = InMemoryKeyStore::with_keys(["a1", "a2"]);
  let plan = FaultPlan {
    refuse_connect: true,
    ..Default::default()
  };
  let scanner = flaky_scanner(store, plan, scan_config(10));

  let err = scanner.try_scan("a*").await.err().unwrap();
  assert!(err.is_unavailable());
  let keys: Vec<String> = scanner.scan("a*").await.collect().await;
  assert!(keys.is_empty());
}

#[tokio::test]
async fn test_first_batch_failure_yields_empty_scan() {
  let store = InMemoryKeyStore::with_keys(["a1", "a2"]);
  let plan = FaultPlan {
    fail_batch: Some(0),
    ..Default::default()
  };
  let scanner = flaky_scanner(store.clone(), plan, scan_config(10));

  assert!(matches!(
    scanner.try_scan("a*").await,
    Err(ScanError::Unavailable(_))
  ));
  let keys: Vec<String> = scanner.scan("a*").await.collect().await;
  assert!(keys.is_empty());
  assert!(scanner.keys("a*").await.is_empty());
  assert_eq!(store.stats().open_connections, 0);
}

#[tokio::test]
async fn test_mid_scan_failure_truncates_stream() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 10));
  let plan = FaultPlan {
    fail_batch: Some(1),
    ..Default::default()
  };
  let scanner = flaky_scanner(store.clone(), plan, scan_config(2));

  let keys: Vec<String> = scanner.scan("k*").await.collect().await;
  assert_eq!(keys, vec!["k000".to_string(), "k001".to_string()]);
  assert_eq!(store.stats().open_connections, 0);
}

#[tokio::test]
async fn test_mid_scan_failure_surfaces_in_try_api() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 10));
  let plan = FaultPlan {
    fail_batch: Some(1),
    ..Default::default()
  };
  let scanner = flaky_scanner(store.clone(), plan, scan_config(2));

  let mut scan = scanner.try_scan("k*").await.unwrap();
  assert!(scan.next_key().await.unwrap().is_some());
  assert!(scan.next_key().await.unwrap().is_some());
  assert!(scan.next_key().await.is_err());
  assert!(!scan.holds_connection());
  assert_eq!(scan.next_key().await.unwrap(), None);

  assert!(scanner.try_keys("k*").await.is_err());
  assert!(scanner.keys("k*").await.is_empty());
}

#[tokio::test]
async fn test_batch_timeout() {
  let store = InMemoryKeyStore::with_keys(["a1"]);
  let plan = FaultPlan {
    batch_delay: Some(Duration::from_millis(500)),
    ..Default::default()
  };
  let config = ScanConfig {
    batch_size: 10,
    batch_timeout_ms: 10,
  };
  let scanner = flaky_scanner(store.clone(), plan, config);

  match scanner.try_scan("a*").await {
    Err(ScanError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(10)),
    other => panic!("expected timeout, got {:?}", other.map(|s| s.position())),
  }
  assert_eq!(store.stats().open_connections, 0);
}

#[tokio::test]
async fn test_cancelled_scan_releases_connection() {
  let store = InMemoryKeyStore::with_keys(["a1"]);
  let plan = FaultPlan {
    batch_delay: Some(Duration::from_millis(500)),
    ..Default::default()
  };
  let scanner = flaky_scanner(store.clone(), plan, scan_config(10));

  let outcome = tokio::time::timeout(Duration::from_millis(20), scanner.try_keys("a*")).await;
  assert!(outcome.is_err());
  assert_eq!(store.stats().open_connections, 0);
}

// =============================================================================
// Keyspace Changes
// =============================================================================

#[tokio::test]
async fn test_scan_reflects_store_edits() {
  let store = InMemoryKeyStore::with_keys(["a1", "a2"]);
  let scanner = KeyScanner::new(store.clone(), scan_config(10));

  assert_eq!(store.set("a1", "one"), Some(String::new()));
  assert_eq!(store.get("a1").as_deref(), Some("one"));
  assert!(store.remove("a2"));
  assert!(!store.remove("a2"));
  assert_eq!(scanner.keys("a*").await, vec!["a1".to_string()]);

  store.flush();
  assert!(store.is_empty());
  assert_eq!(store.get("a1"), None);
  assert!(scanner.keys("*").await.is_empty());
}

#[tokio::test]
async fn test_scan_resumes_after_last_visited_key() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 10));
  let scanner = KeyScanner::new(store.clone(), scan_config(3));

  // The first batch (k000..k002) is already fetched; dropping keys in front
  // of the cursor must not make the scan jump over later keys
  let mut scan = scanner.try_scan("k*").await.unwrap();
  assert!(store.remove("k000"));
  assert!(store.remove("k001"));

  let mut keys = Vec::new();
  while let Some(key) = scan.next_key().await.unwrap() {
    keys.push(key);
  }
  assert_eq!(keys, numbered_keys("k", 10));
  assert_eq!(store.stats().batches_served, 4);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scans_are_independent() {
  let store = InMemoryKeyStore::with_keys(numbered_keys("k", 100));
  let scanner = KeyScanner::new(store.clone(), scan_config(9));

  let mut handles = Vec::new();
  for _ in 0..8 {
    let scanner = scanner.clone();
    handles.push(tokio::spawn(async move { scanner.keys("k*").await }));
  }
  for handle in handles {
    assert_eq!(handle.await.unwrap().len(), 100);
  }
  assert_eq!(store.stats().open_connections, 0);
}
