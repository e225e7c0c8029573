//! Offset pagination over a key scan
//!
//! A scan cursor cannot seek, so page `k` of size `n` is produced by walking
//! a fresh scan from the start: the first `k * n` keys are skipped without
//! being decoded, the next `n` are collected, and the scan is dropped as soon
//! as the window is full. Fetching page `k` therefore costs O((k + 1) * n)
//! scan steps. [`KeyPages`] is the cheaper alternative when a caller walks
//! pages in order: it keeps one cursor open across pages.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::error::ScanResult;
use super::scan::KeyScan;
use super::store::ScanConnection;

/// Collected pages never pre-allocate more than this many slots
const MAX_PAGE_PREALLOC: usize = 1024;

/// A zero-based page index and a page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
  pub page_index: usize,
  pub page_size: usize,
}

impl PageRequest {
  pub fn new(page_index: usize, page_size: usize) -> Self {
    Self {
      page_index,
      page_size,
    }
  }

  /// Build a request from signed input, rejecting negative components
  pub fn from_signed(page_index: i64, page_size: i64) -> Option<Self> {
    Some(Self {
      page_index: usize::try_from(page_index).ok()?,
      page_size: usize::try_from(page_size).ok()?,
    })
  }

  /// The half-open index range this page covers in scan order.
  /// `None` for a zero page size or a window past `usize::MAX`.
  pub fn window(&self) -> Option<Range<usize>> {
    if self.page_size == 0 {
      return None;
    }
    let from = self.page_index.checked_mul(self.page_size)?;
    let to = from.checked_add(self.page_size)?;
    Some(from..to)
  }
}

/// Skip to `window.start`, then collect keys until `window.end` or until the
/// scan runs out. The scan is left positioned right after the last
/// collected key.
pub async fn collect_window<C: ScanConnection>(
  scan: &mut KeyScan<C>,
  window: Range<usize>,
) -> ScanResult<Vec<String>> {
  let mut index = 0usize;
  while index < window.start {
    if !scan.skip().await? {
      return Ok(Vec::new());
    }
    index += 1;
  }

  let mut page = Vec::with_capacity(window.len().min(MAX_PAGE_PREALLOC));
  while index < window.end {
    match scan.next_key().await? {
      Some(key) => page.push(key),
      None => break,
    }
    index += 1;
  }
  Ok(page)
}

/// Consecutive pages read from a single scan
pub struct KeyPages<C: ScanConnection> {
  scan: KeyScan<C>,
  page_size: usize,
  next_index: usize,
}

impl<C: ScanConnection> KeyPages<C> {
  pub(crate) fn new(scan: KeyScan<C>, page_size: usize) -> Self {
    Self {
      scan,
      page_size,
      next_index: 0,
    }
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  /// Index of the page the next call to [`KeyPages::next_page`] returns
  pub fn next_index(&self) -> usize {
    self.next_index
  }

  /// Read the next page. `None` once the scan is exhausted; the final page
  /// may be short but is never empty. A zero page size yields no pages.
  pub async fn next_page(&mut self) -> ScanResult<Option<Vec<String>>> {
    if self.page_size == 0 {
      return Ok(None);
    }
    let page = collect_window(&mut self.scan, 0..self.page_size).await?;
    if page.is_empty() {
      return Ok(None);
    }
    self.next_index += 1;
    Ok(Some(page))
  }
}
