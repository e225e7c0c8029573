//! Scan error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Failure reasons for key enumeration
#[derive(Debug, Clone, Error)]
pub enum ScanError {
  /// The pattern cannot be scanned (currently only the empty pattern)
  #[error("invalid scan pattern: {0:?}")]
  InvalidPattern(String),

  /// Connection or store failure, at scan start or mid-scan
  #[error("scan unavailable: {0}")]
  Unavailable(String),

  /// A single batch fetch ran past the configured timeout
  #[error("scan batch timed out after {0:?}")]
  Timeout(Duration),
}

impl ScanError {
  pub fn unavailable(msg: impl Into<String>) -> Self {
    ScanError::Unavailable(msg.into())
  }

  /// True for failures caused by the store rather than the caller
  pub fn is_unavailable(&self) -> bool {
    matches!(self, ScanError::Unavailable(_) | ScanError::Timeout(_))
  }
}

#[cfg(feature = "proxy")]
impl From<redis::RedisError> for ScanError {
  fn from(err: redis::RedisError) -> Self {
    ScanError::Unavailable(err.to_string())
  }
}
