//! Cache configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Expand environment variables in a string.
/// Supports $VAR_NAME and ${VAR_NAME} syntax.
fn expand_env_vars(input: &str) -> String {
  let mut result = input.to_string();

  // ${VAR_NAME} first, it is the more specific form
  while let Some(start) = result.find("${") {
    if let Some(end) = result[start..].find('}') {
      let var_name = &result[start + 2..start + end];
      let value = std::env::var(var_name).unwrap_or_default();
      result = format!(
        "{}{}{}",
        &result[..start],
        value,
        &result[start + end + 1..]
      );
    } else {
      break;
    }
  }

  let mut i = 0;
  while i < result.len() {
    if result[i..].starts_with('$') {
      let rest = &result[i + 1..];
      let var_len = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count();
      if var_len > 0 {
        let var_name = &rest[..var_len];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..i], value, &rest[var_len..]);
        i += value.len();
        continue;
      }
    }
    i += result[i..].chars().next().map(char::len_utf8).unwrap_or(1);
  }

  result
}

/// Connection settings for the external Redis server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheProxyConfig {
  /// Redis host
  #[serde(default = "default_host")]
  pub host: String,

  /// Redis port
  #[serde(default = "default_redis_port")]
  pub port: u16,

  /// Redis password (optional)
  #[serde(default)]
  pub password: Option<String>,

  /// Redis database number
  #[serde(default)]
  pub database: u8,

  /// Enable TLS
  #[serde(default)]
  pub tls_enabled: bool,
}

fn default_host() -> String {
  "localhost".to_string()
}

fn default_redis_port() -> u16 {
  6379
}

impl Default for CacheProxyConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_redis_port(),
      password: None,
      database: 0,
      tls_enabled: false,
    }
  }
}

impl CacheProxyConfig {
  /// Generate Redis connection URL
  pub fn connection_url(&self) -> String {
    let scheme = if self.tls_enabled { "rediss" } else { "redis" };
    let auth = match &self.password {
      Some(pwd) if !pwd.is_empty() => format!(":{}@", pwd),
      _ => String::new(),
    };
    format!(
      "{}://{}{}:{}/{}",
      scheme, auth, self.host, self.port, self.database
    )
  }
}

/// Key scan tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
  /// COUNT hint sent with every SCAN round trip; also the DEL chunk size
  #[serde(default = "default_batch_size")]
  pub batch_size: usize,

  /// Upper bound on a single batch fetch in milliseconds (0 = no timeout)
  #[serde(default)]
  pub batch_timeout_ms: u64,
}

fn default_batch_size() -> usize {
  100
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      batch_size: default_batch_size(),
      batch_timeout_ms: 0,
    }
  }
}

impl ScanConfig {
  /// Batch size, never below 1
  pub fn count(&self) -> usize {
    self.batch_size.max(1)
  }

  pub fn batch_timeout(&self) -> Option<Duration> {
    (self.batch_timeout_ms > 0).then(|| Duration::from_millis(self.batch_timeout_ms))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}

fn default_level() -> String {
  "info".into()
}

impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

/// Top-level configuration, usually read from `sqrl-keys.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub proxy: CacheProxyConfig,
  #[serde(default)]
  pub scan: ScanConfig,
  #[serde(default)]
  pub logging: LoggingSection,
}

impl CacheConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
    let content = std::fs::read_to_string(path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, anyhow::Error> {
    let expanded = expand_env_vars(content);
    Ok(serde_yaml::from_str(&expanded)?)
  }

  pub fn find_and_load() -> Result<Option<Self>, anyhow::Error> {
    for p in ["sqrl-keys.yaml", "sqrl-keys.yml"] {
      if Path::new(p).exists() {
        return Ok(Some(Self::from_file(p)?));
      }
    }
    Ok(None)
  }
}
