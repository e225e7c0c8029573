use clap::{Parser, Subcommand};
use std::io::Write;

use crate::cache::{CacheConfig, KeyScanner, KeyStore, PageRequest};

#[derive(Parser)]
#[command(name = "sqrl-keys", about = "Scan and paginate Redis keys", version)]
pub struct ClientArgs {
  /// Path to a YAML config file (default: ./sqrl-keys.yaml if present)
  #[arg(short, long)]
  pub config: Option<String>,
  #[arg(short = 'H', long, env = "SQRL_KEYS_HOST")]
  pub host: Option<String>,
  #[arg(short, long, env = "SQRL_KEYS_PORT")]
  pub port: Option<u16>,
  #[arg(long, env = "SQRL_KEYS_PASSWORD")]
  pub password: Option<String>,
  #[arg(short = 'n', long, env = "SQRL_KEYS_DATABASE")]
  pub database: Option<u8>,
  /// SCAN COUNT hint
  #[arg(long)]
  pub batch_size: Option<usize>,
  #[arg(long)]
  pub log_level: Option<String>,
  #[arg(long, default_value = "plain")]
  pub format: OutputFormat,
  #[command(subcommand)]
  pub command: Commands,
}

impl ClientArgs {
  /// Apply command-line overrides on top of a loaded config
  pub fn apply_to(&self, config: &mut CacheConfig) {
    if let Some(host) = &self.host {
      config.proxy.host = host.clone();
    }
    if let Some(port) = self.port {
      config.proxy.port = port;
    }
    if let Some(password) = &self.password {
      config.proxy.password = Some(password.clone());
    }
    if let Some(database) = self.database {
      config.proxy.database = database;
    }
    if let Some(batch_size) = self.batch_size {
      config.scan.batch_size = batch_size;
    }
    if let Some(level) = &self.log_level {
      config.logging.level = level.clone();
    }
  }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
  /// One key per line
  #[default]
  Plain,
  Json,
}

#[derive(Subcommand)]
pub enum Commands {
  /// Check that the server answers PING
  Ping,
  /// List every key matching a pattern
  Scan { pattern: String },
  /// Print one page of matching keys
  Page {
    pattern: String,
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: usize,
    #[arg(long, default_value_t = 20)]
    size: usize,
  },
  /// Delete every key matching one or more patterns
  Delete {
    #[arg(required = true)]
    patterns: Vec<String>,
  },
}

/// Render keys in the requested format
pub fn render_keys(keys: &[String], format: OutputFormat) -> Result<String, anyhow::Error> {
  match format {
    OutputFormat::Plain => Ok(keys.join("\n")),
    OutputFormat::Json => Ok(serde_json::to_string_pretty(keys)?),
  }
}

pub async fn run_scan<S: KeyStore, W: Write>(
  scanner: &KeyScanner<S>,
  pattern: &str,
  format: OutputFormat,
  out: &mut W,
) -> Result<(), anyhow::Error> {
  match format {
    OutputFormat::Plain => {
      // Write keys as they arrive instead of collecting the keyspace
      let mut scan = scanner.try_scan(pattern).await?;
      while let Some(key) = scan.next_key().await? {
        writeln!(out, "{}", key)?;
      }
    }
    OutputFormat::Json => {
      let keys = scanner.try_keys(pattern).await?;
      writeln!(out, "{}", render_keys(&keys, format)?)?;
    }
  }
  Ok(())
}

pub async fn run_page<S: KeyStore, W: Write>(
  scanner: &KeyScanner<S>,
  pattern: &str,
  request: PageRequest,
  format: OutputFormat,
  out: &mut W,
) -> Result<(), anyhow::Error> {
  let keys = scanner.try_page(pattern, request).await?;
  if !keys.is_empty() || format == OutputFormat::Json {
    writeln!(out, "{}", render_keys(&keys, format)?)?;
  }
  Ok(())
}

pub async fn run_delete<S: KeyStore, W: Write>(
  scanner: &KeyScanner<S>,
  patterns: &[String],
  format: OutputFormat,
  out: &mut W,
) -> Result<(), anyhow::Error> {
  let removed = scanner.try_delete_matching(patterns).await?;
  match format {
    OutputFormat::Plain => writeln!(out, "Deleted {} keys", removed)?,
    OutputFormat::Json => writeln!(out, "{}", serde_json::json!({ "deleted": removed }))?,
  }
  Ok(())
}
