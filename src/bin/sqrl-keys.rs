use clap::Parser;
use squirrelcache::cache::{CacheConfig, KeyScanner, PageRequest, RedisProxyClient};
use squirrelcache::cli::{run_delete, run_page, run_scan, ClientArgs, Commands};
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = ClientArgs::parse();

  // Load config: explicit path > auto-detect > defaults
  let mut config = if let Some(path) = &args.config {
    CacheConfig::from_file(path)?
  } else {
    CacheConfig::find_and_load()?.unwrap_or_default()
  };
  args.apply_to(&mut config);

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let client = RedisProxyClient::new(config.proxy.clone())?;
  let mut out = std::io::stdout().lock();

  match &args.command {
    Commands::Ping => {
      client.test_connection().await?;
      writeln!(out, "PONG")?;
    }
    Commands::Scan { pattern } => {
      let scanner = KeyScanner::new(client, config.scan.clone());
      run_scan(&scanner, pattern, args.format, &mut out).await?;
    }
    Commands::Page {
      pattern,
      page,
      size,
    } => {
      let scanner = KeyScanner::new(client, config.scan.clone());
      let request = PageRequest::new(*page, *size);
      run_page(&scanner, pattern, request, args.format, &mut out).await?;
    }
    Commands::Delete { patterns } => {
      let scanner = KeyScanner::new(client, config.scan.clone());
      run_delete(&scanner, patterns, args.format, &mut out).await?;
    }
  }

  Ok(())
}
