// Key scanning and pagination for Redis-compatible caches
pub mod cache;

// Command-line front end (only compiled with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
