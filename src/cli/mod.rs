mod commands;

pub use commands::{
  render_keys, run_delete, run_page, run_scan, ClientArgs, Commands, OutputFormat,
};
