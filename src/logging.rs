//! File logging. The terminal belongs to the UI, so logs go to a daily
//! rotated file instead of stderr.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Environment variable that overrides the configured filter.
const LOG_ENV: &str = "SHOPTERM_LOG";

/// Install the global subscriber.
///
/// The returned guard flushes buffered lines on drop; keep it alive for the
/// lifetime of the process.
pub fn init(config: &LogConfig, level_override: Option<&str>) -> Result<WorkerGuard> {
  let directory = match &config.directory {
    Some(dir) => dir.clone(),
    None => default_directory()?,
  };
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, "shopterm.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), level_override, &config.level);

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}

/// Precedence: environment, then command line, then config file.
fn build_filter(env: Option<&str>, cli: Option<&str>, configured: &str) -> EnvFilter {
  let directive = env
    .filter(|v| !v.trim().is_empty())
    .or(cli)
    .unwrap_or(configured);

  EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn default_directory() -> Result<PathBuf> {
  let base = dirs::state_dir()
    .or_else(dirs::data_local_dir)
    .ok_or_else(|| eyre!("Could not determine log directory"))?;
  Ok(base.join("shopterm"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_precedence() {
    assert_eq!(build_filter(Some("debug"), Some("warn"), "info").to_string(), "debug");
    assert_eq!(build_filter(None, Some("warn"), "info").to_string(), "warn");
    assert_eq!(build_filter(Some(" "), None, "error").to_string(), "error");
  }
}
