//! File logging. The terminal belongs to the UI, so nothing is written to
//! stdout or stderr.

use color_eyre::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PUNCH_LOG";
const DEFAULT_FILTER: &str = "punch=info";

/// Install a daily rolling file subscriber under `dir`.
///
/// The returned guard flushes pending lines on drop; keep it alive for the
/// whole run.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)?;

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let file_appender = tracing_appender::rolling::daily(dir, "punch.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(filter),
    )
    .try_init()?;

  Ok(guard)
}
