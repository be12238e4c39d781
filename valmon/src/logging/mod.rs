//! Logging setup.
//!
//! Human-readable output goes to stdout. With `--output <file>` the log is
//! written to that file as JSON lines instead, through a non-blocking writer.
//! Timestamps use the local timezone.

use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "valmon=info,sqlx=warn,tower_http=info";

/// Filter directive used with `--debug`.
pub const DEBUG_LOG_FILTER: &str = "valmon=debug,sqlx=warn,tower_http=debug";

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Filter directive for the given verbosity. `RUST_LOG` wins when set.
fn build_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            DEBUG_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    })
}

/// Initialize the global subscriber.
///
/// # Returns
/// The writer guard when logging to a file; keep it alive for the app lifetime
/// so buffered lines are flushed on exit.
pub fn init_logging(output: Option<&Path>, debug: bool) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match output {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::config(format!("invalid log file: {}", path.display())))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)?;

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = output
        .is_none()
        .then(|| fmt::layer().with_ansi(true).with_timer(LocalTimer));

    tracing_subscriber::registry()
        .with(build_filter(debug))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(guard)
}
