//! Structured Logger
//!
//! Console output plus an optional daily-rolling NDJSON file. `RUST_LOG`
//! overrides the configured level.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Base name of the rolling log file (`cmdforge.log.YYYY-MM-DD`).
pub const LOG_FILE_NAME: &str = "cmdforge.log";

/// Initialize the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logger(log_dir: Option<&Path>, level: &str, json_console: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_console {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
        fmt::layer().json().with_writer(appender).with_ansi(false).boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
