//! Logging setup for the command line tool
//!
//! Console output goes to stderr so it never mixes with rendered results on
//! stdout. An optional log file receives JSON lines through a non-blocking
//! writer.

use anyhow::Result;
use std::path::Path;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CliSettings;

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped and must be kept
/// alive for as long as the program runs.
pub fn init_logging(settings: &CliSettings, level_override: Option<&str>) -> Result<Option<WorkerGuard>> {
    let level = match level_override.unwrap_or(&settings.log_level).to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let (plain_layer, json_layer) = if settings.json_logging {
        (None, Some(fmt::layer().with_writer(std::io::stderr).json()))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr).with_target(false)), None)
    };

    let (file_layer, guard) = if let Some(log_path) = &settings.log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_appender = rolling::never(
            log_path.parent().unwrap_or_else(|| Path::new(".")),
            log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("rsync-task.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Filter used when `RUST_LOG` is unset.
///
/// The library and the `rsync-task` binary share the `rsync_task` target.
fn default_directives(level: tracing::Level) -> String {
    format!("rsync_task={}", level.as_str().to_lowercase())
}
