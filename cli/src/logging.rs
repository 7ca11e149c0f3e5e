//! Logging initialization.
//!
//! - **RUST_LOG**: filter, e.g. `info`, `zoom_ws=debug`. Default: `info`.
//! - **LOG_FILE**: when set, logs are appended to this file (no ANSI) instead of stderr,
//!   through a background writer thread. Keep the returned guard alive until exit so
//!   buffered lines are flushed.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::log_format::SessionLineFormat;

/// Splits `LOG_FILE` into the appender's directory and file name. A bare file name lives
/// in the current directory.
pub fn split_log_path(path: &Path) -> Option<(PathBuf, String)> {
    let file_name = path.file_name()?.to_str()?.to_string();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, file_name))
}

/// Single file, never rotated, appended to.
pub fn file_appender(path: &Path) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let (dir, file_name) = split_log_path(path)
        .ok_or_else(|| format!("LOG_FILE has no file name: {}", path.display()))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)?;
    Ok(appender)
}

pub fn init() -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper_util=off"));

    if let Ok(path) = std::env::var("LOG_FILE") {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(Path::new(&path))?);
        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(SessionLineFormat::new())
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(file_layer).try_init()?;
        tracing::info!(path = %path, "zoom-ws logging to file");
        Ok(Some(guard))
    } else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .event_format(SessionLineFormat::new())
            .with_writer(std::io::stderr)
            .with_filter(filter);
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
        Ok(None)
    }
}
