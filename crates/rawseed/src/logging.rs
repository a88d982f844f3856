use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Logging for one process run: human-readable stderr plus a JSON file per
/// day (`<dir>/YYYY-MM-DD.log`).
///
/// The subscriber is installed as the scoped default for as long as the
/// session lives. Dropping it flushes the file writer.
pub struct LogSession {
    directory: PathBuf,
    _dispatch: DefaultGuard,
    _writer: WorkerGuard,
}

impl LogSession {
    pub fn start(directory: &Path, verbosity: u8) -> Result<Self> {
        fs::create_dir_all(directory)
            .with_context(|| format!("failed to create log directory {}", directory.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_suffix("log")
            .build(directory)
            .with_context(|| format!("failed to open log file in {}", directory.display()))?;
        let (writer, writer_guard) = tracing_appender::non_blocking(appender);

        let stderr_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));
        let stderr_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter);

        let file_layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(EnvFilter::new("debug"));

        let subscriber = tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer);
        let dispatch = tracing::subscriber::set_default(subscriber);

        Ok(Self {
            directory: directory.to_path_buf(),
            _dispatch: dispatch,
            _writer: writer_guard,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
