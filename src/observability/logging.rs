//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once per process
//! - Pick the output format and destination from config
//! - Flush buffered file output on shutdown
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over `observability.log_level`
//! - File output is appended, never truncated

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("cannot open log file: {0}")]
    File(#[from] io::Error),
    #[error("subscriber already installed: {0}")]
    Install(String),
}

/// Keeps the log destination alive. Flushes it when dropped.
#[must_use = "dropping the guard flushes and stops file logging"]
pub struct LoggingGuard {
    file: Option<SharedFile>,
}

impl LoggingGuard {
    pub fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        self.flush();
    }
}

#[derive(Clone)]
struct SharedFile(Arc<Mutex<BufWriter<File>>>);

impl SharedFile {
    fn lock(&self) -> std::sync::MutexGuard<'_, BufWriter<File>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Build the filter: `RUST_LOG` if set, else the configured level.
pub fn filter(config: &ObservabilityConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.log_level)?),
    }
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<LoggingGuard, LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config)?)
        .with_target(true);

    let file = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(SharedFile(Arc::new(Mutex::new(BufWriter::new(file)))))
        }
        None => None,
    };

    let installed = match (config.log_format, file.clone()) {
        (LogFormat::Pretty, None) => builder.try_init(),
        (LogFormat::Pretty, Some(writer)) => builder.with_ansi(false).with_writer(writer).try_init(),
        (LogFormat::Json, None) => builder.json().try_init(),
        (LogFormat::Json, Some(writer)) => builder.json().with_writer(writer).try_init(),
    };
    installed.map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(LoggingGuard { file })
}
