//! Logging infrastructure for Video Music Merger.
//!
//! This module provides:
//! - Per-job loggers with file + callback output
//! - Compact mode with progress filtering
//! - Tail buffer of engine output for error diagnosis
//! - Application-wide `tracing` setup (stderr, optional rolling file)
//!
//! # Example
//!
//! ```no_run
//! use vmm_core::logging::{JobLogger, LogConfig};
//! use vmm_core::models::{JobId, Stage};
//!
//! let logger = JobLogger::new(JobId::new(), ".logs", LogConfig::default(), None).unwrap();
//!
//! logger.stage(Stage::Normalize);
//! logger.command("ffmpeg -i clip.0.src ...");
//! logger.progress(30, Stage::Normalize);
//! logger.success("Job completed");
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber (stderr only).
///
/// `RUST_LOG` overrides `default_level`. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .try_init();
}

/// Initialize tracing to stderr plus a daily-rolling file in `log_dir`.
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_tracing_with_file(default_level: LogLevel, log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let file_appender = tracing_appender::rolling::daily(log_dir, "vmm.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(filter)
        .try_init();

    guard
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter_strings() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_test_tracing();
        init_tracing(LogLevel::Warn);
        init_tracing(LogLevel::Warn);
    }
}
