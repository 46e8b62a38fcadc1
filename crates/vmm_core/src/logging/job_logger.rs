//! Per-job logger with file and callback output.
//!
//! Each job gets its own logger that:
//! - Writes to `<log_dir>/<job-id>.log` (when a log directory is given)
//! - Forwards every line to an optional callback
//! - Mirrors lines into `tracing` tagged with the job id
//! - Filters progress in compact mode
//! - Keeps a tail of engine output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};
use crate::models::{JobId, Stage};

/// Per-job logger.
pub struct JobLogger {
    job_id: JobId,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value written (compact mode filtering).
    last_progress: Mutex<Option<u8>>,
}

impl JobLogger {
    /// Create a logger writing to `<log_dir>/<job_id>.log`.
    pub fn new(
        job_id: JobId,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", job_id));
        let file = File::create(&log_path)?;

        let mut logger = Self::detached(job_id, config, callback);
        logger.log_path = Some(log_path);
        logger.file_writer = Mutex::new(Some(BufWriter::new(file)));
        Ok(logger)
    }

    /// Create a logger without a log file (callback and tracing only).
    pub fn detached(job_id: JobId, config: LogConfig, callback: Option<LogCallback>) -> Self {
        let tail_capacity = config.error_tail;
        Self {
            job_id,
            log_path: None,
            file_writer: Mutex::new(None),
            callback,
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(tail_capacity)),
            last_progress: Mutex::new(None),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Log file path, if this logger writes one.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        match level {
            LogLevel::Trace => tracing::trace!(job = %self.job_id, "{}", message),
            LogLevel::Debug => tracing::debug!(job = %self.job_id, "{}", message),
            LogLevel::Info => tracing::info!(job = %self.job_id, "{}", message),
            LogLevel::Warn => tracing::warn!(job = %self.job_id, "{}", message),
            LogLevel::Error => tracing::error!(job = %self.job_id, "{}", message),
        }

        self.output(&self.format_message(message));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Mark the start of a pipeline stage.
    pub fn stage(&self, stage: Stage) {
        self.log(LogLevel::Info, &MessagePrefix::Stage.format(stage.name()));
    }

    /// Log an engine command line (unless disabled in config).
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        if self.config.show_commands {
            self.log(LogLevel::Info, &msg);
        } else {
            self.log(LogLevel::Debug, &msg);
        }
    }

    /// Log overall progress, filtered to step boundaries in compact mode.
    ///
    /// Returns true if the value was written.
    pub fn progress(&self, percent: u8, stage: Stage) -> bool {
        {
            let mut last = self.last_progress.lock();
            if self.config.compact {
                let step = self.config.progress_step.max(1);
                let current_step = u32::from(percent) / step;
                let last_step = last.map(|p| u32::from(p) / step);
                if last_step == Some(current_step) && percent < 100 {
                    return false;
                }
            }
            if *last == Some(percent) {
                return false;
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}% ({})", percent, stage));
        true
    }

    /// Record engine output (stderr) for later diagnosis.
    ///
    /// Every line goes into the tail buffer; outside compact mode lines are
    /// also written immediately.
    pub fn engine_output(&self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            {
                let mut buffer = self.tail_buffer.lock();
                if self.config.error_tail > 0 && buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                if self.config.error_tail > 0 {
                    buffer.push_back(line.to_string());
                }
            }

            if !self.config.compact {
                self.output(&self.format_message(&format!("[engine] {}", line)));
            }
        }
    }

    /// Write the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn quiet_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_log_file_named_after_job() {
        let dir = tempdir().unwrap();
        let job_id = JobId::new();
        let logger = JobLogger::new(job_id, dir.path(), quiet_config(), None).unwrap();

        let path = logger.log_path().unwrap();
        assert!(path.exists());
        assert!(path
            .to_string_lossy()
            .ends_with(&format!("{}.log", job_id)));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new(JobId::new(), dir.path(), quiet_config(), None).unwrap();

        logger.stage(Stage::Concat);
        logger.success("Concatenated 2 clips");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("=== Concat ==="));
        assert!(content.contains("[SUCCESS] Concatenated 2 clips"));
    }

    #[test]
    fn calls_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLogger::detached(JobId::new(), quiet_config(), Some(callback));
        logger.info("one");
        logger.debug("filtered at info level");
        logger.warn("two");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..quiet_config()
        };
        let logger = JobLogger::detached(JobId::new(), config, None);

        assert!(logger.progress(0, Stage::Normalize));
        assert!(!logger.progress(5, Stage::Normalize));
        assert!(!logger.progress(15, Stage::Normalize));
        assert!(logger.progress(20, Stage::Normalize));
        assert!(!logger.progress(25, Stage::Normalize));
        assert!(logger.progress(60, Stage::Concat));
        assert!(logger.progress(100, Stage::Mux));
        assert!(!logger.progress(100, Stage::Mux));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let config = LogConfig {
            error_tail: 3,
            ..quiet_config()
        };
        let logger = JobLogger::detached(JobId::new(), config, None);

        logger.engine_output("line 0\nline 1\n\nline 2\nline 3\nline 4");

        assert_eq!(logger.get_tail(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn hidden_commands_drop_to_debug() {
        let lines = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let callback: LogCallback = Box::new(move |msg| sink.lock().push(msg.to_string()));
        let config = LogConfig {
            show_commands: false,
            ..quiet_config()
        };

        let logger = JobLogger::detached(JobId::new(), config, Some(callback));
        logger.command("ffmpeg -i clip.0.src");

        assert!(lines.lock().is_empty());
    }
}
