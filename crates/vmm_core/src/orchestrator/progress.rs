//! Aggregation of stage-local progress into one 0-100 value.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::logging::JobLogger;
use crate::models::{ProgressReport, Stage};

/// Receives overall progress reports for one job.
pub type ProgressCallback = Box<dyn Fn(ProgressReport) + Send + Sync>;

/// Maps stage-local fractions onto each stage's slice of 0-100.
///
/// Reports never go backwards and repeated values are suppressed. Stage
/// reports stop at 99; only [`complete`](Self::complete) emits 100, so a
/// job that fails during its last operation never reports 100.
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    logger: Option<Arc<JobLogger>>,
    last: Mutex<Option<u8>>,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            logger: None,
            last: Mutex::new(None),
        }
    }

    /// Also write accepted reports to the job log.
    pub fn with_logger(mut self, logger: Arc<JobLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Report that `fraction` (0.0..=1.0) of `stage` is done.
    pub fn report(&self, stage: Stage, fraction: f64) {
        let percent = overall_percent(stage, fraction).min(99);
        self.emit(ProgressReport::new(percent, stage));
    }

    /// Report job completion (100%).
    pub fn complete(&self) {
        self.emit(ProgressReport::new(100, Stage::Mux));
    }

    /// Highest percentage emitted so far.
    pub fn last_percent(&self) -> Option<u8> {
        *self.last.lock()
    }

    fn emit(&self, report: ProgressReport) {
        {
            let mut last = self.last.lock();
            if matches!(*last, Some(prev) if report.percent <= prev) {
                return;
            }
            *last = Some(report.percent);
        }

        if let Some(ref logger) = self.logger {
            logger.progress(report.percent, report.stage);
        }
        if let Some(ref callback) = self.callback {
            callback(report);
        }
    }
}

/// Overall percentage for a stage-local fraction.
pub fn overall_percent(stage: Stage, fraction: f64) -> u8 {
    let (start, end) = stage.progress_range();
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let span = f64::from(end - start);
    (f64::from(start) + span * fraction).floor() as u8
}
