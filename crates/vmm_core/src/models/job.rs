//! Job structures (merge requests and their progress reports).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MediaKind, Stage};
use super::media::MediaBuffer;

/// Unique identifier for one merge job.
///
/// Every submission gets a fresh id, so artifact namespaces and log files
/// never collide across jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0.simple())
    }
}

/// One merge request: a video plus an ordered list of audio clips.
///
/// Clip order is the caller's order and is preserved exactly (no sorting,
/// no dedup). A job is immutable once constructed.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    video: MediaBuffer,
    clips: Vec<MediaBuffer>,
}

impl Job {
    /// Create a job with a fresh id.
    pub fn new(video: MediaBuffer, clips: Vec<MediaBuffer>) -> Self {
        Self {
            id: JobId::new(),
            video,
            clips,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn video(&self) -> &MediaBuffer {
        &self.video
    }

    pub fn clips(&self) -> &[MediaBuffer] {
        &self.clips
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Check preconditions that must hold before any engine work starts.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.video.is_empty() {
            return Err("No video provided".to_string());
        }
        if self.video.kind() != MediaKind::Video {
            return Err(format!(
                "'{}' was supplied as the video but is declared {}",
                self.video.name(),
                self.video.kind()
            ));
        }
        if self.clips.is_empty() {
            return Err("At least one audio clip is required".to_string());
        }
        for (i, clip) in self.clips.iter().enumerate() {
            if clip.kind() != MediaKind::Audio {
                return Err(format!(
                    "Clip {} ('{}') is declared {}, expected audio",
                    i,
                    clip.name(),
                    clip.kind()
                ));
            }
            if clip.is_empty() {
                return Err(format!("Clip {} ('{}') is empty", i, clip.name()));
            }
        }
        Ok(())
    }
}

/// Overall progress of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Overall completion, 0..=100.
    pub percent: u8,
    /// Stage that produced this report.
    pub stage: Stage,
}

impl ProgressReport {
    pub fn new(percent: u8, stage: Stage) -> Self {
        Self {
            percent: percent.min(100),
            stage,
        }
    }
}
