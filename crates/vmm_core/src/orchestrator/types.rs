//! Core types for the orchestrator pipeline.

use std::path::Path;
use std::sync::Arc;

use crate::config::Settings;
use crate::engine::{EngineCommand, EngineError, EngineHandle, InvocationTag, MediaInfo};
use crate::logging::JobLogger;
use crate::models::{JobId, Stage};
use crate::store::{ArtifactKey, ArtifactStore, StoreResult};

use super::errors::{StepError, StepResult};
use super::phase::{JobPhase, PhaseCell};
use super::progress::ProgressTracker;

/// Read-only context passed to pipeline steps.
///
/// Contains job configuration and shared resources that steps can read
/// but not modify. Mutable state goes in `JobState`.
pub struct Context {
    pub job_id: JobId,
    /// Display name of the uploaded video.
    pub video_name: String,
    /// Display names of the uploaded clips, in upload order.
    pub clip_names: Vec<String>,
    pub settings: Settings,
    pub logger: Arc<JobLogger>,
    pub engine: EngineHandle,
    progress: ProgressTracker,
    phase: PhaseCell,
}

impl Context {
    pub fn new(
        job_id: JobId,
        settings: Settings,
        logger: Arc<JobLogger>,
        engine: EngineHandle,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            job_id,
            video_name: String::new(),
            clip_names: Vec::new(),
            settings,
            logger,
            engine,
            progress,
            phase: PhaseCell::default(),
        }
    }

    /// Set the display names used in error messages.
    pub fn with_names(mut self, video_name: impl Into<String>, clip_names: Vec<String>) -> Self {
        self.video_name = video_name.into();
        self.clip_names = clip_names;
        self
    }

    pub(crate) fn with_phase_cell(mut self, phase: PhaseCell) -> Self {
        self.phase = phase;
        self
    }

    /// Name of clip `index`, falling back to its position.
    pub fn clip_name(&self, index: usize) -> String {
        self.clip_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("clip {}", index))
    }

    /// Report stage-local progress (0.0..=1.0 of `stage`).
    pub fn report_progress(&self, stage: Stage, fraction: f64) {
        self.progress.report(stage, fraction);
    }

    pub(crate) fn complete_progress(&self) {
        self.progress.complete();
    }

    pub fn set_phase(&self, phase: JobPhase) {
        tracing::debug!("[{}] phase -> {}", self.job_id, phase);
        self.phase.set(phase);
    }

    pub fn tag(&self, stage: Stage) -> InvocationTag {
        InvocationTag::new(self.job_id, stage)
    }

    /// Probe a file on behalf of `stage`.
    pub fn probe(&self, stage: Stage, path: &Path) -> Result<MediaInfo, EngineError> {
        self.engine.probe(self.tag(stage), path)
    }

    /// Run an engine command, logging it and keeping its error output.
    pub fn run_engine(
        &self,
        command: &EngineCommand,
        operation: &str,
        on_progress: &mut dyn FnMut(f64),
    ) -> StepResult<()> {
        self.logger.command(&command.display_line(self.engine.name()));

        self.engine.execute(command, on_progress).map_err(|e| {
            if let EngineError::Failed { ref message, .. } = e {
                self.logger.engine_output(message);
            }
            StepError::engine(operation, e)
        })
    }
}

#[cfg(test)]
impl Context {
    /// Context with default settings and a detached logger.
    pub(crate) fn for_test(engine: EngineHandle) -> Self {
        let job_id = JobId::new();
        let logger = JobLogger::detached(job_id, crate::logging::LogConfig::default(), None);
        Self::new(
            job_id,
            Settings::default(),
            Arc::new(logger),
            engine,
            ProgressTracker::new(None),
        )
    }
}

/// Ordered list of normalized clip artifacts.
///
/// Entry order is upload order; concatenation follows it exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ArtifactKey>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: ArtifactKey) {
        self.entries.push(key);
    }

    pub fn entries(&self) -> &[ArtifactKey] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a concat-demuxer list, one `file '<path>'` line per entry.
    pub fn render(&self, store: &ArtifactStore) -> StoreResult<String> {
        let mut out = String::new();
        for key in &self.entries {
            let path = store.path(key)?;
            out.push_str("file '");
            out.push_str(&escape_list_path(&path.to_string_lossy()));
            out.push_str("'\n");
        }
        Ok(out)
    }
}

impl FromIterator<ArtifactKey> for Manifest {
    fn from_iter<I: IntoIterator<Item = ArtifactKey>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Quote-escape a path for a single-quoted concat list entry.
fn escape_list_path(path: &str) -> String {
    path.replace('\'', "'\\''")
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Steps add their outputs here; the store owns every artifact and is
/// removed from disk when the state is dropped.
pub struct JobState {
    pub job_id: JobId,
    pub store: ArtifactStore,
    /// Staged video.
    pub video: Option<ArtifactKey>,
    /// Staged clips, in upload order.
    pub clips: Vec<ArtifactKey>,
    /// Normalize step output.
    pub manifest: Option<Manifest>,
    /// Concat step output.
    pub concat: Option<ArtifactKey>,
    /// Mux step output.
    pub output: Option<ArtifactKey>,
}

impl JobState {
    pub fn new(job_id: JobId, store: ArtifactStore) -> Self {
        Self {
            job_id,
            store,
            video: None,
            clips: Vec::new(),
            manifest: None,
            concat: None,
            output: None,
        }
    }

    /// Write the video and clips into the store.
    pub fn stage_inputs(&mut self, video: &[u8], clips: &[&[u8]]) -> StoreResult<()> {
        let key = ArtifactKey::video_source();
        self.store.put(&key, video)?;
        self.video = Some(key);

        for (i, bytes) in clips.iter().enumerate() {
            let key = ArtifactKey::clip_source(i);
            self.store.put(&key, bytes)?;
            self.clips.push(key);
        }
        Ok(())
    }
}
