//! The merge pipeline: one video plus ordered clips in, one MP4 out.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::create_merge_pipeline;
use super::errors::{PipelineError, PipelineResult};
use super::handle::JobHandle;
use super::phase::{JobPhase, JobTicket, PhaseCell};
use super::progress::{ProgressCallback, ProgressTracker};
use super::types::{Context, JobState};
use crate::config::Settings;
use crate::engine::EngineHandle;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{
    Job, JobId, MediaBuffer, MediaKind, Stage, OUTPUT_CONTENT_TYPE, OUTPUT_FILE_NAME,
};
use crate::store::{ArtifactKey, ArtifactStore, StoreError};

/// Runs merge jobs against one engine, one job at a time.
///
/// A job either returns exactly one output buffer or exactly one error.
/// Every intermediate artifact lives in a per-job scratch store that is
/// removed before the result is returned, on success and failure alike.
pub struct MergePipeline {
    engine: EngineHandle,
    settings: Settings,
    phase: PhaseCell,
}

impl MergePipeline {
    pub fn new(engine: EngineHandle, settings: Settings) -> Self {
        Self {
            engine,
            settings,
            phase: PhaseCell::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> JobPhase {
        self.phase.get()
    }

    /// Run a job to completion on the calling thread.
    ///
    /// Returns `Busy` immediately if another job is running.
    pub fn run(
        &self,
        video: MediaBuffer,
        clips: Vec<MediaBuffer>,
        on_progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBuffer> {
        let job = Job::new(video, clips);
        let ticket = self.admit(&job)?;
        self.execute_job(ticket, job, on_progress)
    }

    /// Start a job on the runtime's blocking pool.
    ///
    /// Must be called from within a Tokio runtime. Rejection (`Busy`,
    /// `InvalidJob`) is reported here, before any work is scheduled.
    pub fn submit(
        self: &Arc<Self>,
        video: MediaBuffer,
        clips: Vec<MediaBuffer>,
    ) -> PipelineResult<JobHandle> {
        let job = Job::new(video, clips);
        let job_id = job.id();

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            PipelineError::setup_failed(job_id, format!("no async runtime: {}", e))
        })?;
        let ticket = self.admit(&job)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let on_progress: ProgressCallback = Box::new(move |report| {
            // Receiver may be gone if the caller stopped listening
            let _ = tx.send(report);
        });

        let pipeline = Arc::clone(self);
        let task = runtime
            .spawn_blocking(move || pipeline.execute_job(ticket, job, Some(on_progress)));

        Ok(JobHandle::new(job_id, rx, task))
    }

    /// Claim the pipeline and check the job's preconditions.
    fn admit(&self, job: &Job) -> PipelineResult<JobTicket> {
        let ticket = JobTicket::claim(&self.phase, job.id())
            .map_err(|active| PipelineError::Busy { active })?;

        if let Err(message) = job.validate() {
            tracing::warn!("[{}] rejected: {}", job.id(), message);
            ticket.finish(JobPhase::Failed);
            return Err(PipelineError::invalid_job(job.id(), message));
        }

        Ok(ticket)
    }

    fn execute_job(
        &self,
        ticket: JobTicket,
        job: Job,
        on_progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBuffer> {
        let logger = self.create_logger(job.id());
        logger.info(&format!(
            "Merging '{}' with {} clip(s) using {}",
            job.video().name(),
            job.clip_count(),
            self.engine.name()
        ));

        match self.stage_and_run(&ticket, &job, &logger, on_progress) {
            Ok(output) => {
                logger.success(&format!("Output ready ({} bytes)", output.len()));
                ticket.finish(JobPhase::Done);
                Ok(output)
            }
            Err(e) => {
                logger.error(&e.to_string());
                logger.show_tail("engine");
                ticket.finish(JobPhase::Failed);
                Err(e)
            }
        }
    }

    fn stage_and_run(
        &self,
        ticket: &JobTicket,
        job: &Job,
        logger: &Arc<JobLogger>,
        on_progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBuffer> {
        let job_id = job.id();
        let setup_failed = |e: StoreError| PipelineError::setup_failed(job_id, e.to_string());

        let store = ArtifactStore::create(&self.settings.paths.temp_root, job_id)
            .map_err(setup_failed)?;
        let mut state = JobState::new(job_id, store);

        let clips: Vec<&[u8]> = job.clips().iter().map(MediaBuffer::bytes).collect();
        state
            .stage_inputs(job.video().bytes(), &clips)
            .map_err(setup_failed)?;
        logger.debug(&format!("Staged inputs in {}", state.store.root().display()));

        let progress = ProgressTracker::new(on_progress).with_logger(Arc::clone(logger));
        let ctx = Context::new(
            job_id,
            self.settings.clone(),
            Arc::clone(logger),
            self.engine.clone(),
            progress,
        )
        .with_names(
            job.video().name(),
            job.clips().iter().map(|c| c.name().to_string()).collect(),
        )
        .with_phase_cell(ticket.cell().clone());

        let run = create_merge_pipeline().run(&ctx, &mut state)?;
        let stages: Vec<&str> = run.stages_completed.iter().map(Stage::name).collect();
        logger.debug(&format!("Completed stages: {}", stages.join(" -> ")));

        let key = state.output.clone().unwrap_or_else(ArtifactKey::final_output);
        let bytes = state
            .store
            .get(&key)
            .map_err(|e| PipelineError::step_failed(job_id, Stage::Mux, e.into()))?;

        // Scratch space goes away before completion is reported
        drop(state);
        ctx.complete_progress();

        Ok(MediaBuffer::new(MediaKind::Video, OUTPUT_FILE_NAME, bytes)
            .with_content_type(OUTPUT_CONTENT_TYPE))
    }

    fn create_logger(&self, job_id: JobId) -> Arc<JobLogger> {
        let config = LogConfig::from(&self.settings.logging);
        match JobLogger::new(job_id, &self.settings.paths.logs_folder, config.clone(), None) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                tracing::warn!(
                    "[{}] cannot open log file in '{}': {}; logging to tracing only",
                    job_id,
                    self.settings.paths.logs_folder,
                    e
                );
                Arc::new(JobLogger::detached(job_id, config, None))
            }
        }
    }
}
