//! Error types for the merge pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Stage → Operation → Detail
//!
//! Every failure that reaches the caller is classified by exactly one
//! [`ErrorKind`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineError;
use crate::models::{JobId, Stage};
use crate::store::StoreError;

/// Classification of a failed (or rejected) job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing video, zero clips, or mis-declared inputs.
    InvalidJob,
    /// A clip or the video could not be decoded.
    UnsupportedMedia,
    /// Normalized clips disagree on channel count or sample rate.
    FormatMismatch,
    /// Concatenation was asked to join nothing.
    EmptyManifest,
    /// The video input has no video stream.
    NoVideoStream,
    /// The audio input to the mux has no audio stream.
    NoAudioStream,
    /// The engine failed for a reason not covered above.
    EngineFailure,
    /// The caller's deadline expired.
    Timeout,
    /// The pipeline was already running a job; nothing was started.
    Busy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidJob => "InvalidJob",
            ErrorKind::UnsupportedMedia => "UnsupportedMedia",
            ErrorKind::FormatMismatch => "FormatMismatch",
            ErrorKind::EmptyManifest => "EmptyManifest",
            ErrorKind::NoVideoStream => "NoVideoStream",
            ErrorKind::NoAudioStream => "NoAudioStream",
            ErrorKind::EngineFailure => "EngineFailure",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Busy => "Busy",
        };
        f.write_str(name)
    }
}

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Preconditions failed before any engine work.
    #[error("Job '{job_id}' is invalid: {message}")]
    InvalidJob { job_id: JobId, message: String },

    /// Another job is still running on this pipeline.
    #[error("Pipeline is busy with job '{active}'")]
    Busy { active: JobId },

    /// A stage failed during execution.
    #[error("Job '{job_id}' failed at stage '{stage}': {source}")]
    StepFailed {
        job_id: JobId,
        stage: Stage,
        #[source]
        source: StepError,
    },

    /// Failed to set up the job (scratch store, staging inputs).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: JobId, message: String },

    /// The job did not finish within the caller's deadline.
    #[error("Job '{job_id}' timed out after {after:?}")]
    Timeout { job_id: JobId, after: Duration },

    /// The worker running the job terminated abnormally.
    #[error("Job '{job_id}' aborted: {message}")]
    Aborted { job_id: JobId, message: String },
}

impl PipelineError {
    /// Create an invalid-job error.
    pub fn invalid_job(job_id: JobId, message: impl Into<String>) -> Self {
        Self::InvalidJob {
            job_id,
            message: message.into(),
        }
    }

    /// Create a step failed error.
    pub fn step_failed(job_id: JobId, stage: Stage, source: StepError) -> Self {
        Self::StepFailed {
            job_id,
            stage,
            source,
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(job_id: JobId, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id,
            message: message.into(),
        }
    }

    /// The single classification surfaced to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidJob { .. } => ErrorKind::InvalidJob,
            PipelineError::Busy { .. } => ErrorKind::Busy,
            PipelineError::StepFailed { source, .. } => source.kind(),
            PipelineError::SetupFailed { .. } | PipelineError::Aborted { .. } => {
                ErrorKind::EngineFailure
            }
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Stage that failed, if the failure happened inside one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StepFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Error from a pipeline stage with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// An input could not be decoded as the expected media.
    #[error("Unsupported media '{name}': {message}")]
    UnsupportedMedia { name: String, message: String },

    /// Manifest entries disagree on audio layout.
    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    /// Nothing to concatenate.
    #[error("Concatenation manifest is empty")]
    EmptyManifest,

    #[error("No video stream in '{0}'")]
    NoVideoStream(String),

    #[error("No audio stream in '{0}'")]
    NoAudioStream(String),

    /// The engine failed while performing an operation.
    #[error("Engine failed while {operation}: {source}")]
    Engine {
        operation: String,
        #[source]
        source: EngineError,
    },

    /// Scratch storage failed or an artifact was missing.
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    /// A stage finished without producing what it promised.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),
}

impl StepError {
    /// Create an unsupported media error.
    pub fn unsupported(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedMedia {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wrap an engine error with the operation that was running.
    pub fn engine(operation: impl Into<String>, source: EngineError) -> Self {
        Self::Engine {
            operation: operation.into(),
            source,
        }
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::UnsupportedMedia { .. } => ErrorKind::UnsupportedMedia,
            StepError::FormatMismatch(_) => ErrorKind::FormatMismatch,
            StepError::EmptyManifest => ErrorKind::EmptyManifest,
            StepError::NoVideoStream(_) => ErrorKind::NoVideoStream,
            StepError::NoAudioStream(_) => ErrorKind::NoAudioStream,
            StepError::Engine { .. } | StepError::Store(_) | StepError::InvalidOutput(_) => {
                ErrorKind::EngineFailure
            }
        }
    }
}

impl From<EngineError> for StepError {
    fn from(source: EngineError) -> Self {
        Self::engine("running the engine", source)
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
