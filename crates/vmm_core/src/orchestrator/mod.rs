//! Pipeline orchestrator for merge jobs.
//!
//! A job runs as a fixed sequence of steps that each validate, execute,
//! and record their results in the job's state:
//!
//! ```text
//! MergePipeline (one active job, phase tracking)
//!     └── Pipeline
//!             ├── Step: Normalize   clips → 16-bit stereo 44.1 kHz WAV
//!             ├── Step: Concat      manifest → one track (stream copy)
//!             └── Step: Mux         video (copy) + track → MP4
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vmm_core::config::Settings;
//! use vmm_core::engine::{EngineHandle, FfmpegEngine};
//! use vmm_core::models::{MediaBuffer, MediaKind};
//! use vmm_core::orchestrator::MergePipeline;
//!
//! let engine = EngineHandle::new(FfmpegEngine::new());
//! let pipeline = MergePipeline::new(engine, Settings::default());
//!
//! let video = MediaBuffer::new(MediaKind::Video, "video.mp4", std::fs::read("video.mp4")?);
//! let song = MediaBuffer::new(MediaKind::Audio, "song.mp3", std::fs::read("song.mp3")?);
//!
//! let output = pipeline.run(video, vec![song], None)?;
//! std::fs::write(output.name(), output.bytes())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod errors;
mod handle;
mod merge;
mod phase;
mod pipeline;
mod progress;
mod step;
pub mod steps;
mod types;

pub use errors::{ErrorKind, PipelineError, PipelineResult, StepError, StepResult};
pub use handle::JobHandle;
pub use merge::MergePipeline;
pub use phase::JobPhase;
pub use pipeline::{Pipeline, PipelineRunResult};
pub use progress::{overall_percent, ProgressCallback, ProgressTracker};
pub use step::PipelineStep;
pub use steps::{ConcatStep, MuxStep, NormalizeStep};
pub use types::{Context, JobState, Manifest};

/// Create the merge pipeline with all steps in order.
///
/// 1. Normalize - convert each clip to the canonical WAV layout
/// 2. Concat - join the normalized clips in upload order
/// 3. Mux - pair the concatenated track with the video stream
pub fn create_merge_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(NormalizeStep::new())
        .with_step(ConcatStep::new())
        .with_step(MuxStep::new())
}
