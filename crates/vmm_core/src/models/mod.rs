//! Data models for Video Music Merger.
//!
//! This module contains the core data structures shared across the pipeline:
//! - Media buffers handed in by the caller and handed back as output
//! - Job definitions (one video, ordered clips)
//! - Progress reports and stage labels

mod enums;
mod job;
mod media;

// Re-export all public types
pub use enums::{MediaKind, Stage};
pub use job::{Job, JobId, ProgressReport};
pub use media::{
    MediaBuffer, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, OUTPUT_CONTENT_TYPE, OUTPUT_FILE_NAME,
};
