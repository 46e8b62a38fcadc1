//! Transcoding engine abstraction.
//!
//! The engine is the single execution resource that performs every
//! normalize, concat and mux operation. It is modelled as an explicit
//! [`EngineHandle`] passed into the pipeline rather than global state; the
//! handle serializes operations so only one runs at a time.
//!
//! # Architecture
//!
//! ```text
//! EngineHandle (one-at-a-time gate)
//!     └── dyn MediaEngine
//!             ├── FfmpegEngine   (ffmpeg + ffprobe subprocesses)
//!             └── test doubles
//! ```

mod command;
mod ffmpeg;
mod handle;
mod probe;

#[cfg(test)]
pub(crate) mod scripted;

use std::io;
use std::path::Path;

use thiserror::Error;

pub use command::{EngineCommand, InvocationTag};
pub use ffmpeg::FfmpegEngine;
pub use handle::EngineHandle;
pub use probe::{parse_ffprobe_json, MediaInfo, StreamInfo, StreamKind};

/// Errors reported by an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine binary could not be started.
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The engine ran and reported an error status.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    Failed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The engine's output could not be understood.
    #[error("Failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },

    /// I/O error while talking to the engine process.
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Create a failed-status error.
    pub fn failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A media engine capable of inspecting and transforming files.
///
/// Implementations do not need to be internally synchronized against
/// concurrent calls: [`EngineHandle`] never issues two operations at once.
pub trait MediaEngine: Send + Sync {
    /// Engine name (for logging).
    fn name(&self) -> &str;

    /// Inspect a media file and report its streams.
    fn probe(&self, path: &Path) -> EngineResult<MediaInfo>;

    /// Run one transcoding operation to completion.
    ///
    /// `on_progress` receives the completed fraction (0.0..=1.0) of this
    /// operation whenever the engine reports it.
    fn execute(&self, command: &EngineCommand, on_progress: &mut dyn FnMut(f64))
        -> EngineResult<()>;
}
