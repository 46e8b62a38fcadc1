//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Declared kind of a media buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Coarse stage label attached to every progress report.
///
/// Each stage owns a fixed slice of the overall 0-100 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Per-clip conversion to canonical PCM.
    Normalize,
    /// Stream-copy concatenation of normalized clips.
    Concat,
    /// Final video + audio mux.
    Mux,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Normalize, Stage::Concat, Stage::Mux];

    /// Display name used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Normalize => "Normalize",
            Stage::Concat => "Concat",
            Stage::Mux => "Mux",
        }
    }

    /// Slice of the overall progress range reserved for this stage.
    ///
    /// Returns `(start, end)` in percent. The slices are contiguous and
    /// together cover 0..=100.
    pub fn progress_range(&self) -> (u8, u8) {
        match self {
            Stage::Normalize => (0, 60),
            Stage::Concat => (60, 75),
            Stage::Mux => (75, 100),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
