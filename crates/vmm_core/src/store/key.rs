//! Logical artifact names.

use std::fmt;

/// Logical name of a buffer inside one job's artifact store.
///
/// Keys double as file names inside the store's scratch directory, so any
/// path separator or shell-hostile character is replaced on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Create a key from an arbitrary name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(sanitize_key(name.as_ref()))
    }

    /// Raw uploaded video.
    pub fn video_source() -> Self {
        Self::new("video.src")
    }

    /// Raw uploaded clip at `index` (upload order).
    pub fn clip_source(index: usize) -> Self {
        Self::new(format!("clip.{}.src", index))
    }

    /// Normalized PCM rendition of the clip at `index`.
    pub fn clip_normalized(index: usize) -> Self {
        Self::new(format!("clip.{}.norm", index))
    }

    /// Concat-demuxer list file rendered from the manifest.
    pub fn concat_list() -> Self {
        Self::new("audio.concat.list")
    }

    /// Concatenated audio track.
    pub fn concat_audio() -> Self {
        Self::new("audio.concat")
    }

    /// Final muxed container.
    pub fn final_output() -> Self {
        Self::new("output.final")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used for this key inside the scratch directory.
    pub fn file_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_key(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() => '_',
            _ => c,
        })
        .collect();

    // "." and ".." would escape or alias the scratch directory
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}
