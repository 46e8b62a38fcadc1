//! Media buffers exchanged with the caller.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::enums::MediaKind;

/// Channel count every clip is normalized to.
pub const CANONICAL_CHANNELS: u32 = 2;

/// Sample rate every clip is normalized to.
pub const CANONICAL_SAMPLE_RATE: u32 = 44_100;

/// Content type of the merged output container.
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// Suggested file name for the merged output.
pub const OUTPUT_FILE_NAME: &str = "final-video.mp4";

/// An immutable byte sequence with a declared media kind.
///
/// Cloning is cheap: the bytes are shared, never copied.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBuffer {
    kind: MediaKind,
    name: String,
    content_type: Option<String>,
    data: Arc<[u8]>,
}

impl MediaBuffer {
    /// Create a buffer from raw bytes.
    pub fn new(kind: MediaKind, name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            kind,
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    /// Set the content-type hint.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk into a buffer, using the file name as the name hint.
    pub fn from_file(path: &Path, kind: MediaKind) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(kind, name, data))
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Original filename hint.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for MediaBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBuffer")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}
