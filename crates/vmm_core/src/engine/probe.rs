//! Stream probing results and ffprobe JSON parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EngineError, EngineResult};

/// Kind of elementary stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

impl StreamKind {
    fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            _ => StreamKind::Other,
        }
    }
}

/// One stream reported by the probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: StreamKind,
    pub codec_name: String,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

/// Container-level probe result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub format_name: String,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    /// First video stream, ignoring attached cover art.
    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == StreamKind::Video)
    }

    pub fn first_audio(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == StreamKind::Audio)
    }

    pub fn has_video(&self) -> bool {
        self.first_video().is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.first_audio().is_some()
    }

    /// Best known duration: container duration, else the longest stream.
    pub fn duration(&self) -> Option<f64> {
        self.duration_secs.or_else(|| {
            self.streams
                .iter()
                .filter_map(|s| s.duration_secs)
                .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))))
        })
    }

    /// Whether the first audio stream is already canonical 16-bit PCM WAV
    /// at the given layout.
    pub fn is_pcm_wav(&self, channels: u32, sample_rate: u32) -> bool {
        let is_wav = self.format_name.split(',').any(|f| f == "wav");
        match self.first_audio() {
            Some(a) => {
                is_wav
                    && self.streams.len() == 1
                    && a.codec_name == "pcm_s16le"
                    && a.channels == Some(channels)
                    && a.sample_rate == Some(sample_rate)
            }
            None => false,
        }
    }
}

/// Parse the JSON printed by
/// `ffprobe -show_entries format=...:stream=... -of json`.
pub fn parse_ffprobe_json(json: &Value) -> EngineResult<MediaInfo> {
    let format = json
        .get("format")
        .ok_or_else(|| EngineError::parse("ffprobe", "missing 'format' section"))?;

    let mut info = MediaInfo {
        format_name: format
            .get("format_name")
            .and_then(|f| f.as_str())
            .unwrap_or("unknown")
            .to_string(),
        duration_secs: format.get("duration").and_then(number_or_string),
        streams: Vec::new(),
    };

    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        for (position, stream) in streams.iter().enumerate() {
            info.streams.push(parse_stream(stream, position));
        }
    }

    Ok(info)
}

fn parse_stream(stream: &Value, position: usize) -> StreamInfo {
    let codec_type = stream
        .get("codec_type")
        .and_then(|c| c.as_str())
        .unwrap_or("");

    // Cover art in audio files shows up as a single-frame video stream
    let attached_pic = stream
        .get("disposition")
        .and_then(|d| d.get("attached_pic"))
        .and_then(|a| a.as_i64())
        .unwrap_or(0)
        == 1;

    let kind = if attached_pic {
        StreamKind::Other
    } else {
        StreamKind::from_codec_type(codec_type)
    };

    StreamInfo {
        index: stream
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position),
        kind,
        codec_name: stream
            .get("codec_name")
            .and_then(|c| c.as_str())
            .unwrap_or("unknown")
            .to_string(),
        channels: stream
            .get("channels")
            .and_then(|c| c.as_u64())
            .map(|c| c as u32),
        sample_rate: stream
            .get("sample_rate")
            .and_then(number_or_string)
            .map(|r| r as u32),
        duration_secs: stream.get("duration").and_then(number_or_string),
    }
}

/// ffprobe prints most numbers as strings ("44100", "3.000000").
fn number_or_string(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
