//! In-process engine double for tests.
//!
//! Media files are small JSON documents describing their streams. The
//! scripted engine "transcodes" them by rewriting those descriptions the
//! way ffmpeg would change the real streams, which lets orchestrator tests
//! check ordering, durations and failure handling without ffmpeg.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::command::EngineCommand;
use super::probe::{MediaInfo, StreamInfo, StreamKind};
use super::{EngineError, EngineResult, MediaEngine};
use crate::models::Stage;

/// Fake audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FakeAudio {
    pub secs: f64,
    pub channels: u32,
    pub sample_rate: u32,
    pub codec: String,
    /// Labels of the source clips this audio is made of, in order.
    pub segments: Vec<String>,
}

/// Fake container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FakeMedia {
    pub format: String,
    #[serde(default)]
    pub video_secs: Option<f64>,
    #[serde(default)]
    pub audio: Option<FakeAudio>,
}

impl FakeMedia {
    /// A video-only file.
    pub fn video(secs: f64) -> Self {
        Self {
            format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            video_secs: Some(secs),
            audio: None,
        }
    }

    /// A compressed mono 48 kHz clip.
    pub fn clip(label: &str, secs: f64) -> Self {
        Self {
            format: "mp3".to_string(),
            video_secs: None,
            audio: Some(FakeAudio {
                secs,
                channels: 1,
                sample_rate: 48_000,
                codec: "mp3".to_string(),
                segments: vec![label.to_string()],
            }),
        }
    }

    /// A clip that is already canonical PCM WAV.
    pub fn canonical_wav(label: &str, secs: f64) -> Self {
        Self {
            format: "wav".to_string(),
            video_secs: None,
            audio: Some(FakeAudio {
                secs,
                channels: 2,
                sample_rate: 44_100,
                codec: "pcm_s16le".to_string(),
                segments: vec![label.to_string()],
            }),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("fake media serializes")
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    fn read(path: &str) -> EngineResult<Self> {
        let bytes = fs::read(path).map_err(|e| EngineError::io(format!("reading {}", path), e))?;
        Self::from_bytes(&bytes)
            .ok_or_else(|| EngineError::failed("scripted", 1, format!("{}: Invalid data", path)))
    }

    fn to_media_info(&self) -> MediaInfo {
        let mut streams = Vec::new();
        if let Some(secs) = self.video_secs {
            streams.push(StreamInfo {
                index: streams.len(),
                kind: StreamKind::Video,
                codec_name: "h264".to_string(),
                channels: None,
                sample_rate: None,
                duration_secs: Some(secs),
            });
        }
        if let Some(ref audio) = self.audio {
            streams.push(StreamInfo {
                index: streams.len(),
                kind: StreamKind::Audio,
                codec_name: audio.codec.clone(),
                channels: Some(audio.channels),
                sample_rate: Some(audio.sample_rate),
                duration_secs: Some(audio.secs),
            });
        }
        let duration = streams
            .iter()
            .filter_map(|s| s.duration_secs)
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
        MediaInfo {
            format_name: self.format.clone(),
            duration_secs: duration,
            streams,
        }
    }
}

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordedCall {
    Probe(String),
    Execute { stage: Stage, args: Vec<String> },
}

/// Shared view of the calls an engine received.
pub(crate) type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

/// Scripted engine with optional failure injection.
pub(crate) struct ScriptedEngine {
    calls: CallLog,
    fail_stage: Option<Stage>,
    silent_stage: Option<Stage>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                fail_stage: None,
                silent_stage: None,
            },
            calls,
        )
    }

    /// Report a non-zero exit for every command of `stage`.
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    /// Report success for `stage` without writing any output.
    pub fn silent_at(mut self, stage: Stage) -> Self {
        self.silent_stage = Some(stage);
        self
    }

    fn normalize(command: &EngineCommand) -> EngineResult<FakeMedia> {
        let input = first_input(command)?;
        let mut media = FakeMedia::read(input)?;
        let mut audio = media
            .audio
            .take()
            .ok_or_else(|| EngineError::failed("scripted", 1, "no audio to decode"))?;
        audio.channels = opt_value(command, "-ac").unwrap_or(audio.channels);
        audio.sample_rate = opt_value(command, "-ar").unwrap_or(audio.sample_rate);
        audio.codec = opt_str(command, "-c:a").unwrap_or("pcm_s16le").to_string();
        Ok(FakeMedia {
            format: "wav".to_string(),
            video_secs: None,
            audio: Some(audio),
        })
    }

    fn concat(command: &EngineCommand) -> EngineResult<FakeMedia> {
        let list = fs::read_to_string(first_input(command)?)
            .map_err(|e| EngineError::io("reading concat list", e))?;

        let mut merged: Option<FakeAudio> = None;
        for line in list.lines().filter(|l| !l.trim().is_empty()) {
            let path = line
                .trim()
                .strip_prefix("file '")
                .and_then(|rest| rest.strip_suffix('\''))
                .ok_or_else(|| EngineError::parse("scripted", format!("bad list line: {}", line)))?
                .replace("'\\''", "'");
            let audio = FakeMedia::read(&path)?
                .audio
                .ok_or_else(|| EngineError::failed("scripted", 1, "entry has no audio"))?;
            merged = Some(match merged {
                None => audio,
                Some(mut acc) => {
                    acc.secs += audio.secs;
                    acc.segments.extend(audio.segments);
                    acc
                }
            });
        }

        Ok(FakeMedia {
            format: "wav".to_string(),
            video_secs: None,
            audio: merged,
        })
    }

    fn mux(command: &EngineCommand) -> EngineResult<FakeMedia> {
        let inputs = command.inputs();
        if inputs.len() != 2 {
            return Err(EngineError::failed("scripted", 1, "mux expects two inputs"));
        }
        let video = FakeMedia::read(inputs[0])?;
        let mut audio = FakeMedia::read(inputs[1])?
            .audio
            .ok_or_else(|| EngineError::failed("scripted", 1, "no audio stream"))?;
        let video_secs = video
            .video_secs
            .ok_or_else(|| EngineError::failed("scripted", 1, "no video stream"))?;

        let end = if command.has_arg("-shortest") {
            video_secs.min(audio.secs)
        } else {
            video_secs.max(audio.secs)
        };
        audio.secs = audio.secs.min(end);
        audio.codec = opt_str(command, "-c:a").unwrap_or("aac").to_string();

        Ok(FakeMedia {
            format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            video_secs: Some(video_secs.min(end)),
            audio: Some(audio),
        })
    }
}

impl MediaEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn probe(&self, path: &Path) -> EngineResult<MediaInfo> {
        let path_str = path.to_string_lossy().to_string();
        self.calls.lock().push(RecordedCall::Probe(path_str.clone()));
        Ok(FakeMedia::read(&path_str)?.to_media_info())
    }

    fn execute(
        &self,
        command: &EngineCommand,
        on_progress: &mut dyn FnMut(f64),
    ) -> EngineResult<()> {
        let stage = command.tag.stage;
        self.calls.lock().push(RecordedCall::Execute {
            stage,
            args: command.args.clone(),
        });

        if self.fail_stage == Some(stage) {
            return Err(EngineError::failed("scripted", 1, "injected failure"));
        }

        on_progress(0.5);
        if self.silent_stage == Some(stage) {
            on_progress(1.0);
            return Ok(());
        }

        let output = match stage {
            Stage::Normalize => Self::normalize(command)?,
            Stage::Concat => Self::concat(command)?,
            Stage::Mux => Self::mux(command)?,
        };
        fs::write(&command.output, output.to_bytes())
            .map_err(|e| EngineError::io("writing scripted output", e))?;

        on_progress(1.0);
        Ok(())
    }
}

fn first_input(command: &EngineCommand) -> EngineResult<&str> {
    command
        .inputs()
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::failed("scripted", 1, "no input"))
}

fn opt_str<'a>(command: &'a EngineCommand, flag: &str) -> Option<&'a str> {
    command
        .args
        .windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
}

fn opt_value(command: &EngineCommand, flag: &str) -> Option<u32> {
    opt_str(command, flag).and_then(|v| v.parse().ok())
}
