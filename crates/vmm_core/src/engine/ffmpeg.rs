//! FFmpeg-backed engine.
//!
//! Runs `ffmpeg` for transcoding and `ffprobe` for inspection as
//! subprocesses. Progress is read from ffmpeg's `-progress pipe:1` key/value
//! stream and converted to a fraction of the command's expected duration.

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use serde_json::Value;

use super::command::EngineCommand;
use super::probe::{parse_ffprobe_json, MediaInfo};
use super::{EngineError, EngineResult, MediaEngine};

/// Flags prepended to every ffmpeg invocation.
const GLOBAL_FLAGS: &[&str] = &[
    "-hide_banner",
    "-nostdin",
    "-y",
    "-loglevel",
    "error",
    "-nostats",
    "-progress",
    "pipe:1",
];

/// Engine backed by the ffmpeg and ffprobe executables.
pub struct FfmpegEngine {
    /// Path to ffmpeg executable (None = find in PATH).
    ffmpeg_path: Option<PathBuf>,
    /// Path to ffprobe executable (None = find in PATH).
    ffprobe_path: Option<PathBuf>,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }

    /// Set a custom path to the ffmpeg executable.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Set a custom path to the ffprobe executable.
    pub fn with_ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = Some(path.into());
        self
    }

    /// Build an engine from configured paths; empty strings mean "use PATH".
    pub fn from_paths(ffmpeg: &str, ffprobe: &str) -> Self {
        let mut engine = Self::new();
        if !ffmpeg.trim().is_empty() {
            engine = engine.with_ffmpeg_path(ffmpeg.trim());
        }
        if !ffprobe.trim().is_empty() {
            engine = engine.with_ffprobe_path(ffprobe.trim());
        }
        engine
    }

    fn ffmpeg_cmd(&self) -> &str {
        self.ffmpeg_path
            .as_ref()
            .map(|p| p.to_str().unwrap_or("ffmpeg"))
            .unwrap_or("ffmpeg")
    }

    fn ffprobe_cmd(&self) -> &str {
        self.ffprobe_path
            .as_ref()
            .map(|p| p.to_str().unwrap_or("ffprobe"))
            .unwrap_or("ffprobe")
    }

    /// Check that both executables can be launched.
    pub fn check_available(&self) -> EngineResult<()> {
        for tool in [self.ffmpeg_cmd(), self.ffprobe_cmd()] {
            let status = Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(|e| EngineError::Spawn {
                    tool: tool.to_string(),
                    source: e,
                })?;
            if !status.success() {
                return Err(EngineError::failed(
                    tool,
                    status.code().unwrap_or(-1),
                    "-version check failed",
                ));
            }
        }
        Ok(())
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn probe(&self, path: &Path) -> EngineResult<MediaInfo> {
        let ffprobe = self.ffprobe_cmd();

        let output = Command::new(ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg(
                "format=format_name,duration:\
                 stream=index,codec_type,codec_name,channels,sample_rate,duration:\
                 stream_disposition=attached_pic",
            )
            .arg("-of")
            .arg("json")
            .arg(path)
            .output()
            .map_err(|e| EngineError::Spawn {
                tool: ffprobe.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(EngineError::failed(
                ffprobe,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::parse(ffprobe, e.to_string()))?;

        parse_ffprobe_json(&json)
    }

    fn execute(
        &self,
        command: &EngineCommand,
        on_progress: &mut dyn FnMut(f64),
    ) -> EngineResult<()> {
        let ffmpeg = self.ffmpeg_cmd();

        let mut cmd = Command::new(ffmpeg);
        cmd.args(GLOBAL_FLAGS)
            .args(&command.args)
            .arg(&command.output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!("Running FFmpeg [{}]: {:?}", command.tag, cmd);

        let mut child = cmd.spawn().map_err(|e| EngineError::Spawn {
            tool: ffmpeg.to_string(),
            source: e,
        })?;

        // Drain stderr on its own thread so a chatty failure cannot block
        // the progress reader on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let progress = match child.stdout.take() {
            Some(stdout) => {
                read_progress(BufReader::new(stdout), command.expected_duration, on_progress)
                    .map_err(|e| EngineError::io("reading ffmpeg progress", e))
            }
            None => Err(EngineError::parse(ffmpeg, "failed to capture progress pipe")),
        };
        if let Err(e) = progress {
            reap(&mut child);
            if let Some(handle) = stderr_reader {
                let _ = handle.join();
            }
            return Err(e);
        }

        let status = child
            .wait()
            .map_err(|e| EngineError::io("waiting for ffmpeg", e))?;

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(EngineError::failed(
                ffmpeg,
                status.code().unwrap_or(-1),
                stderr.trim().to_string(),
            ));
        }

        if !stderr.trim().is_empty() {
            tracing::debug!("FFmpeg [{}] stderr: {}", command.tag, stderr.trim());
        }

        Ok(())
    }
}

/// Feed every `-progress` line from `reader` to `on_progress`.
fn read_progress(
    reader: impl BufRead,
    expected_duration: Option<f64>,
    on_progress: &mut dyn FnMut(f64),
) -> io::Result<()> {
    for line in reader.lines() {
        if let Some(fraction) = progress_fraction(&line?, expected_duration) {
            on_progress(fraction);
        }
    }
    Ok(())
}

/// Kill a child whose output can no longer be read, and collect its status.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("Failed to kill ffmpeg (pid {}): {}", child.id(), e);
    }
    let _ = child.wait();
}

/// Convert one `-progress` line into a completion fraction.
///
/// `out_time_us` (and the misnamed `out_time_ms`, which is also in
/// microseconds) are scaled by the expected duration; `progress=end` maps
/// to 1.0.
fn progress_fraction(line: &str, expected_duration: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        "out_time_us" | "out_time_ms" => {
            let total = expected_duration?;
            let micros: i64 = value.parse().ok()?;
            if micros < 0 {
                return None;
            }
            Some((micros as f64 / 1_000_000.0 / total).clamp(0.0, 1.0))
        }
        _ => None,
    }
}
