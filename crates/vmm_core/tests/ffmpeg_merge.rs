//! End-to-end merges against the real ffmpeg.
//!
//! Media is synthesized with lavfi. These tests need ffmpeg and ffprobe
//! on PATH, so they are ignored by default:
//!
//! ```text
//! cargo test -p vmm_core --test ffmpeg_merge -- --ignored
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::{tempdir, TempDir};

use vmm_core::config::Settings;
use vmm_core::engine::{EngineHandle, FfmpegEngine, MediaEngine};
use vmm_core::models::{MediaBuffer, MediaKind};
use vmm_core::orchestrator::{ErrorKind, MergePipeline};

fn require_ffmpeg() {
    if let Err(e) = FfmpegEngine::new().check_available() {
        panic!("ffmpeg is required for this test: {}", e);
    }
}

fn generate(dir: &Path, name: &str, args: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(args)
        .arg(&path)
        .stdout(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success(), "failed to generate {}", name);
    path
}

/// Video-only MPEG-4 test pattern.
fn test_video(dir: &Path, secs: u32) -> PathBuf {
    generate(
        dir,
        "video.mp4",
        &[
            "-f",
            "lavfi",
            "-i",
            &format!("testsrc=duration={}:size=160x120:rate=10", secs),
            "-c:v",
            "mpeg4",
        ],
    )
}

/// Sine tone clip with the given layout.
fn test_clip(dir: &Path, name: &str, secs: f64, channels: u32, rate: u32) -> PathBuf {
    generate(
        dir,
        name,
        &[
            "-f",
            "lavfi",
            "-i",
            &format!("sine=frequency=440:sample_rate={}:duration={}", rate, secs),
            "-ac",
            &channels.to_string(),
        ],
    )
}

fn pipeline(work: &TempDir) -> MergePipeline {
    let mut settings = Settings::default();
    settings.paths.temp_root = work.path().join("temp").to_string_lossy().to_string();
    settings.paths.logs_folder = work.path().join("logs").to_string_lossy().to_string();
    MergePipeline::new(EngineHandle::new(FfmpegEngine::new()), settings)
}

fn load(path: &Path, kind: MediaKind) -> MediaBuffer {
    MediaBuffer::from_file(path, kind).unwrap()
}

fn assert_near(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 0.3,
        "{} lasted {}s, expected about {}s",
        what,
        actual,
        expected
    );
}

/// Per-packet MD5 of the first video stream, without decoding.
fn video_packet_hashes(path: &Path) -> Vec<String> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(path)
        .args(["-map", "0:v:0", "-c", "copy", "-f", "framemd5", "-"])
        .stderr(Stdio::null())
        .output()
        .unwrap();
    assert!(output.status.success(), "framemd5 failed for {}", path.display());

    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .filter_map(|line| line.rsplit(',').next())
        .map(|hash| hash.trim().to_string())
        .collect()
}

#[test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
fn merges_clips_of_different_layouts() {
    require_ffmpeg();
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();

    let video = test_video(inputs.path(), 4);
    let mono = test_clip(inputs.path(), "mono.wav", 1.5, 1, 22_050);
    let stereo = test_clip(inputs.path(), "stereo.m4a", 1.0, 2, 48_000);

    let output = pipeline(&work)
        .run(
            load(&video, MediaKind::Video),
            vec![load(&mono, MediaKind::Audio), load(&stereo, MediaKind::Audio)],
            None,
        )
        .unwrap();
    assert_eq!(output.content_type(), Some("video/mp4"));

    let out_path = inputs.path().join("final-video.mp4");
    std::fs::write(&out_path, output.bytes()).unwrap();
    let info = FfmpegEngine::new().probe(&out_path).unwrap();

    let video_stream = info.first_video().unwrap();
    assert_eq!(video_stream.codec_name, "mpeg4");
    let audio_stream = info.first_audio().unwrap();
    assert_eq!(audio_stream.codec_name, "aac");
    assert_eq!(audio_stream.channels, Some(2));
    assert_eq!(audio_stream.sample_rate, Some(44_100));

    // 1.5s + 1.0s of audio against 4s of video
    assert_near(audio_stream.duration_secs.unwrap(), 2.5, "audio");
    assert_near(video_stream.duration_secs.unwrap(), 2.5, "video");
    assert_near(info.duration().unwrap(), 2.5, "output");

    let source = video_packet_hashes(&video);
    let merged = video_packet_hashes(&out_path);
    assert!(!merged.is_empty());
    assert!(merged.len() < source.len());
    assert_eq!(merged[..], source[..merged.len()]);

    assert_eq!(std::fs::read_dir(work.path().join("temp")).unwrap().count(), 0);
}

#[test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
fn output_is_cut_to_the_video() {
    require_ffmpeg();
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();

    let video = test_video(inputs.path(), 2);
    let long = test_clip(inputs.path(), "long.wav", 5.0, 2, 44_100);

    let output = pipeline(&work)
        .run(
            load(&video, MediaKind::Video),
            vec![load(&long, MediaKind::Audio)],
            None,
        )
        .unwrap();

    let out_path = inputs.path().join("final-video.mp4");
    std::fs::write(&out_path, output.bytes()).unwrap();
    let info = FfmpegEngine::new().probe(&out_path).unwrap();

    assert_near(info.duration().unwrap(), 2.0, "output");
    assert_near(info.first_video().unwrap().duration_secs.unwrap(), 2.0, "video");
    assert_near(info.first_audio().unwrap().duration_secs.unwrap(), 2.0, "audio");

    let source = video_packet_hashes(&video);
    let merged = video_packet_hashes(&out_path);
    assert!(merged.len() + 1 >= source.len(), "{} of {} frames kept", merged.len(), source.len());
    assert_eq!(merged[..], source[..merged.len()]);
}

#[test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
fn same_inputs_give_identical_output() {
    require_ffmpeg();
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();

    let video = test_video(inputs.path(), 2);
    let clip = test_clip(inputs.path(), "clip.wav", 1.0, 1, 32_000);
    let pipeline = pipeline(&work);

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let output = pipeline
            .run(
                load(&video, MediaKind::Video),
                vec![load(&clip, MediaKind::Audio)],
                None,
            )
            .unwrap();
        outputs.push(output.bytes().to_vec());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
fn non_media_clip_is_unsupported() {
    require_ffmpeg();
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();

    let video = test_video(inputs.path(), 1);
    let notes = MediaBuffer::new(MediaKind::Audio, "notes.txt", b"just some text".to_vec());

    let err = pipeline(&work)
        .run(load(&video, MediaKind::Video), vec![notes], None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedMedia);
    assert_eq!(std::fs::read_dir(work.path().join("temp")).unwrap().count(), 0);
}

#[test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
fn audio_file_as_video_has_no_video_stream() {
    require_ffmpeg();
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();

    let fake_video = test_clip(inputs.path(), "song.wav", 2.0, 2, 44_100);
    let clip = test_clip(inputs.path(), "clip.wav", 1.0, 2, 44_100);

    let err = pipeline(&work)
        .run(
            load(&fake_video, MediaKind::Video),
            vec![load(&clip, MediaKind::Audio)],
            None,
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoVideoStream);
}
