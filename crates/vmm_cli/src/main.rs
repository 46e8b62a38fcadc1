//! Video Music Merger (vmm) - command line entry point
//!
//! Reads one video and any number of audio clips from disk, merges them
//! through the core pipeline and writes the resulting MP4.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use vmm_core::config::ConfigManager;
use vmm_core::engine::{EngineHandle, FfmpegEngine};
use vmm_core::logging::{init_tracing_with_file, LogLevel};
use vmm_core::models::{MediaBuffer, MediaKind, OUTPUT_FILE_NAME};
use vmm_core::orchestrator::{ErrorKind, MergePipeline, PipelineError};

/// Command-line arguments for vmm
#[derive(Parser, Debug)]
#[command(name = "vmm")]
#[command(about = "Replace a video's soundtrack with audio clips played back to back")]
#[command(version)]
struct Args {
    /// Video file whose picture is kept
    #[arg(long, env = "VMM_VIDEO")]
    video: Option<PathBuf>,

    /// Audio clip, repeatable; clips play in the order given
    #[arg(long = "clip", value_name = "FILE")]
    clips: Vec<PathBuf>,

    /// Output file (default: <output_folder>/final-video.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = ".config/vmm.toml", env = "VMM_CONFIG")]
    config: PathBuf,

    /// Give up waiting after this many seconds (overrides job.timeout_secs; 0 = never)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Debug-level logging, including the per-job log (same as logging.debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::kind);
            match kind {
                Some(kind) => eprintln!("Error while processing video. [{}]", kind),
                None => eprintln!("Error while processing video."),
            }
            eprintln!("{:#}", e);
            ExitCode::from(exit_code(kind))
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // Config first: it names the logs directory
    let mut config_manager = ConfigManager::new(&args.config);
    if let Err(e) = config_manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }
    config_manager
        .ensure_dirs_exist()
        .context("Failed to create configured directories")?;

    if args.verbose {
        config_manager.settings_mut().logging.debug = true;
    }
    let settings = config_manager.settings().clone();

    let level = if settings.logging.debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let _log_guard = init_tracing_with_file(level, &config_manager.logs_folder());

    info!("vmm {} starting", vmm_core::version());
    info!("Config: {}", args.config.display());

    let video_path = args
        .video
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Upload video + songs: --video is required"))?;
    let video = MediaBuffer::from_file(video_path, MediaKind::Video)
        .with_context(|| format!("Failed to read video {}", video_path.display()))?;
    let clips = args
        .clips
        .iter()
        .map(|path| {
            MediaBuffer::from_file(path, MediaKind::Audio)
                .with_context(|| format!("Failed to read clip {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let engine =
        FfmpegEngine::from_paths(&settings.engine.ffmpeg_path, &settings.engine.ffprobe_path);
    engine.check_available().context("ffmpeg is not available")?;

    let output_path = args.output.clone().unwrap_or_else(|| {
        Path::new(&settings.paths.output_folder).join(OUTPUT_FILE_NAME)
    });
    let timeout_secs = args.timeout.unwrap_or(settings.job.timeout_secs);

    let pipeline = Arc::new(MergePipeline::new(EngineHandle::new(engine), settings));
    info!(
        "Merging {} with {} clip(s)",
        video_path.display(),
        clips.len()
    );

    let mut handle = pipeline.submit(video, clips)?;
    let printer = handle.take_progress().map(|mut progress| {
        tokio::spawn(async move {
            while let Some(report) = progress.recv().await {
                println!("{:>3}% {}", report.percent, report.stage);
            }
        })
    });

    let result = if timeout_secs > 0 {
        handle
            .wait_timeout(Duration::from_secs(timeout_secs))
            .await
    } else {
        handle.wait().await
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    if let Some(printer) = printer {
        // Channel closes when the job ends
        let _ = printer.await;
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&output_path, output.bytes())
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!(
        "Wrote {} ({} bytes, {})",
        output_path.display(),
        output.len(),
        output.content_type().unwrap_or("application/octet-stream")
    );
    println!("{}", output_path.display());
    Ok(())
}

/// Process exit status for a failure.
fn exit_code(kind: Option<ErrorKind>) -> u8 {
    match kind {
        None => 1,
        Some(ErrorKind::InvalidJob) => 2,
        Some(ErrorKind::UnsupportedMedia)
        | Some(ErrorKind::FormatMismatch)
        | Some(ErrorKind::EmptyManifest)
        | Some(ErrorKind::NoVideoStream)
        | Some(ErrorKind::NoAudioStream) => 3,
        Some(ErrorKind::EngineFailure) => 4,
        Some(ErrorKind::Timeout) => 5,
        Some(ErrorKind::Busy) => 6,
    }
}
