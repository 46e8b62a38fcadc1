//! Mux step - pairs the uploaded video with the concatenated audio.

use crate::engine::EngineCommand;
use crate::models::Stage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::phase::JobPhase;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::store::{ArtifactKey, StoreError};

/// Mux step.
///
/// The first video stream is stream-copied; the concatenated audio is
/// encoded with the configured codec. Output stops at the shorter of the
/// two streams, and any audio the source video carried is dropped.
pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MuxStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MuxStep {
    fn stage(&self) -> Stage {
        Stage::Mux
    }

    fn description(&self) -> &str {
        "Mux video with the merged soundtrack"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let (video, audio) = input_keys(state);
        for key in [video, audio] {
            if !state.store.contains(&key) {
                return Err(StoreError::NotFound(key).into());
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        ctx.set_phase(JobPhase::Muxing);
        ctx.report_progress(Stage::Mux, 0.0);

        let (video_key, audio_key) = input_keys(state);
        let video_path = state.store.path(&video_key)?.to_path_buf();
        let audio_path = state.store.path(&audio_key)?.to_path_buf();

        let video_info = ctx
            .probe(Stage::Mux, &video_path)
            .map_err(|e| StepError::unsupported(&ctx.video_name, e.to_string()))?;
        if !video_info.has_video() {
            return Err(StepError::NoVideoStream(ctx.video_name.clone()));
        }

        let audio_info = ctx
            .probe(Stage::Mux, &audio_path)
            .map_err(|e| StepError::engine("probing concatenated audio", e))?;
        if !audio_info.has_audio() {
            return Err(StepError::NoAudioStream(audio_key.to_string()));
        }

        let expected = match (video_info.duration(), audio_info.duration()) {
            (Some(v), Some(a)) => Some(v.min(a)),
            (v, a) => v.or(a),
        };

        let mux = &ctx.settings.mux;
        let target = ArtifactKey::final_output();
        let command = EngineCommand::new(ctx.tag(Stage::Mux), state.store.reserve(&target))
            .input(&video_path)
            .input(&audio_path)
            .opt("-map", "0:v:0")
            .opt("-map", "1:a:0")
            .opt("-c:v", "copy")
            .opt("-c:a", mux.audio_codec.as_str())
            .opt("-b:a", mux.audio_bitrate.as_str())
            .arg("-shortest")
            .opt("-map_metadata", "-1")
            .opt("-fflags", "+bitexact")
            .opt("-movflags", "+faststart")
            .opt("-f", "mp4")
            .expect_duration(expected);

        ctx.run_engine(&command, "muxing video and audio", &mut |fraction| {
            ctx.report_progress(Stage::Mux, fraction);
        })?;

        state.store.commit(&target)?;
        if let Some(secs) = expected {
            ctx.logger.info(&format!("Output duration: {:.3}s", secs));
        }
        state.output = Some(target);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let key = state
            .output
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Output not recorded"))?;

        let path = state.store.path(key)?;
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(StepError::invalid_output("Output file is empty"));
        }
        Ok(())
    }
}

/// Staged video and concatenated audio, as recorded by the earlier steps.
fn input_keys(state: &JobState) -> (ArtifactKey, ArtifactKey) {
    (
        state.video.clone().unwrap_or_else(ArtifactKey::video_source),
        state.concat.clone().unwrap_or_else(ArtifactKey::concat_audio),
    )
}
