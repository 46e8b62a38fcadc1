//! Normalize step - converts every clip to canonical PCM WAV.

use crate::models::{Stage, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};
use crate::engine::EngineCommand;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::phase::JobPhase;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, Manifest};
use crate::store::ArtifactKey;

/// Normalize step.
///
/// Clips are converted one at a time in upload order to 16-bit PCM WAV
/// with two channels at 44.1 kHz, so the concat step can join them
/// without re-encoding. The resulting keys form the job's manifest.
pub struct NormalizeStep;

impl NormalizeStep {
    pub fn new() -> Self {
        Self
    }

    fn normalize_clip(
        &self,
        ctx: &Context,
        state: &mut JobState,
        index: usize,
        total: usize,
    ) -> StepResult<ArtifactKey> {
        let source = ArtifactKey::clip_source(index);
        let target = ArtifactKey::clip_normalized(index);
        let name = ctx.clip_name(index);

        let source_path = state.store.path(&source)?.to_path_buf();
        let info = ctx
            .probe(Stage::Normalize, &source_path)
            .map_err(|e| StepError::unsupported(&name, e.to_string()))?;
        if !info.has_audio() {
            return Err(StepError::unsupported(&name, "no audio stream"));
        }

        if !ctx.settings.normalize.always_transcode
            && info.is_pcm_wav(CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE)
        {
            ctx.logger
                .info(&format!("'{}' is already canonical WAV, copying", name));
            state.store.copy(&source, &target)?;
            return Ok(target);
        }

        let command = EngineCommand::new(ctx.tag(Stage::Normalize), state.store.reserve(&target))
            .input(&source_path)
            .arg("-vn")
            .opt("-map", "0:a:0")
            .opt("-ac", CANONICAL_CHANNELS.to_string())
            .opt("-ar", CANONICAL_SAMPLE_RATE.to_string())
            .opt("-c:a", "pcm_s16le")
            .opt("-map_metadata", "-1")
            .opt("-fflags", "+bitexact")
            .opt("-f", "wav")
            .expect_duration(info.duration());

        let per_clip = 1.0 / total as f64;
        let base = index as f64 * per_clip;
        ctx.run_engine(
            &command,
            &format!("normalizing clip {} ('{}')", index, name),
            &mut |fraction| {
                ctx.report_progress(Stage::Normalize, base + fraction * per_clip);
            },
        )?;

        state.store.commit(&target)?;
        Ok(target)
    }
}

impl Default for NormalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for NormalizeStep {
    fn stage(&self) -> Stage {
        Stage::Normalize
    }

    fn description(&self) -> &str {
        "Convert each clip to 16-bit stereo 44.1 kHz WAV"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        for key in &state.clips {
            state.store.path(key)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let total = state.clips.len();
        let mut manifest = Manifest::new();

        for index in 0..total {
            ctx.set_phase(JobPhase::Normalizing { index, total });
            let key = self.normalize_clip(ctx, state, index, total)?;
            manifest.push(key);

            // Raw upload is no longer needed
            state.store.remove(&ArtifactKey::clip_source(index))?;

            ctx.report_progress(Stage::Normalize, (index + 1) as f64 / total as f64);
        }

        ctx.logger
            .info(&format!("Normalized {} clip(s)", manifest.len()));
        state.manifest = Some(manifest);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let manifest = state
            .manifest
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Manifest not recorded"))?;

        if manifest.len() != state.clips.len() {
            return Err(StepError::invalid_output(format!(
                "Manifest has {} entries for {} clips",
                manifest.len(),
                state.clips.len()
            )));
        }
        for key in manifest.entries() {
            if !state.store.contains(key) {
                return Err(StepError::invalid_output(format!(
                    "Normalized artifact '{}' missing",
                    key
                )));
            }
        }
        Ok(())
    }
}
