//! Concat step - joins normalized clips into one track without re-encoding.

use crate::engine::{EngineCommand, StreamInfo};
use crate::models::Stage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::phase::JobPhase;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::store::ArtifactKey;

/// Concat step.
///
/// Every manifest entry must share one channel count and sample rate;
/// the entries are then stream-copied back to back through the concat
/// demuxer, in manifest order, with no gaps.
pub struct ConcatStep;

impl ConcatStep {
    pub fn new() -> Self {
        Self
    }

    /// Probe all entries and return the total duration, if known.
    fn check_layout(&self, ctx: &Context, state: &JobState) -> StepResult<Option<f64>> {
        let manifest = state.manifest.as_ref().ok_or(StepError::EmptyManifest)?;

        let mut reference: Option<(ArtifactKey, u32, u32)> = None;
        let mut total = Some(0.0);

        for key in manifest.entries() {
            let path = state.store.path(key)?;
            let info = ctx
                .probe(Stage::Concat, path)
                .map_err(|e| StepError::engine(format!("probing '{}'", key), e))?;
            let audio = info.first_audio().ok_or_else(|| {
                StepError::FormatMismatch(format!("'{}' has no audio stream", key))
            })?;
            let (channels, rate) = layout(audio);

            let (first, ref_channels, ref_rate) =
                reference.get_or_insert_with(|| (key.clone(), channels, rate));
            if channels != *ref_channels || rate != *ref_rate {
                return Err(StepError::FormatMismatch(format!(
                    "'{}' is {} ch / {} Hz but '{}' is {} ch / {} Hz",
                    key, channels, rate, first, ref_channels, ref_rate
                )));
            }

            total = match (total, info.duration()) {
                (Some(sum), Some(d)) => Some(sum + d),
                _ => None,
            };
        }

        Ok(total)
    }
}

fn layout(audio: &StreamInfo) -> (u32, u32) {
    (audio.channels.unwrap_or(0), audio.sample_rate.unwrap_or(0))
}

impl Default for ConcatStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ConcatStep {
    fn stage(&self) -> Stage {
        Stage::Concat
    }

    fn description(&self) -> &str {
        "Join normalized clips in order"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.manifest {
            Some(ref manifest) if !manifest.is_empty() => Ok(()),
            _ => Err(StepError::EmptyManifest),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        ctx.set_phase(JobPhase::Concatenating);
        ctx.report_progress(Stage::Concat, 0.0);

        let total_secs = self.check_layout(ctx, state)?;

        let list = ArtifactKey::concat_list();
        let rendered = state
            .manifest
            .as_ref()
            .ok_or(StepError::EmptyManifest)?
            .render(&state.store)?;
        state.store.put(&list, rendered.as_bytes())?;

        let target = ArtifactKey::concat_audio();
        let command = EngineCommand::new(ctx.tag(Stage::Concat), state.store.reserve(&target))
            .opt("-f", "concat")
            .opt("-safe", "0")
            .input(state.store.path(&list)?)
            .opt("-map", "0:a")
            .opt("-c", "copy")
            .opt("-map_metadata", "-1")
            .opt("-fflags", "+bitexact")
            .opt("-f", "wav")
            .expect_duration(total_secs);

        ctx.run_engine(&command, "concatenating clips", &mut |fraction| {
            ctx.report_progress(Stage::Concat, fraction);
        })?;

        state.store.commit(&target)?;
        if let Some(secs) = total_secs {
            ctx.logger
                .info(&format!("Concatenated audio: {:.3}s", secs));
        }
        state.concat = Some(target);
        ctx.report_progress(Stage::Concat, 1.0);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.concat {
            Some(ref key) if state.store.contains(key) => Ok(()),
            _ => Err(StepError::invalid_output("Concatenated audio not recorded")),
        }
    }
}
