//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::models::Stage;

use super::errors::StepResult;
use super::types::{Context, JobState};

/// Trait for pipeline steps.
///
/// Each step in the pipeline implements this trait. The pipeline runner
/// calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct ConcatStep;
///
/// impl PipelineStep for ConcatStep {
///     fn stage(&self) -> Stage { Stage::Concat }
///
///     fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         match state.manifest {
///             Some(ref m) if !m.is_empty() => Ok(()),
///             _ => Err(StepError::EmptyManifest),
///         }
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
///         // Join the manifest...
///         state.concat = Some(ArtifactKey::concat_audio());
///         Ok(())
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         if state.concat.is_none() {
///             return Err(StepError::invalid_output("Concatenated audio not recorded"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Stage this step implements (error context and progress range).
    fn stage(&self) -> Stage;

    /// Step name for logging. Defaults to the stage name.
    fn name(&self) -> &str {
        self.stage().name()
    }

    /// Validate inputs before execution.
    ///
    /// Should check that every artifact the step reads is present and
    /// that the previous steps recorded what this one needs.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Should perform the step's processing and record results in `state`.
    /// Use `ctx.logger` for logging and `ctx.report_progress()` for progress.
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()>;

    /// Validate outputs after execution.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep;

    impl PipelineStep for MockStep {
        fn stage(&self) -> Stage {
            Stage::Concat
        }

        fn validate_input(&self, _ctx: &Context, _state: &JobState) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut JobState) -> StepResult<()> {
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _state: &JobState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn step_trait_object_works() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep);

        assert_eq!(step.name(), "Concat");
        assert_eq!(step.description(), "Concat");
        assert_eq!(step.stage(), Stage::Concat);
    }
}
