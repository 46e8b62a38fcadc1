//! Job lifecycle state and the single-active-job gate.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::JobId;

/// Lifecycle state of a merge pipeline.
///
/// `Idle → Staging → Normalizing → Concatenating → Muxing → Done`, with
/// `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    Staging,
    /// Normalizing clip `index` of `total` (zero-based).
    Normalizing { index: usize, total: usize },
    Concatenating,
    Muxing,
    Done,
    Failed,
}

impl JobPhase {
    /// Whether a new job may start from this phase.
    pub fn accepts_jobs(&self) -> bool {
        matches!(self, JobPhase::Idle | JobPhase::Done | JobPhase::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Idle => write!(f, "idle"),
            JobPhase::Staging => write!(f, "staging"),
            JobPhase::Normalizing { index, total } => {
                write!(f, "normalizing clip {}/{}", index + 1, total)
            }
            JobPhase::Concatenating => write!(f, "concatenating"),
            JobPhase::Muxing => write!(f, "muxing"),
            JobPhase::Done => write!(f, "done"),
            JobPhase::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Default)]
struct PhaseState {
    phase: JobPhase,
    active: Option<JobId>,
}

/// Shared phase slot of one pipeline instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhaseCell(Arc<Mutex<PhaseState>>);

impl PhaseCell {
    pub fn get(&self) -> JobPhase {
        self.0.lock().phase
    }

    pub fn set(&self, phase: JobPhase) {
        self.0.lock().phase = phase;
    }

    /// Claim the pipeline for `job_id`, or return the job holding it.
    pub fn try_claim(&self, job_id: JobId) -> Result<(), JobId> {
        let mut state = self.0.lock();
        if let Some(active) = state.active {
            return Err(active);
        }
        state.active = Some(job_id);
        state.phase = JobPhase::Staging;
        Ok(())
    }

    /// Release the claim and record the terminal phase.
    pub fn release(&self, phase: JobPhase) {
        let mut state = self.0.lock();
        state.phase = phase;
        state.active = None;
    }
}

/// Claim on a pipeline for one job.
///
/// Dropping an unfinished ticket (a worker panic) marks the pipeline
/// `Failed` so it does not stay busy forever.
pub(crate) struct JobTicket {
    cell: PhaseCell,
    finished: bool,
}

impl JobTicket {
    pub fn claim(cell: &PhaseCell, job_id: JobId) -> Result<Self, JobId> {
        cell.try_claim(job_id)?;
        Ok(Self {
            cell: cell.clone(),
            finished: false,
        })
    }

    pub fn cell(&self) -> &PhaseCell {
        &self.cell
    }

    pub fn finish(mut self, phase: JobPhase) {
        self.finished = true;
        self.cell.release(phase);
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        if !self.finished {
            self.cell.release(JobPhase::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_claim_at_a_time() {
        let cell = PhaseCell::default();
        let first = JobId::new();

        let ticket = JobTicket::claim(&cell, first).unwrap();
        assert_eq!(cell.get(), JobPhase::Staging);

        let err = JobTicket::claim(&cell, JobId::new()).err();
        assert_eq!(err, Some(first));

        ticket.finish(JobPhase::Done);
        assert_eq!(cell.get(), JobPhase::Done);
        assert!(JobTicket::claim(&cell, JobId::new()).is_ok());
    }

    #[test]
    fn dropped_ticket_marks_failed() {
        let cell = PhaseCell::default();
        {
            let _ticket = JobTicket::claim(&cell, JobId::new()).unwrap();
            cell.set(JobPhase::Muxing);
        }
        assert_eq!(cell.get(), JobPhase::Failed);
        assert!(cell.get().accepts_jobs());
    }

    #[test]
    fn phase_display() {
        let phase = JobPhase::Normalizing { index: 1, total: 3 };
        assert_eq!(phase.to_string(), "normalizing clip 2/3");
        assert!(!phase.accepts_jobs());
        assert!(JobPhase::Failed.is_terminal());
    }
}
