//! Async handle to a submitted job.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinHandle};

use super::errors::{PipelineError, PipelineResult};
use crate::models::{JobId, MediaBuffer, ProgressReport};

/// Handle returned by [`MergePipeline::submit`](super::MergePipeline::submit).
///
/// Progress reports arrive in order on an unbounded channel that closes
/// when the job finishes. Dropping the handle does not stop the job.
pub struct JobHandle {
    job_id: JobId,
    progress: Option<UnboundedReceiver<ProgressReport>>,
    task: JoinHandle<PipelineResult<MediaBuffer>>,
}

impl JobHandle {
    pub(crate) fn new(
        job_id: JobId,
        progress: UnboundedReceiver<ProgressReport>,
        task: JoinHandle<PipelineResult<MediaBuffer>>,
    ) -> Self {
        Self {
            job_id,
            progress: Some(progress),
            task,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Next progress report, or `None` once the job has finished and every
    /// report has been received.
    pub async fn progress(&mut self) -> Option<ProgressReport> {
        match self.progress.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Take the progress receiver to consume it on another task.
    pub fn take_progress(&mut self) -> Option<UnboundedReceiver<ProgressReport>> {
        self.progress.take()
    }

    /// Wait for the job's result.
    pub async fn wait(self) -> PipelineResult<MediaBuffer> {
        let job_id = self.job_id;
        flatten(job_id, self.task.await)
    }

    /// Wait for the job's result for at most `limit`.
    ///
    /// On expiry this returns [`PipelineError::Timeout`]; the job itself
    /// runs to completion in the background and keeps its pipeline busy
    /// until then.
    pub async fn wait_timeout(self, limit: Duration) -> PipelineResult<MediaBuffer> {
        let job_id = self.job_id;
        match tokio::time::timeout(limit, self.task).await {
            Ok(joined) => flatten(job_id, joined),
            Err(_) => {
                tracing::warn!("[{}] no result after {:?}", job_id, limit);
                Err(PipelineError::Timeout {
                    job_id,
                    after: limit,
                })
            }
        }
    }
}

fn flatten(
    job_id: JobId,
    joined: Result<PipelineResult<MediaBuffer>, JoinError>,
) -> PipelineResult<MediaBuffer> {
    joined.unwrap_or_else(|e| {
        Err(PipelineError::Aborted {
            job_id,
            message: e.to_string(),
        })
    })
}
