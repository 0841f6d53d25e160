//! Submit/poll/fetch job pipeline.
//!
//! One call to [`run_job`] drives a single job through the backend:
//! queue the graph, poll the history endpoint at a fixed interval until
//! the job completes, then download the first output image.  The poll
//! loop has no deadline of its own; callers bound it through the
//! [`CancellationToken`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::{ComfyUIApi, ComfyUIApiError, HistoryResponse};

/// History status value that marks a finished job.
pub const STATUS_COMPLETED: &str = "completed";

/// Lifecycle of a single job.
///
/// Success path is `Created -> Submitted -> Polling -> Completed ->
/// Fetched`; any error drops the job into the terminal `Failed` state.
/// Jobs are transient -- the state exists for log correlation, not
/// persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Graph prepared, nothing sent yet.
    Created,
    /// Graph accepted by the backend queue.
    Submitted,
    /// Waiting on the history endpoint.
    Polling,
    /// Backend reported completion.
    Completed,
    /// Output image downloaded.
    Fetched,
    /// Terminal failure.
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Submitted => "submitted",
            JobState::Polling => "polling",
            JobState::Completed => "completed",
            JobState::Fetched => "fetched",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Errors from one job run. All are per-job and recoverable: they never
/// affect other jobs or the account pool.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The queue submission was refused.
    #[error("Workflow submission failed: {0}")]
    Submission(ComfyUIApiError),

    /// A history poll was refused.
    #[error("Result polling failed: {0}")]
    Polling(ComfyUIApiError),

    /// Downloading the output image failed.
    #[error("Image download failed: {0}")]
    Download(ComfyUIApiError),

    /// The backend reported completion without any output image.
    #[error("Completed job reported no output images")]
    MissingOutput,

    /// The caller cancelled the job while it was waiting.
    #[error("Job cancelled while waiting for completion")]
    Cancelled,
}

/// Run one job to completion and return the output image bytes.
///
/// Polls at `poll_interval` until the backend reports
/// [`STATUS_COMPLETED`]. The loop itself has no deadline; cancel the
/// token to abandon a job that will never finish.
pub async fn run_job(
    api: &ComfyUIApi,
    graph: &serde_json::Value,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, JobError> {
    let job_id = uuid::Uuid::new_v4();
    tracing::debug!(%job_id, state = %JobState::Created, "Job prepared");

    let queued = api
        .queue_workflow(graph)
        .await
        .map_err(|e| fail(job_id, e, JobError::Submission))?;
    tracing::info!(
        %job_id,
        prompt_id = %queued.prompt_id,
        state = %JobState::Submitted,
        "Workflow queued",
    );

    let history = poll_until_complete(api, job_id, &queued.prompt_id, poll_interval, cancel).await?;
    tracing::info!(%job_id, state = %JobState::Completed, "Backend reported completion");

    let image_url = history
        .output_images
        .first()
        .ok_or_else(|| {
            tracing::error!(%job_id, state = %JobState::Failed, "No output image in result");
            JobError::MissingOutput
        })?
        .clone();

    let bytes = api
        .download_image(&image_url)
        .await
        .map_err(|e| fail(job_id, e, JobError::Download))?;
    tracing::info!(
        %job_id,
        bytes = bytes.len(),
        state = %JobState::Fetched,
        "Output image downloaded",
    );

    Ok(bytes)
}

/// Poll the history endpoint until the job completes or the token fires.
async fn poll_until_complete(
    api: &ComfyUIApi,
    job_id: uuid::Uuid,
    prompt_id: &str,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Result<HistoryResponse, JobError> {
    loop {
        let history = api
            .get_history(prompt_id)
            .await
            .map_err(|e| fail(job_id, e, JobError::Polling))?;

        if history.status == STATUS_COMPLETED {
            return Ok(history);
        }

        tracing::debug!(
            %job_id,
            prompt_id,
            status = %history.status,
            state = %JobState::Polling,
            "Job still running",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(%job_id, prompt_id, state = %JobState::Failed, "Job cancelled");
                return Err(JobError::Cancelled);
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

/// Log a terminal failure and wrap the API error.
fn fail(
    job_id: uuid::Uuid,
    error: ComfyUIApiError,
    wrap: fn(ComfyUIApiError) -> JobError,
) -> JobError {
    let wrapped = wrap(error);
    tracing::error!(%job_id, state = %JobState::Failed, error = %wrapped, "Job failed");
    wrapped
}
