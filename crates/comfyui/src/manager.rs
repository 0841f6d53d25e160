//! Job submission facade.
//!
//! [`ComfyUIManager`] is what the chat layer talks to: it resolves the
//! requested workflow, makes sure a live backend account is active
//! (rotating through the pool when the current session goes stale), and
//! drives the submit/poll/fetch pipeline for each request.  Multiple
//! chat users run [`ComfyUIManager::process`] concurrently; the account
//! pool is the only shared mutable state and serializes itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use easel_accounts::pool::{AccountPool, PoolError, PoolStatus};
use easel_accounts::session::SessionAuthenticator;
use easel_workflows::store::{TemplateError, WorkflowInfo, WorkflowStore};
use easel_workflows::template::WorkflowTemplate;

use crate::api::ComfyUIApi;
use crate::processor::{run_job, JobError};

/// Errors surfaced to the chat layer for one processing request.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The requested workflow name is not registered.
    #[error("Workflow \"{0}\" is not registered")]
    UnknownWorkflow(String),

    /// No usable account, or the switch itself failed.
    #[error("Account pool: {0}")]
    Pool(#[from] PoolError),

    /// The job failed at submit, poll, or download.
    #[error("Job failed: {0}")]
    Job(#[from] JobError),

    /// The customized graph could not be encoded for submission.
    #[error("Failed to encode workflow graph: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Orchestrates workflows, accounts, and the remote backend.
///
/// Created once at startup; the chat front end calls
/// [`process`](Self::process) per user request and relays bytes or the
/// typed failure back to the user.
pub struct ComfyUIManager {
    api: ComfyUIApi,
    pool: Arc<AccountPool>,
    workflows: RwLock<WorkflowStore>,
    authenticator: Arc<dyn SessionAuthenticator>,
    poll_interval: Duration,
    /// Master cancellation token -- cancelled during shutdown so every
    /// in-flight poll loop stops.
    cancel: CancellationToken,
}

impl ComfyUIManager {
    /// Build a manager over an already-loaded pool and workflow store.
    pub fn new(
        base_url: String,
        pool: Arc<AccountPool>,
        workflows: WorkflowStore,
        authenticator: Arc<dyn SessionAuthenticator>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api: ComfyUIApi::new(base_url),
            pool,
            workflows: RwLock::new(workflows),
            authenticator,
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Process one user request end to end.
    ///
    /// Ensures a live backend session, customizes the named workflow
    /// with the prompt (and input image, when given), submits it, waits
    /// for completion, and returns the downloaded image bytes verbatim.
    /// No retries happen here; callers may re-invoke from scratch.
    pub async fn process(
        &self,
        workflow_name: &str,
        prompt: &str,
        input_image: Option<&[u8]>,
    ) -> Result<Vec<u8>, ProcessError> {
        let template = {
            let workflows = self.workflows.read().await;
            workflows
                .get(workflow_name)
                .cloned()
                .ok_or_else(|| ProcessError::UnknownWorkflow(workflow_name.to_owned()))?
        };

        self.ensure_session().await?;

        let graph = serde_json::to_value(template.customize(prompt, input_image))?;

        let job_cancel = self.cancel.child_token();
        let bytes = run_job(&self.api, &graph, self.poll_interval, &job_cancel).await?;

        tracing::info!(
            workflow = workflow_name,
            bytes = bytes.len(),
            "Request processed",
        );
        Ok(bytes)
    }

    /// Persist and register a new workflow template.
    pub async fn add_workflow(
        &self,
        name: &str,
        template: WorkflowTemplate,
    ) -> Result<(), TemplateError> {
        self.workflows.write().await.add(name, template).await
    }

    /// Summary of a registered workflow.
    pub async fn workflow_info(&self, name: &str) -> Result<WorkflowInfo, TemplateError> {
        self.workflows.read().await.info(name)
    }

    /// Names of all registered workflows, sorted.
    pub async fn workflow_names(&self) -> Vec<String> {
        self.workflows.read().await.names()
    }

    /// Read-only snapshot of the account pool.
    pub async fn pool_status(&self) -> PoolStatus {
        self.pool.status().await
    }

    /// Cancel every in-flight job poll loop.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down job manager");
        self.cancel.cancel();
    }

    // ---- private helpers ----

    /// Rotate to a fresh account unless the current session is still
    /// inside its validity window.
    async fn ensure_session(&self) -> Result<(), ProcessError> {
        if self.pool.is_current_valid().await {
            return Ok(());
        }

        let session = self.pool.switch(self.authenticator.as_ref()).await?;
        tracing::info!(username = %session.username, "Backend session refreshed");
        Ok(())
    }
}
