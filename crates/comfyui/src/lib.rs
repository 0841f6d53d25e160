//! Remote ComfyUI job submission for the easel bot.
//!
//! Provides the REST client for the notebook-hosted backend, the
//! submit/poll/fetch job pipeline, and the [`manager::ComfyUIManager`]
//! facade the chat layer calls to turn a workflow name plus user input
//! into processed image bytes.

pub mod api;
pub mod manager;
pub mod processor;

pub use api::{ComfyUIApi, ComfyUIApiError};
pub use manager::{ComfyUIManager, ProcessError};
pub use processor::{JobError, JobState};
