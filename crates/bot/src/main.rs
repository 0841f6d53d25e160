//! `easel-bot` -- chat-bot backend daemon for remote image generation.
//!
//! Loads the account store and workflow templates, builds the job
//! manager over the notebook-hosted ComfyUI backend, and keeps it
//! running until shutdown.  The chat front end drives
//! [`ComfyUIManager::process`](easel_comfyui::manager::ComfyUIManager::process)
//! with `(workflow_name, prompt, input_image?)` and relays the returned
//! image bytes (or the typed failure) to the end user.
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default         | Description                           |
//! |--------------------------|----------|-----------------|---------------------------------------|
//! | `TELEGRAM_TOKEN`         | yes      | --              | Chat platform bot credential          |
//! | `NOTEBOOK_URL`           | yes      | --              | Base HTTP URL of the remote backend   |
//! | `ACCOUNTS_FILE`          | no       | `accounts.json` | Path of the JSON account store        |
//! | `WORKFLOWS_DIR`          | no       | `workflows`     | Directory of workflow template files  |
//! | `ACCOUNT_COOLDOWN_HOURS` | no       | `12`            | Rest window per account after use     |
//! | `POLL_INTERVAL_SECS`     | no       | `1`             | Delay between job result polls        |

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easel_accounts::pool::AccountPool;
use easel_accounts::session::CredentialAuthenticator;
use easel_accounts::store::AccountStore;
use easel_comfyui::manager::ComfyUIManager;
use easel_core::config::BotConfig;
use easel_workflows::store::WorkflowStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "easel_bot=info,easel_accounts=info,easel_workflows=info,easel_comfyui=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };
    tracing::info!(
        notebook_url = %config.notebook_url,
        accounts_file = %config.accounts_file.display(),
        workflows_dir = %config.workflows_dir.display(),
        "Loaded configuration",
    );

    let store = AccountStore::load(&config.accounts_file).await;
    let pool = Arc::new(AccountPool::with_cooldown(
        store,
        chrono::Duration::hours(config.account_cooldown_hours),
    ));

    let workflows = WorkflowStore::load_all(&config.workflows_dir).await;

    let manager = ComfyUIManager::new(
        config.notebook_url.clone(),
        Arc::clone(&pool),
        workflows,
        Arc::new(CredentialAuthenticator),
        Duration::from_secs(config.poll_interval_secs),
    );

    let status = manager.pool_status().await;
    tracing::info!(
        total_accounts = status.total_accounts,
        workflows = ?manager.workflow_names().await,
        "easel-bot ready",
    );

    // The chat front end owns the update loop; this daemon just keeps
    // the manager alive until it is told to stop.
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }

    manager.shutdown();
}
