use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Bot backend configuration loaded from environment variables.
///
/// Constructed once at startup and passed by reference into each
/// component -- there is no ambient global configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Chat platform bot credential. Required; the process must not
    /// start without it.
    pub telegram_token: String,
    /// Base HTTP URL of the remote notebook-hosted ComfyUI backend,
    /// e.g. `https://tunnel.example.net`. Required.
    pub notebook_url: String,
    /// Path of the JSON account store (default: `accounts.json`).
    pub accounts_file: PathBuf,
    /// Directory holding workflow template files (default: `workflows`).
    pub workflows_dir: PathBuf,
    /// Hours an account rests after use before it becomes eligible
    /// again (default: `12`).
    pub account_cooldown_hours: i64,
    /// Seconds between result polls for a submitted job (default: `1`).
    pub poll_interval_secs: u64,
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default          |
    /// |--------------------------|----------|------------------|
    /// | `TELEGRAM_TOKEN`         | yes      | --               |
    /// | `NOTEBOOK_URL`           | yes      | --               |
    /// | `ACCOUNTS_FILE`          | no       | `accounts.json`  |
    /// | `WORKFLOWS_DIR`          | no       | `workflows`      |
    /// | `ACCOUNT_COOLDOWN_HOURS` | no       | `12`             |
    /// | `POLL_INTERVAL_SECS`     | no       | `1`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram_token = require("TELEGRAM_TOKEN")?;
        let notebook_url = require("NOTEBOOK_URL")?;

        let accounts_file: PathBuf = std::env::var("ACCOUNTS_FILE")
            .unwrap_or_else(|_| "accounts.json".into())
            .into();

        let workflows_dir: PathBuf = std::env::var("WORKFLOWS_DIR")
            .unwrap_or_else(|_| "workflows".into())
            .into();

        let account_cooldown_hours = parse_or("ACCOUNT_COOLDOWN_HOURS", 12)?;
        let poll_interval_secs = parse_or("POLL_INTERVAL_SECS", 1)?;

        Ok(Self {
            telegram_token,
            notebook_url,
            accounts_file,
            workflows_dir,
            account_cooldown_hours,
            poll_interval_secs,
        })
    }
}

/// Read a required variable, treating an empty value as missing.
fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar { name })
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
    }
}
