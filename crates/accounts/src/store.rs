//! File-backed account store.
//!
//! Accounts are persisted as a single JSON object mapping account
//! identifier to credential + usage metadata.  The whole file is
//! rewritten on every mutation (write-through); there is no partial
//! update path at this scale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One registered backend account.
///
/// The account identifier (username) is the key of the surrounding map
/// and is not repeated inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque backend credential.
    pub api_key: String,
    /// When the account was last switched to, if ever.
    pub last_used: Option<DateTime<Utc>>,
    /// Number of successful switches onto this account.
    pub usage_count: u64,
}

/// Errors from persisting the account store.
///
/// Read errors never surface here -- [`AccountStore::load`] fails soft
/// and degrades to an empty store instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Writing the store file failed.
    #[error("Failed to write account store: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the account map failed.
    #[error("Failed to serialize account store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted mapping of account identifier to [`Account`].
pub struct AccountStore {
    path: PathBuf,
    pub(crate) accounts: HashMap<String, Account>,
}

impl AccountStore {
    /// Load the store from `path`.
    ///
    /// A missing or unparseable file is logged and replaced with a
    /// freshly persisted empty store -- load never propagates a read
    /// or parse error, so the process can always start.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let accounts = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(accounts) => accounts,
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Account store is corrupt, starting with an empty store",
                    );
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Account store not readable, creating an empty one",
                );
                HashMap::new()
            }
        };

        let store = Self { path, accounts };
        if store.accounts.is_empty() {
            if let Err(e) = store.save().await {
                tracing::error!(error = %e, "Failed to persist empty account store");
            }
        }
        store
    }

    /// Register (or overwrite) an account with zero usage and persist
    /// immediately.
    pub async fn add(&mut self, username: &str, api_key: &str) -> Result<(), StoreError> {
        self.accounts.insert(
            username.to_owned(),
            Account {
                api_key: api_key.to_owned(),
                last_used: None,
                usage_count: 0,
            },
        );
        self.save().await?;
        tracing::info!(username, "Registered account");
        Ok(())
    }

    /// Rewrite the whole store file as pretty-printed JSON.
    pub async fn save(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.accounts)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    /// Look up an account by identifier.
    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    /// All registered accounts.
    pub fn accounts(&self) -> &HashMap<String, Account> {
        &self.accounts
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no accounts are registered.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let store = AccountStore::load(&path).await;

        assert!(store.is_empty());
        // The empty store was written out so the next start finds it.
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.trim(), "{}");
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = AccountStore::load(&path).await;

        assert!(store.is_empty());
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.trim(), "{}");
    }

    #[tokio::test]
    async fn add_persists_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let mut store = AccountStore::load(&path).await;
        store.add("alice", "key-a").await.unwrap();
        store.add("bob", "key-b").await.unwrap();

        // Simulated restart.
        let reloaded = AccountStore::load(&path).await;
        assert_eq!(reloaded.len(), 2);
        let alice = reloaded.get("alice").unwrap();
        assert_eq!(alice.api_key, "key-a");
        assert_eq!(alice.last_used, None);
        assert_eq!(alice.usage_count, 0);
    }

    #[tokio::test]
    async fn add_overwrites_existing_account() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let mut store = AccountStore::load(&path).await;
        store.add("alice", "old-key").await.unwrap();
        store
            .accounts
            .get_mut("alice")
            .unwrap()
            .usage_count = 7;
        store.add("alice", "new-key").await.unwrap();

        let alice = store.get("alice").unwrap();
        assert_eq!(alice.api_key, "new-key");
        assert_eq!(alice.usage_count, 0, "re-registration resets usage");
    }

    #[test]
    fn account_serializes_with_iso_timestamp_or_null() {
        let account = Account {
            api_key: "k".into(),
            last_used: None,
            usage_count: 3,
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json["last_used"].is_null());
        assert_eq!(json["usage_count"], 3);

        let stamped = Account {
            last_used: Some("2024-05-01T08:30:00Z".parse().unwrap()),
            ..account
        };
        let json = serde_json::to_value(&stamped).unwrap();
        let text = json["last_used"].as_str().unwrap();
        assert!(text.starts_with("2024-05-01T08:30:00"));
    }
}
