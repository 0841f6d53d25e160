//! Rotating account pool.
//!
//! The pool owns the [`AccountStore`] and serializes every selection,
//! usage stamp, and persistence step behind one async mutex so two
//! concurrent jobs can never pick and double-stamp the same account.
//! Jobs only hold the lock for the brief switch -- polling a remote job
//! never blocks the pool.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::session::{BackendSession, SessionAuthenticator};
use crate::store::{Account, AccountStore, StoreError};

/// Default rest window after an account is used.
pub const DEFAULT_COOLDOWN_HOURS: i64 = 12;

/// Errors from account selection and switching.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No account is unused and none has cleared the cooldown window.
    #[error("No backend account is currently available")]
    Exhausted,

    /// Credential re-validation failed; pool state is unchanged.
    #[error("Account authentication failed: {0}")]
    Authentication(#[from] crate::session::AuthenticationError),

    /// Persisting the updated usage metadata failed.
    #[error("Failed to persist account store: {0}")]
    Store(#[from] StoreError),
}

/// Read-only snapshot of the pool for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// Number of registered accounts.
    pub total_accounts: usize,
    /// Identifier of the active account, if any.
    pub current_account: Option<String>,
    /// Full per-account usage map.
    pub accounts: HashMap<String, Account>,
}

/// State guarded by the pool mutex.
struct PoolInner {
    store: AccountStore,
    active: Option<String>,
    last_switch: Option<DateTime<Utc>>,
}

/// Shared, mutually-exclusive account pool.
pub struct AccountPool {
    cooldown: Duration,
    inner: Mutex<PoolInner>,
}

impl AccountPool {
    /// Wrap a loaded store with the default 12-hour cooldown.
    pub fn new(store: AccountStore) -> Self {
        Self::with_cooldown(store, Duration::hours(DEFAULT_COOLDOWN_HOURS))
    }

    /// Wrap a loaded store with an explicit cooldown window.
    pub fn with_cooldown(store: AccountStore, cooldown: Duration) -> Self {
        Self {
            cooldown,
            inner: Mutex::new(PoolInner {
                store,
                active: None,
                last_switch: None,
            }),
        }
    }

    /// Register an account and persist it immediately.
    pub async fn add_account(&self, username: &str, api_key: &str) -> Result<(), StoreError> {
        self.inner.lock().await.store.add(username, api_key).await
    }

    /// Identifier of the next usable account, if any.
    ///
    /// An account that has never been used wins immediately; otherwise
    /// the least-recently-used account past the cooldown is chosen.
    pub async fn next_available(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        pick_account(inner.store.accounts(), self.cooldown, Utc::now())
    }

    /// Switch the pool to the next available account.
    ///
    /// The credential is re-validated *before* any state is touched: an
    /// authentication failure leaves usage stamps, the active account,
    /// and the on-disk store exactly as they were.  On success the
    /// account is stamped (`last_used = now`, `usage_count += 1`),
    /// persisted, made active, and a [`BackendSession`] is returned.
    pub async fn switch(
        &self,
        authenticator: &dyn SessionAuthenticator,
    ) -> Result<BackendSession, PoolError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let username = pick_account(inner.store.accounts(), self.cooldown, now).ok_or_else(|| {
            tracing::error!("No backend account available");
            PoolError::Exhausted
        })?;

        let api_key = inner
            .store
            .get(&username)
            .map(|a| a.api_key.clone())
            .unwrap_or_default();

        let session = match authenticator.authenticate(&username, &api_key).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(username = %username, error = %e, "Account switch failed");
                return Err(e.into());
            }
        };

        if let Some(account) = inner.store.accounts.get_mut(&username) {
            account.last_used = Some(now);
            account.usage_count += 1;
        }
        inner.store.save().await?;

        inner.active = Some(username.clone());
        inner.last_switch = Some(now);

        tracing::info!(username = %username, "Switched to account");
        Ok(session)
    }

    /// True while an active account exists and the last switch is still
    /// inside the cooldown window.
    ///
    /// This freshness check is deliberately the mirror of the
    /// per-account availability rule: an account is *available* again
    /// once more than the cooldown has elapsed since `last_used`, while
    /// the current session stays *fresh* only while less than the
    /// cooldown has elapsed since the switch.
    pub async fn is_current_valid(&self) -> bool {
        let inner = self.inner.lock().await;
        match (&inner.active, inner.last_switch) {
            (Some(_), Some(switched)) => Utc::now() - switched < self.cooldown,
            _ => false,
        }
    }

    /// Snapshot of the pool state; performs no mutation.
    pub async fn status(&self) -> PoolStatus {
        let inner = self.inner.lock().await;
        PoolStatus {
            total_accounts: inner.store.len(),
            current_account: inner.active.clone(),
            accounts: inner.store.accounts().clone(),
        }
    }
}

/// Select the next usable account identifier.
///
/// Returns the first never-used account encountered, else the account
/// with the earliest `last_used` among those strictly past the
/// cooldown, else `None`.
fn pick_account(
    accounts: &HashMap<String, Account>,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<String> {
    let mut oldest: Option<(&String, DateTime<Utc>)> = None;

    for (username, account) in accounts {
        let Some(last_used) = account.last_used else {
            return Some(username.clone());
        };

        if last_used + cooldown < now {
            let is_older = oldest.map_or(true, |(_, t)| last_used < t);
            if is_older {
                oldest = Some((username, last_used));
            }
        }
    }

    oldest.map(|(username, _)| username.clone())
}
