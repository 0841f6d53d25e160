//! End-to-end rotation behavior through the public pool API.
//!
//! Exercises registration, unused-first selection, usage stamping, and
//! pool exhaustion the way the bot daemon drives them.

use assert_matches::assert_matches;
use easel_accounts::pool::{AccountPool, PoolError};
use easel_accounts::session::CredentialAuthenticator;
use easel_accounts::store::AccountStore;

#[tokio::test]
async fn rotation_cycles_through_unused_accounts_then_exhausts() {
    let dir = tempfile::tempdir().unwrap();
    let store = AccountStore::load(dir.path().join("accounts.json")).await;
    let pool = AccountPool::new(store);

    pool.add_account("first", "key-1").await.unwrap();
    pool.add_account("second", "key-2").await.unwrap();

    // Two switches consume the two unused accounts, in some order.
    let s1 = pool.switch(&CredentialAuthenticator).await.unwrap();
    let s2 = pool.switch(&CredentialAuthenticator).await.unwrap();
    assert_ne!(s1.username, s2.username);

    // Both are now resting inside the cooldown window.
    assert_eq!(pool.next_available().await, None);
    let result = pool.switch(&CredentialAuthenticator).await;
    assert_matches!(result, Err(PoolError::Exhausted));

    let status = pool.status().await;
    assert_eq!(status.total_accounts, 2);
    assert_eq!(status.current_account.as_deref(), Some(s2.username.as_str()));
    for account in status.accounts.values() {
        assert_eq!(account.usage_count, 1);
        assert!(account.last_used.is_some());
    }
}

#[tokio::test]
async fn usage_metadata_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.json");

    {
        let store = AccountStore::load(&path).await;
        let pool = AccountPool::new(store);
        pool.add_account("only", "key").await.unwrap();
        pool.switch(&CredentialAuthenticator).await.unwrap();
    }

    let store = AccountStore::load(&path).await;
    let pool = AccountPool::new(store);

    // The reloaded pool sees the stamp and refuses to reuse the account.
    assert_eq!(pool.next_available().await, None);
    // The active session does not survive a restart, only the store does.
    assert!(!pool.is_current_valid().await);
}
