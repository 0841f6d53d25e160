//! Backend session establishment.
//!
//! Switching accounts re-validates the credential against the backend
//! before any usage stamp is written.  The validation is behind the
//! [`SessionAuthenticator`] trait so tests (and future transports) can
//! substitute their own session factory, and a successful switch hands
//! back an explicit [`BackendSession`] capability instead of leaving
//! authentication as a hidden side effect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Proof of a successfully authenticated backend account.
///
/// Returned by [`AccountPool::switch`](crate::pool::AccountPool::switch)
/// and held by whatever layer submits jobs on behalf of the account.
#[derive(Debug, Clone)]
pub struct BackendSession {
    /// Identifier of the authenticated account.
    pub username: String,
    /// The credential the session was established with.
    pub api_key: String,
    /// When the session was established.
    pub started_at: DateTime<Utc>,
}

/// Errors from credential re-validation.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// The stored credential is structurally unusable.
    #[error("Credential for {username} is malformed: {reason}")]
    InvalidCredential {
        /// Account the credential belongs to.
        username: String,
        /// Human-readable rejection reason.
        reason: String,
    },

    /// The backend refused the credential.
    #[error("Backend rejected credential for {username}: {reason}")]
    Rejected {
        /// Account the credential belongs to.
        username: String,
        /// Rejection detail reported by the backend.
        reason: String,
    },
}

/// Re-validates an account credential and opens a backend session.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    /// Validate `api_key` for `username` and return a live session.
    async fn authenticate(
        &self,
        username: &str,
        api_key: &str,
    ) -> Result<BackendSession, AuthenticationError>;
}

/// Default authenticator: local credential-shape validation.
///
/// Mirrors how the notebook CLI validates a credential file before use.
/// Networked validation can be swapped in through the trait without
/// touching the pool.
pub struct CredentialAuthenticator;

#[async_trait]
impl SessionAuthenticator for CredentialAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        api_key: &str,
    ) -> Result<BackendSession, AuthenticationError> {
        if api_key.trim().is_empty() {
            return Err(AuthenticationError::InvalidCredential {
                username: username.to_owned(),
                reason: "api key is empty".to_owned(),
            });
        }
        if api_key.chars().any(char::is_whitespace) {
            return Err(AuthenticationError::InvalidCredential {
                username: username.to_owned(),
                reason: "api key contains whitespace".to_owned(),
            });
        }

        Ok(BackendSession {
            username: username.to_owned(),
            api_key: api_key.to_owned(),
            started_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn well_formed_key_opens_session() {
        let session = CredentialAuthenticator
            .authenticate("alice", "0123abcd")
            .await
            .unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.api_key, "0123abcd");
    }

    #[tokio::test]
    async fn empty_key_rejected() {
        let err = CredentialAuthenticator
            .authenticate("alice", "   ")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthenticationError::InvalidCredential { .. }
        ));
    }

    #[tokio::test]
    async fn key_with_whitespace_rejected() {
        let err = CredentialAuthenticator
            .authenticate("alice", "ab cd")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthenticationError::InvalidCredential { .. }
        ));
    }
}
