//! Backend account management for the easel bot.
//!
//! Remote notebook compute quotas are a scarce, time-windowed resource,
//! so the bot spreads jobs across a pool of registered accounts.  This
//! crate provides the persisted [`store::AccountStore`], the rotating
//! [`pool::AccountPool`] that selects the next usable credential under
//! a cooldown rule, and the [`session::SessionAuthenticator`] seam used
//! to re-validate a credential when the pool switches accounts.

pub mod pool;
pub mod session;
pub mod store;

pub use pool::{AccountPool, PoolError, PoolStatus};
pub use session::{
    AuthenticationError, BackendSession, CredentialAuthenticator, SessionAuthenticator,
};
pub use store::{Account, AccountStore, StoreError};
