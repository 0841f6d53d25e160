//! Shared configuration and startup error types for the easel workspace.
//!
//! Kept dependency-free (beyond `thiserror`) so every other crate can
//! consume it without pulling in the async or HTTP stack.

pub mod config;
pub mod error;

pub use config::BotConfig;
pub use error::ConfigError;
