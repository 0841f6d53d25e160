//! Startup configuration errors.

/// Errors raised while building [`BotConfig`](crate::config::BotConfig)
/// from the environment.
///
/// These are fatal: the process must not start with an incomplete or
/// unparseable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("Required environment variable {name} is not set")]
    MissingVar {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// An environment variable is present but failed to parse.
    #[error("Environment variable {name} has invalid value \"{value}\"")]
    InvalidVar {
        /// Name of the offending variable.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}
