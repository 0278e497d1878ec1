//! Configuration-loading errors.

use thiserror::Error;

/// Failure while assembling an [`crate::InferenceConfig`] from its
/// layered sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was present but couldn't be parsed into
    /// the type its field expects.
    #[error("environment variable {var} has an invalid value {value:?}: {reason}")]
    InvalidEnvVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A required value was missing from every layer (defaults, env,
    /// CLI flags).
    #[error("missing required configuration value: {field}")]
    Missing { field: &'static str },
}
