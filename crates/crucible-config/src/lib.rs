//! Hierarchical configuration for the inference pipeline: built-in
//! defaults, overridden by `CRUCIBLE_*` environment variables, in turn
//! overridden by CLI flags (§9 "Configuration").

pub mod env;
pub mod error;
pub mod loader;
pub mod types;

pub use env::{CrucibleEnvVar, EnvOverrides};
pub use error::ConfigError;
pub use loader::{load, CliOverrides};
pub use types::{ConsulSink, InferenceConfig, SandboxImages, SearchStrategyKind, TransitiveMode};
