//! The inference driver's output: a working environment plus the
//! bookkeeping an emitter or Consul sink needs (§4.J, §6).

use crucible_core::Environment;
use serde::{Deserialize, Serialize};

/// A run identifier unique enough for Consul key namespacing and log
/// correlation: a timestamp plus the process id.
#[must_use]
pub fn new_run_id() -> String {
    format!("{}-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f"), std::process::id())
}

/// Full result of one `infer()` call: the environment the driver
/// settled on, plus the metadata a Consul sink or JSON emitter needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceReport {
    /// Identifies this run for log correlation and Consul keys.
    pub run_id: String,
    /// The environment validation succeeded on, or the first
    /// environment produced when `--no-validate` was set.
    pub environment: Environment,
    /// Total validations performed before success (0 under
    /// `--no-validate`).
    pub num_validations: u64,
    /// Milliseconds from inference start to success.
    pub elapsed_ms: u64,
}
