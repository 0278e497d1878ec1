//! Per-run options a CLI invocation supplies to [`crate::infer`],
//! distinct from [`crucible_config::InferenceConfig`]: these select
//! *which* pipeline behavior runs, config selects *how it's wired*.

use crucible_config::{SearchStrategyKind, TransitiveMode};

/// One parser/validator dialect pairing `infer()` should try. In
/// production there is exactly one, chosen by `--language`; tests
/// supply fakes directly through [`crate::drivers::Drivers`].
#[derive(Debug, Clone)]
pub struct InferOptions {
    /// Path to the codebase under inference, bind-mounted into every
    /// sandbox.
    pub codebase_path: String,
    /// Dialect label (`--language`, default `python`).
    pub language: String,
    /// Which search strategy to run (`--search`).
    pub search_strategy: SearchStrategyKind,
    /// Transitive-resolution mode (`--only`).
    pub transitive_mode: TransitiveMode,
    /// Skip validation entirely (`--no-validate`).
    pub no_validate: bool,
    /// Override the snippet's entry command (`--cmd`/`--arg`).
    pub entry_override: Option<crucible_core::Command>,
}
