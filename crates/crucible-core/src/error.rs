//! The closed set of inference-level errors and their stable JSON shape.
//!
//! `anyhow` is used at the CLI boundary for its ergonomics, but nothing
//! below that boundary ever returns it: every fallible operation in the
//! pipeline resolves to one of the variants here, so the CLI can print
//! a stable, machine-parseable error document regardless of which stage
//! failed.

use crate::environment::Environment;
use crate::validation::ValidationRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::error::Error as StdError;

/// Result alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, CrucibleError>;

/// Every way an inference run can fail. The set is closed: a new
/// failure mode is a new variant here, not a wrapped opaque error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrucibleError {
    /// The run was cancelled by a process signal (`SIGINT`/`SIGTERM`).
    #[error("inference terminated by signal {signal}")]
    InferenceTerminated {
        /// POSIX signal number that triggered cancellation.
        signal: i32,
    },

    /// The knowledge graph returned zero candidate base environments
    /// for the detected language/dialect.
    #[error("no base environments available for this language")]
    NoBaseEnvironments,

    /// The wall-clock inference budget elapsed before a working
    /// environment was found.
    #[error("inference exceeded its time budget after {num_validations} validation(s)")]
    InferenceTimeout {
        /// Milliseconds elapsed when the timeout fired.
        elapsed_ms: u64,
        /// Validations completed before the deadline.
        num_validations: u64,
    },

    /// The configured search strategy exhausted its search space
    /// without ever observing a `Success` validation.
    #[error("search exhausted without finding a working environment")]
    NoWorkingEnvironment {
        /// Milliseconds elapsed when the search exhausted itself.
        elapsed_ms: u64,
        /// Total validations attempted across the search.
        num_validations: u64,
        /// The terminal environment of every starting root the search
        /// explored, kept for diagnostics even though none validated
        /// (§7: "carrying each root's terminal metadata").
        terminals: Vec<Environment>,
    },

    /// A validation sandbox reported a status the driver cannot treat
    /// as progress: malformed output, or an exception outside the
    /// active language strategy's known classification tables.
    #[error("validation sandbox reported an unclassifiable result")]
    ValidationError {
        /// The record the sandbox returned.
        record: Box<ValidationRecord>,
    },

    /// Anything else: adapter/graph-query transport failures, sandbox
    /// driver failures unrelated to the snippet itself, and similar.
    #[error("unexpected failure during inference: {message}")]
    UnexpectedInference {
        /// Human-readable detail, not meant to be pattern-matched on.
        message: String,
    },
}

impl CrucibleError {
    /// Stable variant name used as the `name` field in the JSON
    /// representation and in log output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InferenceTerminated { .. } => "InferenceTerminated",
            Self::NoBaseEnvironments => "NoBaseEnvironments",
            Self::InferenceTimeout { .. } => "InferenceTimeout",
            Self::NoWorkingEnvironment { .. } => "NoWorkingEnvironment",
            Self::ValidationError { .. } => "ValidationError",
            Self::UnexpectedInference { .. } => "UnexpectedInference",
        }
    }

    /// The POSIX `128 + signo` exit code convention, for variants
    /// carrying a signal. `None` for every other variant; the CLI
    /// falls back to a fixed non-zero code in that case.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::InferenceTerminated { signal } => Some(128 + *signal),
            _ => None,
        }
    }

    /// Walks `source()` to build the `stack` field: the message of
    /// this error followed by the message of each wrapped cause.
    fn stack(&self) -> Vec<String> {
        let mut frames = vec![self.to_string()];
        let mut cause = StdError::source(self);
        while let Some(err) = cause {
            frames.push(err.to_string());
            cause = err.source();
        }
        frames
    }
}

impl Serialize for CrucibleError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", self.name())?;
        map.serialize_entry("message", &self.to_string())?;
        map.serialize_entry("stack", &self.stack())?;

        match self {
            Self::InferenceTerminated { signal } => {
                map.serialize_entry("signal", signal)?;
                map.serialize_entry("code", &(128 + *signal))?;
            }
            Self::NoBaseEnvironments => {}
            Self::InferenceTimeout {
                elapsed_ms,
                num_validations,
            } => {
                map.serialize_entry("elapsed_ms", elapsed_ms)?;
                map.serialize_entry("num_validations", num_validations)?;
            }
            Self::NoWorkingEnvironment {
                elapsed_ms,
                num_validations,
                terminals,
            } => {
                map.serialize_entry("elapsed_ms", elapsed_ms)?;
                map.serialize_entry("num_validations", num_validations)?;
                let terminal_metadata: Vec<_> = terminals.iter().map(|e| &e.metadata).collect();
                map.serialize_entry("terminal_metadata", &terminal_metadata)?;
            }
            Self::ValidationError { record } => {
                map.serialize_entry("record", record)?;
            }
            Self::UnexpectedInference { .. } => {}
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Command, ImageRef};

    #[test]
    fn exit_code_follows_128_plus_signo_convention() {
        let err = CrucibleError::InferenceTerminated { signal: 15 };
        assert_eq!(err.exit_code(), Some(143));
    }

    #[test]
    fn non_signal_variants_have_no_exit_code() {
        assert_eq!(CrucibleError::NoBaseEnvironments.exit_code(), None);
    }

    #[test]
    fn json_shape_carries_kind_specific_fields() {
        let env = Environment::new(
            "root",
            ImageRef::new("python", "3.11-slim"),
            "/app",
            Command::new("python", ["/app/snippet.py"]),
        );
        let err = CrucibleError::NoWorkingEnvironment {
            elapsed_ms: 3_600_000,
            num_validations: 12,
            terminals: vec![env],
        };
        let value = crate::json::to_json(&err).expect("serializable");
        assert_eq!(value["name"], "NoWorkingEnvironment");
        assert_eq!(value["num_validations"], 12);
        assert!(value["terminal_metadata"].is_array());
    }
}
