//! Structured JSON error output (§6: "on any failure, the process
//! writes one JSON object to stderr ... then exits non-zero").
//!
//! Every internal failure surfaces as a [`CrucibleError`], whose
//! `Serialize` impl already produces the stable `name`/`message`/
//! `stack` shape plus kind-specific fields. Anything that reaches the
//! CLI boundary as a bare `anyhow::Error` (config loading, I/O before
//! the pipeline starts) is wrapped in an `UnexpectedInference`-shaped
//! envelope so the wire format never forks.

use std::sync::atomic::{AtomicBool, Ordering};

use crucible_core::CrucibleError;
use serde::Serialize;

static JSON_OUTPUT: AtomicBool = AtomicBool::new(false);

pub fn enable() {
    JSON_OUTPUT.store(true, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    JSON_OUTPUT.load(Ordering::Relaxed)
}

#[derive(Debug, Serialize)]
struct GenericError {
    name: &'static str,
    message: String,
    stack: Vec<String>,
}

fn to_json_value(err: &anyhow::Error) -> serde_json::Value {
    if let Some(crucible_err) = err.downcast_ref::<CrucibleError>() {
        return serde_json::to_value(crucible_err).unwrap_or_else(|_| serde_json::json!({"name": "UnexpectedInference", "message": crucible_err.to_string()}));
    }

    let stack = err.chain().skip(1).map(std::string::ToString::to_string).collect();
    serde_json::to_value(GenericError {
        name: "UnexpectedInference",
        message: err.to_string(),
        stack,
    })
    .unwrap_or_else(|_| serde_json::json!({"name": "UnexpectedInference", "message": err.to_string()}))
}

/// Print `err` per §6: a human-readable line to stderr in text mode,
/// then the JSON diagnostic document, always to stderr.
pub fn print_error(err: &anyhow::Error) {
    if !is_enabled() {
        super::error(&err.to_string());
    }
    let value = to_json_value(err);
    match serde_json::to_string_pretty(&value) {
        Ok(text) => eprintln!("{text}"),
        Err(_) => eprintln!(r#"{{"name":"UnexpectedInference","message":"failed to serialize error"}}"#),
    }
}

/// The process exit code for `err`: `CrucibleError::exit_code()` when
/// the failure carries a POSIX signal, a fixed non-zero code otherwise.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CrucibleError>().and_then(CrucibleError::exit_code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crucible_error_round_trips_through_json_value() {
        let err = anyhow::Error::new(CrucibleError::NoBaseEnvironments);
        let value = to_json_value(&err);
        assert_eq!(value["name"], "NoBaseEnvironments");
    }

    #[test]
    fn signal_termination_reports_128_plus_signo_exit_code() {
        let err = anyhow::Error::new(CrucibleError::InferenceTerminated { signal: 2 });
        assert_eq!(exit_code_for(&err), 130);
    }

    #[test]
    fn generic_anyhow_error_wraps_as_unexpected_inference() {
        let err = anyhow::anyhow!("could not read config file");
        let value = to_json_value(&err);
        assert_eq!(value["name"], "UnexpectedInference");
        assert_eq!(exit_code_for(&err), 1);
    }
}
