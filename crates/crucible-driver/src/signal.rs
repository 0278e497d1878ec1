//! Translates process signals into the `InferenceTerminated` error
//! (§4.H, §5, §7): "process signals for interrupt/terminate produce an
//! inference terminated structured error with a POSIX-style exit code
//! 128 + signo".

use crucible_core::CrucibleError;

#[cfg(unix)]
const SIGINT: i32 = 2;
#[cfg(unix)]
const SIGTERM: i32 = 15;

/// Resolves to an `InferenceTerminated` error the moment `SIGINT` or
/// `SIGTERM` arrives. Intended to be raced against the pump loop with
/// `tokio::select!`; never resolves on platforms without signal
/// support.
#[cfg(unix)]
pub async fn wait_for_termination() -> CrucibleError {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    let signal = tokio::select! {
        _ = sigint.recv() => SIGINT,
        _ = sigterm.recv() => SIGTERM,
    };
    CrucibleError::InferenceTerminated { signal }
}

#[cfg(not(unix))]
pub async fn wait_for_termination() -> CrucibleError {
    std::future::pending().await
}
