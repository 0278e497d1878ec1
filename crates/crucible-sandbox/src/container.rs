//! Container lifecycle for one sandbox invocation (§4.C/§4.D): create,
//! start, stream bounded stdout, wait with a deadline, remove — on
//! every exit path.
//!
//! Driven through the Docker Engine API (`bollard`) rather than
//! shelling out to the `docker` CLI, for structured error reporting
//! and so the 10 MiB stdout ceiling (§5) is enforced by this code
//! directly instead of relying on pipe buffering semantics.

use std::time::Duration;

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    WaitContainerOptions,
};
use bollard::service::HostConfig;
use bollard::Docker;
use crucible_core::{CrucibleError, Result};
use futures_util::StreamExt;
use tracing::warn;

/// Hard ceiling on captured stdout per sandbox invocation (§5).
pub const MAX_STDOUT_BYTES: usize = 10 * 1024 * 1024;

/// One container invocation to run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Image to run.
    pub image: String,
    /// Full argv, with `image`'s entrypoint implied.
    pub cmd: Vec<String>,
    /// Bind mounts, each `host:container[:ro]`.
    pub binds: Vec<String>,
    /// Working directory inside the container, if not the image default.
    pub work_dir: Option<String>,
}

/// Outcome of a bounded container run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Combined stdout/stderr captured from the primary output channel.
    pub stdout: Vec<u8>,
    /// Process exit code, if the container ran to completion.
    pub exit_code: Option<i64>,
    /// Whether the deadline fired before the container exited.
    pub timed_out: bool,
}

/// Abstraction over "run a container to completion or deadline",
/// implemented by [`ContainerRunner`] against a real Docker daemon and
/// by scripted in-process fakes in each crate's own test modules for
/// fast unit tests without a Docker daemon.
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Run `spec` to completion or until `deadline` elapses.
    async fn run(&self, spec: RunSpec, deadline: Duration) -> Result<RunOutcome>;
}

/// Runs sandbox containers against a local Docker daemon. Cheaply
/// cloneable: `bollard::Docker` wraps its transport in an `Arc`, so
/// the parse and validator drivers can each hold their own handle to
/// the same daemon connection.
#[derive(Clone)]
pub struct ContainerRunner {
    docker: Docker,
}

impl ContainerRunner {
    /// Connect to the local Docker daemon using its default
    /// environment-derived transport (Unix socket on Linux/macOS,
    /// named pipe on Windows).
    ///
    /// # Errors
    /// Returns an error if the daemon socket cannot be reached.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| sandbox_error("connect to docker daemon", e))?;
        Ok(Self { docker })
    }

    /// The underlying Docker Engine API client, for callers that need
    /// operations outside [`ContainerRuntime::run`] (image build/push,
    /// used by the `build`/`push` CLI verbs via [`crate::images`]).
    #[must_use]
    pub const fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Run `spec` to completion, or until `deadline` elapses. The
    /// container is removed on every exit path: success, sandbox
    /// error, stdout overflow, or timeout.
    ///
    /// # Errors
    /// Returns an error if the container cannot be created/started, or
    /// if captured output exceeds [`MAX_STDOUT_BYTES`] (a fatal error
    /// per §5, distinct from the caller-visible `Timeout` outcome).
    pub async fn run(&self, spec: RunSpec, deadline: Duration) -> Result<RunOutcome> {
        let container_name = format!("crucible-sandbox-{}", uuid_like());
        let host_config = HostConfig {
            binds: Some(spec.binds.clone()),
            auto_remove: Some(false),
            ..Default::default()
        };
        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.cmd.clone()),
            working_dir: spec.work_dir.clone(),
            host_config: Some(host_config),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: container_name.clone(),
            platform: None,
        };
        let created = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .map_err(|e| sandbox_error("create container", e))?;
        let id = created.id;

        let result = self.run_created(&id, deadline).await;

        if let Err(e) = self
            .docker
            .remove_container(&id, Some(RemoveContainerOptions { force: true, ..Default::default() }))
            .await
        {
            warn!(container = %id, error = %e, "failed to remove sandbox container");
        }

        result
    }

    async fn run_created(&self, id: &str, deadline: Duration) -> Result<RunOutcome> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .map_err(|e| sandbox_error("start container", e))?;

        let logs_options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        let mut log_stream = self.docker.logs(id, Some(logs_options));
        let mut stdout = Vec::new();

        let wait_options = WaitContainerOptions {
            condition: "not-running".to_string(),
        };
        let mut wait_stream = self.docker.wait_container(id, Some(wait_options));

        let outcome = tokio::time::timeout(deadline, async {
            loop {
                tokio::select! {
                    chunk = log_stream.next() => {
                        match chunk {
                            Some(Ok(output)) => {
                                append_bounded(&mut stdout, output)?;
                            }
                            Some(Err(e)) => return Err(sandbox_error("stream container logs", e)),
                            None => {}
                        }
                    }
                    result = wait_stream.next() => {
                        match result {
                            Some(Ok(status)) => return Ok(status.status_code),
                            Some(Err(e)) => return Err(sandbox_error("wait for container", e)),
                            None => return Ok(0),
                        }
                    }
                }
            }
        })
        .await;

        match outcome {
            Ok(Ok(exit_code)) => Ok(RunOutcome {
                stdout,
                exit_code: Some(exit_code),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(RunOutcome {
                stdout,
                exit_code: None,
                timed_out: true,
            }),
        }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for ContainerRunner {
    async fn run(&self, spec: RunSpec, deadline: Duration) -> Result<RunOutcome> {
        Self::run(self, spec, deadline).await
    }
}

fn append_bounded(stdout: &mut Vec<u8>, output: LogOutput) -> Result<()> {
    let bytes = output.into_bytes();
    if stdout.len() + bytes.len() > MAX_STDOUT_BYTES {
        return Err(CrucibleError::UnexpectedInference {
            message: format!("sandbox stdout exceeded the {MAX_STDOUT_BYTES}-byte ceiling"),
        });
    }
    stdout.extend_from_slice(&bytes);
    Ok(())
}

fn sandbox_error(context: &str, cause: impl std::fmt::Display) -> CrucibleError {
    CrucibleError::UnexpectedInference {
        message: format!("{context}: {cause}"),
    }
}

/// A container-name-safe unique suffix, without pulling in a UUID
/// dependency for something this disposable.
fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    format!("{pid}-{n}")
}
