//! The packaging-system sandbox contract (§6): "takes a package name
//! as a single argument; emits a JSON array of version strings."
//!
//! This is the container-driven implementation of
//! `crucible_adapters::PackagingSandbox`, used by
//! [`crucible_adapters::OsAptAdapter`] for version discovery.

use std::time::Duration;

use crucible_adapters::PackagingSandbox;
use crucible_core::json::from_json_slice;
use crucible_core::{CrucibleError, Result};

use crate::container::{ContainerRuntime, RunSpec};

/// Runs the packaging-system sandbox image through a
/// [`ContainerRuntime`] for each version query.
pub struct ContainerPackagingSandbox<R> {
    runtime: R,
    image: String,
    deadline: Duration,
}

impl<R: ContainerRuntime> ContainerPackagingSandbox<R> {
    /// Build a sandbox driver that runs `image` for every version
    /// lookup, giving each invocation up to `deadline`.
    #[must_use]
    pub fn new(runtime: R, image: impl Into<String>, deadline: Duration) -> Self {
        Self {
            runtime,
            image: image.into(),
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<R: ContainerRuntime> PackagingSandbox for ContainerPackagingSandbox<R> {
    async fn query_versions(&self, normalized_name: &str) -> Result<Vec<String>> {
        let spec = RunSpec {
            image: self.image.clone(),
            cmd: vec![normalized_name.to_string()],
            binds: Vec::new(),
            work_dir: None,
        };
        let outcome = self.runtime.run(spec, self.deadline).await?;
        if outcome.timed_out {
            return Err(CrucibleError::UnexpectedInference {
                message: format!("packaging sandbox timed out querying {normalized_name}"),
            });
        }
        from_json_slice(&outcome.stdout).map_err(|_| CrucibleError::UnexpectedInference {
            message: format!("malformed packaging sandbox output for {normalized_name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RunOutcome;

    struct FixedRuntime {
        stdout: Vec<u8>,
        timed_out: bool,
    }

    #[async_trait::async_trait]
    impl ContainerRuntime for FixedRuntime {
        async fn run(&self, _spec: RunSpec, _deadline: Duration) -> Result<RunOutcome> {
            Ok(RunOutcome {
                stdout: self.stdout.clone(),
                exit_code: Some(0),
                timed_out: self.timed_out,
            })
        }
    }

    #[tokio::test]
    async fn parses_version_array() {
        let runtime = FixedRuntime {
            stdout: br#"["1.21.0-1ubuntu2", "1.22.0-1"]"#.to_vec(),
            timed_out: false,
        };
        let sandbox = ContainerPackagingSandbox::new(runtime, "crucible-packaging-apt:latest", Duration::from_secs(30));
        let versions = sandbox.query_versions("libpq-dev").await.unwrap();
        assert_eq!(versions, vec!["1.21.0-1ubuntu2".to_string(), "1.22.0-1".to_string()]);
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let runtime = FixedRuntime {
            stdout: Vec::new(),
            timed_out: true,
        };
        let sandbox = ContainerPackagingSandbox::new(runtime, "crucible-packaging-apt:latest", Duration::from_secs(30));
        assert!(sandbox.query_versions("libpq-dev").await.is_err());
    }
}
