//! The artifact emitter (§4.J): given a successful [`InferenceReport`],
//! renders one of three output shapes selected by `--format`:
//!
//! - a Dockerfile-shaped container recipe;
//! - the install-command list, one command per line;
//! - the full inference report as pretty-printed JSON.
//!
//! [`ir::InferenceArtifact`] is the one intermediate representation
//! every format renders from, so adding a fourth format is a new
//! `render_*` function, never a second pass over the `Environment`.

#![warn(clippy::all)]

pub mod format;
pub mod ir;
pub mod render;

pub use format::EmitFormat;
pub use ir::InferenceArtifact;
pub use render::{render_dockerfile, render_install_commands, render_metadata};

use crucible_adapters::AdapterRegistry;
use crucible_core::Result;
use crucible_driver::InferenceReport;

/// Renders `report` in the requested format, building the
/// [`InferenceArtifact`] from its environment when the format needs
/// one (everything but `Metadata`, which renders the report directly).
///
/// # Errors
/// Returns an error if the report fails to serialize to JSON.
pub fn emit(report: &InferenceReport, format: EmitFormat, adapters: &dyn AdapterRegistry) -> Result<String> {
    match format {
        EmitFormat::Dockerfile => {
            let artifact = InferenceArtifact::from_environment(&report.environment, adapters);
            Ok(render_dockerfile(&artifact))
        }
        EmitFormat::InstallCommands => {
            let artifact = InferenceArtifact::from_environment(&report.environment, adapters);
            Ok(render_install_commands(&artifact).join("\n"))
        }
        EmitFormat::Metadata => render_metadata(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_adapters::StaticAdapterRegistry;
    use crucible_core::{Command, Dependency, Environment, ImageRef, PackageSystem};
    use std::sync::Arc;

    struct PipAdapter;
    #[async_trait::async_trait]
    impl crucible_adapters::PackageSystemAdapter for PipAdapter {
        fn system(&self) -> PackageSystem {
            PackageSystem::PyPi
        }
        fn normalize_name(&self, name: &str) -> String {
            name.to_string()
        }
        async fn available_versions(&self, _normalized_name: &str) -> crucible_core::Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn install_command(&self, dep: &Dependency) -> Command {
            Command::new("pip", ["install".to_string(), format!("{}=={}", dep.name, dep.version.as_deref().unwrap_or("latest"))])
        }
    }

    fn report() -> InferenceReport {
        let mut env = Environment::new("root", ImageRef::new("python", "3.11-slim"), "/app", Command::new("python", ["/app/snippet.py"]));
        env.dependencies.push(Dependency::new("numpy", "1.26.0", PackageSystem::PyPi));
        InferenceReport {
            run_id: "20260101T000000.000-1".to_string(),
            environment: env,
            num_validations: 1,
            elapsed_ms: 250,
        }
    }

    fn adapters() -> StaticAdapterRegistry {
        StaticAdapterRegistry::new().register(Arc::new(PipAdapter))
    }

    #[test]
    fn emits_dockerfile() {
        let out = emit(&report(), EmitFormat::Dockerfile, &adapters()).unwrap();
        assert!(out.starts_with("FROM python:3.11-slim"));
        assert!(out.contains("RUN pip install numpy==1.26.0"));
    }

    #[test]
    fn emits_install_commands() {
        let out = emit(&report(), EmitFormat::InstallCommands, &adapters()).unwrap();
        assert_eq!(out, "pip install numpy==1.26.0");
    }

    #[test]
    fn emits_metadata_json() {
        let out = emit(&report(), EmitFormat::Metadata, &adapters()).unwrap();
        assert!(out.contains("\"run_id\""));
        assert!(out.contains("\"elapsed_ms\""));
    }
}
