//! `InferenceArtifact`: the one intermediate representation every
//! emission format renders from, so format selection is a pure
//! rendering choice rather than a second data path through the
//! environment (§4.J).

use crucible_adapters::AdapterRegistry;
use crucible_core::{Command, Environment, ImageRef};

/// Everything a rendered recipe needs, extracted once from a resolved
/// [`Environment`].
#[derive(Debug, Clone)]
pub struct InferenceArtifact {
    pub base_image: ImageRef,
    pub work_dir: String,
    pub setup_commands: Vec<Command>,
    pub install_commands: Vec<Command>,
    pub entry_command: Command,
}

impl InferenceArtifact {
    /// Builds an artifact from a resolved environment, synthesizing one
    /// install command per dependency via the adapter for its package
    /// system (§4.A `install_command`).
    #[must_use]
    pub fn from_environment(env: &Environment, adapters: &dyn AdapterRegistry) -> Self {
        let install_commands = env
            .dependencies
            .iter()
            .map(|dep| adapters.adapter_for(dep.system).install_command(dep))
            .collect();

        Self {
            base_image: env.image.clone(),
            work_dir: env.work_dir.clone(),
            setup_commands: env.setup_commands.clone(),
            install_commands,
            entry_command: env.entry_cmd.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_adapters::StaticAdapterRegistry;
    use crucible_core::{Dependency, PackageSystem};
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

    #[test]
    fn synthesizes_one_install_command_per_dependency() {
        let mut env = Environment::new("root", ImageRef::new("python", "3.11-slim"), "/app", Command::new("python", ["/app/s.py"]));
        env.dependencies.push(Dependency::new("numpy", "1.26.0", PackageSystem::PyPi));
        let adapters = StaticAdapterRegistry::new().register(Arc::new(PipAdapter));

        let artifact = InferenceArtifact::from_environment(&env, &adapters);
        assert_eq!(artifact.install_commands.len(), 1);
        assert_eq!(artifact.install_commands[0].render(), "pip install numpy==1.26.0");
    }
}
