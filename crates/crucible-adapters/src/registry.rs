//! Resolving a [`PackageSystem`] to the adapter that serves it.
//!
//! Lives here rather than in a caller crate because every consumer of
//! an adapter registry (`crucible-search`, `crucible-sandbox`,
//! `crucible-driver`) needs the exact same seam: "give me the adapter
//! for this dependency's package system" without knowing how adapters
//! were constructed or wired to their HTTP clients/caches.

use std::collections::HashMap;
use std::sync::Arc;

use crucible_core::PackageSystem;

use crate::adapter::PackageSystemAdapter;

/// A read-only view over the adapters available to a caller.
pub trait AdapterRegistry: Send + Sync {
    /// The adapter serving `system`. Panics if the caller configured a
    /// dependency with a system that has no registered adapter — this
    /// is a configuration error, not a runtime condition a caller can
    /// recover from.
    fn adapter_for(&self, system: PackageSystem) -> &dyn PackageSystemAdapter;
}

/// A simple map-backed [`AdapterRegistry`], built once at process
/// start and shared (via `Arc`) across the resolver, search
/// strategies, and sandbox drivers.
#[derive(Clone, Default)]
pub struct StaticAdapterRegistry {
    adapters: HashMap<PackageSystem, Arc<dyn PackageSystemAdapter>>,
}

impl StaticAdapterRegistry {
    /// An empty registry; register adapters with [`Self::register`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` for the system it reports via
    /// [`PackageSystemAdapter::system`].
    #[must_use]
    pub fn register(mut self, adapter: Arc<dyn PackageSystemAdapter>) -> Self {
        self.adapters.insert(adapter.system(), adapter);
        self
    }
}

impl AdapterRegistry for StaticAdapterRegistry {
    fn adapter_for(&self, system: PackageSystem) -> &dyn PackageSystemAdapter {
        self.adapters
            .get(&system)
            .map(std::convert::AsRef::as_ref)
            .unwrap_or_else(|| panic!("no adapter registered for package system {system}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::{Command, Dependency, Result};

    struct StubAdapter(PackageSystem);

    #[async_trait::async_trait]
    impl PackageSystemAdapter for StubAdapter {
        fn system(&self) -> PackageSystem {
            self.0
        }
        fn normalize_name(&self, name: &str) -> String {
            name.to_string()
        }
        async fn available_versions(&self, _normalized_name: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn install_command(&self, dep: &Dependency) -> Command {
            Command::new("noop", [dep.name.clone()])
        }
    }

    #[test]
    fn resolves_the_registered_adapter_for_its_own_system() {
        let registry = StaticAdapterRegistry::new()
            .register(Arc::new(StubAdapter(PackageSystem::PyPi)))
            .register(Arc::new(StubAdapter(PackageSystem::Apt)));
        assert_eq!(registry.adapter_for(PackageSystem::PyPi).system(), PackageSystem::PyPi);
        assert_eq!(registry.adapter_for(PackageSystem::Apt).system(), PackageSystem::Apt);
    }

    #[test]
    #[should_panic(expected = "no adapter registered")]
    fn panics_on_unregistered_system() {
        let registry = StaticAdapterRegistry::new();
        registry.adapter_for(PackageSystem::Apt);
    }
}
