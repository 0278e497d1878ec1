//! Level-order (breadth-first) mutation-tree traversal (§4.G).

use std::collections::VecDeque;

use crucible_core::{Environment, MutationRecord, Result, ValidationRecord};
use crucible_lang::Mutator;

use crate::coroutine::{SearchOutcome, SearchStep, SearchStrategy, TerminationReason};
use crate::registry::AdapterRegistry;

/// Breadth-first search over the mutation tree, `levels` deep
/// (default 10). Never inspects feedback: every reachable mutant is
/// yielded regardless of what earlier validations said.
pub struct LevelOrderSearch<'a> {
    adapters: &'a dyn AdapterRegistry,
    mutators: Vec<Box<dyn Mutator>>,
    levels: usize,
    level: usize,
    to_yield: VecDeque<Environment>,
    next_frontier: Vec<Environment>,
    last_yielded: Option<Environment>,
}

/// Default depth of the level-order search, per §4.G.
pub const DEFAULT_LEVELS: usize = 10;

impl<'a> LevelOrderSearch<'a> {
    /// Build a level-order search rooted at `root`, exploring up to
    /// `levels` mutation depths using `mutators` in order.
    #[must_use]
    pub fn new(root: Environment, levels: usize, adapters: &'a dyn AdapterRegistry, mutators: Vec<Box<dyn Mutator>>) -> Self {
        let mut to_yield = VecDeque::new();
        to_yield.push_back(root);
        Self {
            adapters,
            mutators,
            levels,
            level: 0,
            to_yield,
            next_frontier: Vec::new(),
            last_yielded: None,
        }
    }

    /// Build against the default mutator precedence (§4.F) and depth (§4.G).
    #[must_use]
    pub fn with_defaults(root: Environment, adapters: &'a dyn AdapterRegistry) -> Self {
        Self::new(root, DEFAULT_LEVELS, adapters, crucible_lang::precedence())
    }

    async fn expand_frontier(&mut self) -> Result<()> {
        let frontier = std::mem::take(&mut self.next_frontier);
        for env in &frontier {
            for dep_idx in 0..env.dependencies.len() {
                let dep = &env.dependencies[dep_idx];
                let adapter = self.adapters.adapter_for(dep.system);
                for mutator in &self.mutators {
                    if let Some(change) = mutator.apply(adapter, dep).await? {
                        let mut mutant = env.deep_clone();
                        mutant.dependencies[dep_idx].version = Some(change.to.clone());
                        mutant.record_mutation(MutationRecord {
                            kind: mutator.kind(),
                            dependency_index: dep_idx,
                            change,
                            bookkeeping: crucible_core::Bookkeeping::none(),
                        });
                        self.to_yield.push_back(mutant);
                    }
                }
            }
        }
        Ok(())
    }

    fn terminal(&self) -> Environment {
        self.last_yielded
            .clone()
            .or_else(|| self.next_frontier.first().cloned())
            .expect("a level-order search always yields its root at least once")
    }
}

#[async_trait::async_trait]
impl SearchStrategy for LevelOrderSearch<'_> {
    async fn advance(&mut self, _feedback: Option<ValidationRecord>) -> Result<SearchStep> {
        loop {
            if let Some(env) = self.to_yield.pop_front() {
                self.next_frontier.push(env.clone());
                self.last_yielded = Some(env.clone());
                return Ok(SearchStep::yielded(env));
            }

            if self.level + 1 >= self.levels || self.next_frontier.is_empty() {
                return Ok(SearchStep::done(SearchOutcome {
                    reason: TerminationReason::Exhausted,
                    fixed_validations: Vec::new(),
                    terminal: self.terminal(),
                }));
            }

            self.level += 1;
            self.expand_frontier().await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_adapters::PackageSystemAdapter;
    use crucible_core::{Command, Dependency, ImageRef, PackageSystem};

    struct FixedAdapter {
        versions: Vec<String>,
    }

    #[async_trait::async_trait]
    impl PackageSystemAdapter for FixedAdapter {
        fn system(&self) -> PackageSystem {
            PackageSystem::PyPi
        }
        fn normalize_name(&self, name: &str) -> String {
            name.to_ascii_lowercase()
        }
        async fn available_versions(&self, _normalized_name: &str) -> Result<Vec<String>> {
            Ok(self.versions.clone())
        }
        fn install_command(&self, dep: &Dependency) -> Command {
            Command::new("pip", ["install".to_string(), dep.to_string()])
        }
    }

    struct SingleAdapter(FixedAdapter);

    impl AdapterRegistry for SingleAdapter {
        fn adapter_for(&self, _system: PackageSystem) -> &dyn PackageSystemAdapter {
            &self.0
        }
    }

    fn root_env() -> Environment {
        let mut env = Environment::new(
            "root",
            ImageRef::new("python", "3.11-slim"),
            "/app",
            Command::new("python", ["/app/snippet.py"]),
        );
        env.dependencies
            .push(Dependency::new("scikit-learn", "0.20.3", PackageSystem::PyPi));
        env
    }

    #[tokio::test]
    async fn yields_root_first() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into(), "0.19.2".into()],
        });
        let mut search = LevelOrderSearch::with_defaults(root_env(), &adapters);
        match search.advance(None).await.unwrap() {
            SearchStep::Yield(env) => assert_eq!(env.dependencies[0].version.as_deref(), Some("0.20.3")),
            SearchStep::Done(_) => panic!("expected a yield"),
        }
    }

    #[tokio::test]
    async fn second_level_yields_mutated_version() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into(), "0.19.2".into()],
        });
        let mut search = LevelOrderSearch::with_defaults(root_env(), &adapters);
        search.advance(None).await.unwrap();
        match search.advance(None).await.unwrap() {
            SearchStep::Yield(env) => assert_eq!(env.dependencies[0].version.as_deref(), Some("0.19.2")),
            SearchStep::Done(_) => panic!("expected a second yield"),
        }
    }

    #[tokio::test]
    async fn terminates_when_no_further_mutations_exist() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into()],
        });
        let mut search = LevelOrderSearch::with_defaults(root_env(), &adapters);
        assert!(matches!(search.advance(None).await.unwrap(), SearchStep::Yield(_)));
        assert!(matches!(search.advance(None).await.unwrap(), SearchStep::Done(_)));
    }
}
