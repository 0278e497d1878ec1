//! Iterative-deepening DFS over the mutation tree (§4.G).
//!
//! Used both as the standalone search strategy and, scoped to a single
//! dependency slot or armed with matrix-preferring mutators, as the
//! feedback-directed strategy's secondary generator.

use crucible_core::{Bookkeeping, Environment, MutationRecord, Result, ValidationRecord};
use crucible_lang::Mutator;

use crate::coroutine::{SearchOutcome, SearchStep, SearchStrategy, TerminationReason};
use crate::registry::AdapterRegistry;

struct StackEntry {
    dependency_index: usize,
    dep_pos: usize,
    mutator_index: usize,
    change: crucible_core::VersionChange,
}

/// Depth-first search that deepens one fixed depth at a time,
/// `d = 1, 2, …`, until either the yield budget is spent or a full
/// depth pass produces nothing new.
pub struct IddfsSearch<'a> {
    env: Environment,
    adapters: &'a dyn AdapterRegistry,
    mutators: Vec<Box<dyn Mutator>>,
    dependency_indices: Vec<usize>,
    budget: usize,
    yielded_count: usize,
    emitted_root: bool,
    d: usize,
    current_depth: usize,
    dep_pos: usize,
    mutator_index: usize,
    mutation_stack: Vec<StackEntry>,
    yielded_this_pass: bool,
}

impl<'a> IddfsSearch<'a> {
    /// Build an IDDFS over every dependency in `env`, yielding the
    /// root first.
    #[must_use]
    pub fn new(env: Environment, budget: usize, adapters: &'a dyn AdapterRegistry, mutators: Vec<Box<dyn Mutator>>) -> Self {
        let dependency_indices = (0..env.dependencies.len()).collect();
        Self::scoped(env, dependency_indices, budget, adapters, mutators, false)
    }

    /// Build a dependency-scoped IDDFS restricted to a single slot,
    /// used by the feedback-directed strategy when a dependency is
    /// blamed but has no version-matrix evidence (§4.G step 1). The
    /// current checkpoint environment is the root, so it is not
    /// re-yielded (the caller already validated it).
    #[must_use]
    pub fn dependency_scoped(env: Environment, slot: usize, budget: usize, adapters: &'a dyn AdapterRegistry, mutators: Vec<Box<dyn Mutator>>) -> Self {
        Self::scoped(env, vec![slot], budget, adapters, mutators, true)
    }

    /// Build a version-matrix-aware IDDFS over the whole environment,
    /// used when blame is unknown (§4.G step 2). `mutators` is
    /// expected to list matrix mutators ahead of the generic semver
    /// ones so matrix transitions are preferred.
    #[must_use]
    pub fn whole_environment(env: Environment, budget: usize, adapters: &'a dyn AdapterRegistry, mutators: Vec<Box<dyn Mutator>>) -> Self {
        let dependency_indices = (0..env.dependencies.len()).collect();
        Self::scoped(env, dependency_indices, budget, adapters, mutators, true)
    }

    fn scoped(
        env: Environment,
        dependency_indices: Vec<usize>,
        budget: usize,
        adapters: &'a dyn AdapterRegistry,
        mutators: Vec<Box<dyn Mutator>>,
        skip_root: bool,
    ) -> Self {
        Self {
            env,
            adapters,
            mutators,
            dependency_indices,
            budget,
            yielded_count: 0,
            emitted_root: skip_root,
            d: 1,
            current_depth: 0,
            dep_pos: 0,
            mutator_index: 0,
            mutation_stack: Vec::new(),
            yielded_this_pass: false,
        }
    }

    fn lateral_move(&mut self) {
        self.mutator_index += 1;
        if self.mutator_index >= self.mutators.len() {
            self.mutator_index = 0;
            self.dep_pos += 1;
        }
    }

    fn undo_top(&mut self) -> StackEntry {
        let entry = self.mutation_stack.pop().expect("caller checked non-empty");
        self.env.dependencies[entry.dependency_index] = crucible_lang::undo(&self.env.dependencies[entry.dependency_index], &entry.change);
        self.env.metadata.mutations.pop();
        self.current_depth -= 1;
        entry
    }
}

#[async_trait::async_trait]
impl SearchStrategy for IddfsSearch<'_> {
    async fn advance(&mut self, _feedback: Option<ValidationRecord>) -> Result<SearchStep> {
        if !self.emitted_root {
            self.emitted_root = true;
            self.yielded_count += 1;
            return Ok(SearchStep::yielded(self.env.clone()));
        }

        loop {
            if self.yielded_count >= self.budget {
                return Ok(SearchStep::done(SearchOutcome {
                    reason: TerminationReason::Exhausted,
                    fixed_validations: Vec::new(),
                    terminal: self.env.clone(),
                }));
            }

            loop {
                if self.current_depth >= self.d {
                    break;
                }

                if self.dep_pos >= self.dependency_indices.len() {
                    if self.mutation_stack.is_empty() {
                        break;
                    }
                    let entry = self.undo_top();
                    self.dep_pos = entry.dep_pos;
                    self.mutator_index = entry.mutator_index;
                    self.lateral_move();
                    continue;
                }

                let dependency_index = self.dependency_indices[self.dep_pos];
                let dep = self.env.dependencies[dependency_index].clone();
                let adapter = self.adapters.adapter_for(dep.system);
                let mutator = &self.mutators[self.mutator_index];
                let applied = mutator.apply(adapter, &dep).await?;

                match applied {
                    Some(change) => {
                        let kind = mutator.kind();
                        self.env.dependencies[dependency_index].version = Some(change.to.clone());
                        self.mutation_stack.push(StackEntry {
                            dependency_index,
                            dep_pos: self.dep_pos,
                            mutator_index: self.mutator_index,
                            change: change.clone(),
                        });
                        self.env.record_mutation(MutationRecord {
                            kind,
                            dependency_index,
                            change,
                            bookkeeping: Bookkeeping::none(),
                        });
                        self.current_depth += 1;

                        if self.current_depth == self.d {
                            self.yielded_count += 1;
                            self.yielded_this_pass = true;
                            let snapshot = self.env.clone();
                            let entry = self.undo_top();
                            self.dep_pos = entry.dep_pos;
                            self.mutator_index = entry.mutator_index;
                            self.lateral_move();
                            return Ok(SearchStep::yielded(snapshot));
                        }
                    }
                    None => self.lateral_move(),
                }
            }

            if !self.yielded_this_pass {
                return Ok(SearchStep::done(SearchOutcome {
                    reason: TerminationReason::Exhausted,
                    fixed_validations: Vec::new(),
                    terminal: self.env.clone(),
                }));
            }

            self.d += 1;
            self.yielded_this_pass = false;
            self.current_depth = 0;
            self.dep_pos = 0;
            self.mutator_index = 0;
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
    async fn yields_root_before_any_mutation() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into(), "0.19.2".into()],
        });
        let mut search = IddfsSearch::new(root_env(), 10, &adapters, crucible_lang::precedence());
        match search.advance(None).await.unwrap() {
            SearchStep::Yield(env) => assert_eq!(env.dependencies[0].version.as_deref(), Some("0.20.3")),
            SearchStep::Done(_) => panic!("expected the root"),
        }
    }

    #[tokio::test]
    async fn depth_one_yields_a_single_mutant_and_restores_state_for_next_lateral_move() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into(), "0.19.2".into(), "0.19.0".into()],
        });
        let mut search = IddfsSearch::new(root_env(), 10, &adapters, crucible_lang::precedence());
        search.advance(None).await.unwrap(); // root
        let mutant = match search.advance(None).await.unwrap() {
            SearchStep::Yield(env) => *env,
            SearchStep::Done(_) => panic!("expected a depth-1 mutant"),
        };
        assert_eq!(mutant.dependencies[0].version.as_deref(), Some("0.19.2"));
        assert_eq!(mutant.metadata.mutations.len(), 1);
        // the working environment's own mutation stack is restored
        // (undone) in preparation for the next lateral move.
        assert_eq!(search.env.metadata.mutations.len(), 0);
        assert_eq!(search.env.dependencies[0].version.as_deref(), Some("0.20.3"));
    }

    #[tokio::test]
    async fn terminates_after_a_dry_depth_pass() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into()],
        });
        let mut search = IddfsSearch::new(root_env(), 10, &adapters, crucible_lang::precedence());
        assert!(matches!(search.advance(None).await.unwrap(), SearchStep::Yield(_))); // root
        assert!(matches!(search.advance(None).await.unwrap(), SearchStep::Done(_)));
    }

    #[tokio::test]
    async fn nested_iddfs_skips_re_yielding_the_root() {
        let adapters = SingleAdapter(FixedAdapter {
            versions: vec!["0.20.3".into(), "0.19.2".into()],
        });
        let mut search = IddfsSearch::dependency_scoped(root_env(), 0, 10, &adapters, crucible_lang::precedence());
        match search.advance(None).await.unwrap() {
            SearchStep::Yield(env) => assert_eq!(env.dependencies[0].version.as_deref(), Some("0.19.2")),
            SearchStep::Done(_) => panic!("expected the first mutant directly"),
        }
    }
}
