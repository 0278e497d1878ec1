//! Feedback-directed DFS (§4.G) — the primary search strategy. Fixes
//! one execution exception at a time, blaming a single dependency
//! under §4.E and preferring recorded version-matrix evidence (§4.B
//! query 4) over blind semver decrements.

use crucible_core::{Bookkeeping, Environment, MutationKind, MutationRecord, Result, ValidationRecord, ValidationStatus};
use crucible_graph::GraphResolver;
use crucible_lang::{Blame, LanguageStrategy, Which};

use crate::coroutine::{SearchOutcome, SearchStep, SearchStrategy, TerminationReason};
use crate::iddfs::IddfsSearch;
use crate::matrix::{plan_matrix_chain, MatrixMutator};
use crate::registry::AdapterRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    AwaitingRootValidation,
    AwaitingIterationValidation,
}

/// The primary search strategy: iteratively mutates the dependency
/// blamed for the current "checkpoint" exception, confirming fixes by
/// comparing which exception now executes first.
pub struct FeedbackDirectedSearch<'a> {
    env: Environment,
    checkpoint: Option<ValidationRecord>,
    strategy: &'a dyn LanguageStrategy,
    graph: &'a GraphResolver,
    adapters: &'a dyn AdapterRegistry,
    budget: usize,
    yielded_count: usize,
    secondary: Option<Box<dyn SearchStrategy + 'a>>,
    phase: Phase,
}

impl<'a> FeedbackDirectedSearch<'a> {
    /// Build a feedback-directed search rooted at `root`, with a
    /// per-root yield budget of `budget`.
    #[must_use]
    pub fn new(root: Environment, budget: usize, strategy: &'a dyn LanguageStrategy, graph: &'a GraphResolver, adapters: &'a dyn AdapterRegistry) -> Self {
        Self {
            env: root,
            checkpoint: None,
            strategy,
            graph,
            adapters,
            budget,
            yielded_count: 0,
            secondary: None,
            phase: Phase::NotStarted,
        }
    }

    fn check_early_termination(&self) -> Option<TerminationReason> {
        let checkpoint = self.checkpoint.as_ref()?;
        if matches!(checkpoint.status_code, ValidationStatus::Timeout) {
            return Some(TerminationReason::Timeout);
        }
        if checkpoint.execution.is_none() || matches!(checkpoint.status_code, ValidationStatus::UnknownException) {
            return Some(TerminationReason::UnknownException);
        }
        if !self.strategy.is_repairable_version_error(&self.env, checkpoint) {
            return Some(TerminationReason::NotRepairable);
        }
        None
    }

    fn terminal_outcome(&self, reason: TerminationReason) -> SearchOutcome {
        SearchOutcome {
            reason,
            fixed_validations: self.env.metadata.fixed_validations.clone(),
            terminal: self.env.clone(),
        }
    }

    async fn ensure_matrix_queried(&mut self, dependency_index: usize) -> Result<()> {
        let already_queried = self
            .env
            .metadata
            .dependency_feedback
            .get(&dependency_index)
            .is_some_and(|fb| fb.matrix_queried);
        if already_queried {
            return Ok(());
        }

        let dep = self.env.dependencies[dependency_index].clone();
        let mut chain = Vec::new();
        if let Some(version) = dep.version.as_deref() {
            let adapter = self.adapters.adapter_for(dep.system);
            let normalized = adapter.normalize_name(&dep.name);
            let evidence = self.graph.upgrade_evidence(&normalized, dep.system).await?;
            if !evidence.is_empty() {
                chain = plan_matrix_chain(adapter, &dep.name, version, &evidence);
            }
        }

        let feedback = self.env.metadata.dependency_feedback.entry(dependency_index).or_default();
        feedback.matrix_queried = true;
        feedback.matrix_queue = chain;
        Ok(())
    }

    async fn build_whole_environment_mutators(&self) -> Result<Vec<Box<dyn crucible_lang::Mutator>>> {
        let mut matrix = MatrixMutator::new();
        for dep in &self.env.dependencies {
            let Some(version) = dep.version.as_deref() else {
                continue;
            };
            let adapter = self.adapters.adapter_for(dep.system);
            let normalized = adapter.normalize_name(&dep.name);
            let evidence = self.graph.upgrade_evidence(&normalized, dep.system).await?;
            if evidence.is_empty() {
                continue;
            }
            let chain = plan_matrix_chain(adapter, &dep.name, version, &evidence);
            if !chain.is_empty() {
                matrix.set_chain(dep.name.clone(), chain);
            }
        }
        let mut mutators: Vec<Box<dyn crucible_lang::Mutator>> = vec![Box::new(matrix)];
        mutators.extend(crucible_lang::precedence());
        Ok(mutators)
    }

    async fn next_iteration_or_done(&mut self) -> Result<SearchStep> {
        if self.yielded_count >= self.budget {
            return Ok(SearchStep::done(self.terminal_outcome(TerminationReason::Exhausted)));
        }
        self.run_iteration().await
    }

    /// One iteration of §4.G's numbered steps 1-3: mutate the blamed
    /// dependency (or fall back to a nested IDDFS), append the
    /// checkpoint optimistically, and yield.
    async fn run_iteration(&mut self) -> Result<SearchStep> {
        let checkpoint = self.checkpoint.clone().expect("checkpoint set before the first iteration");
        let blame = self.strategy.dependency_producing_exception(&self.env, &checkpoint);

        match blame {
            Blame::Dependency(idx) => {
                self.ensure_matrix_queried(idx).await?;
                let queued = self
                    .env
                    .metadata
                    .dependency_feedback
                    .get_mut(&idx)
                    .filter(|fb| !fb.matrix_queue.is_empty())
                    .map(|fb| fb.matrix_queue.remove(0));

                if let Some(change) = queued {
                    self.env.dependencies[idx].version = Some(change.to.clone());
                    self.env.record_mutation(MutationRecord {
                        kind: MutationKind::VersionMatrixFromVersion,
                        dependency_index: idx,
                        change,
                        bookkeeping: Bookkeeping::none(),
                    });
                } else {
                    if self.secondary.is_none() {
                        self.secondary = Some(Box::new(IddfsSearch::dependency_scoped(
                            self.env.clone(),
                            idx,
                            usize::MAX,
                            self.adapters,
                            crucible_lang::precedence(),
                        )));
                    }
                    match self.secondary.as_mut().expect("just set").advance(None).await? {
                        SearchStep::Yield(sub_env) => self.env = *sub_env,
                        SearchStep::Done(outcome) => {
                            return Ok(SearchStep::done(SearchOutcome {
                                reason: TerminationReason::Exhausted,
                                fixed_validations: self.env.metadata.fixed_validations.clone(),
                                terminal: outcome.terminal,
                            }));
                        }
                    }
                }
            }
            Blame::Unknown => {
                if self.secondary.is_none() {
                    let mutators = self.build_whole_environment_mutators().await?;
                    self.secondary = Some(Box::new(IddfsSearch::whole_environment(self.env.clone(), usize::MAX, self.adapters, mutators)));
                }
                match self.secondary.as_mut().expect("just set").advance(None).await? {
                    SearchStep::Yield(sub_env) => self.env = *sub_env,
                    SearchStep::Done(outcome) => {
                        return Ok(SearchStep::done(SearchOutcome {
                            reason: TerminationReason::Exhausted,
                            fixed_validations: self.env.metadata.fixed_validations.clone(),
                            terminal: outcome.terminal,
                        }));
                    }
                }
            }
        }

        self.env.metadata.fixed_validations.push(checkpoint);
        self.yielded_count += 1;
        self.phase = Phase::AwaitingIterationValidation;
        Ok(SearchStep::yielded(self.env.clone()))
    }
}

#[async_trait::async_trait]
impl SearchStrategy for FeedbackDirectedSearch<'_> {
    async fn advance(&mut self, feedback: Option<ValidationRecord>) -> Result<SearchStep> {
        match self.phase {
            Phase::NotStarted => {
                self.phase = Phase::AwaitingRootValidation;
                Ok(SearchStep::yielded(self.env.clone()))
            }
            Phase::AwaitingRootValidation => {
                self.checkpoint = Some(feedback.unwrap_or_else(ValidationRecord::timeout));
                if let Some(reason) = self.check_early_termination() {
                    return Ok(SearchStep::done(self.terminal_outcome(reason)));
                }
                self.next_iteration_or_done().await
            }
            Phase::AwaitingIterationValidation => {
                let new_validation = feedback.unwrap_or_else(ValidationRecord::timeout);
                let checkpoint = self.checkpoint.clone().expect("checkpoint set before first iteration");
                self.env.metadata.fixed_validations.pop();

                if new_validation == checkpoint {
                    return self.next_iteration_or_done().await;
                }

                if matches!(new_validation.status_code, ValidationStatus::Timeout) {
                    return Ok(SearchStep::done(self.terminal_outcome(TerminationReason::Timeout)));
                }
                if new_validation.execution.is_none() || matches!(new_validation.status_code, ValidationStatus::UnknownException) {
                    return Ok(SearchStep::done(self.terminal_outcome(TerminationReason::UnknownException)));
                }

                match self.strategy.first_execution_exception(&checkpoint, &new_validation) {
                    Which::First => {
                        self.env.metadata.fixed_validations.push(checkpoint);
                        self.checkpoint = Some(new_validation);
                        self.env.metadata.dependency_feedback.clear();
                        self.secondary = None;
                        if let Some(reason) = self.check_early_termination() {
                            return Ok(SearchStep::done(self.terminal_outcome(reason)));
                        }
                        self.next_iteration_or_done().await
                    }
                    Which::Second | Which::Sentinel => self.next_iteration_or_done().await,
                }
            }
        }
    }
}
