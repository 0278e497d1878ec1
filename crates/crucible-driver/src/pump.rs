//! The search pump (§4.H steps 4-7): drives a [`SearchStrategy`] to
//! completion, validating every yielded environment and feeding the
//! result back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crucible_adapters::AdapterRegistry;
use crucible_core::{CrucibleError, Environment, Result, ValidationRecord};
use crucible_sandbox::{ContainerRuntime, ValidatorDriver};
use crucible_search::{SearchStep, SearchStrategy};
use parking_lot::Mutex;
use tracing::{info, instrument};

/// What the pump loop produced when it found a working environment.
pub struct PumpSuccess {
    pub environment: Environment,
    pub num_validations: u64,
}

/// Wraps a per-root coroutine so its terminal environment is recorded
/// the moment it finishes, independent of whatever the spreading
/// wrapper ultimately surfaces — `SpreadingSearch::advance`'s `Done`
/// only carries the *last* root to finish (§4.G), but
/// `NoWorkingEnvironment` needs every root's terminal metadata (§7).
pub struct TerminalCapturingStrategy<'a> {
    inner: Box<dyn SearchStrategy + 'a>,
    slot: usize,
    terminals: Arc<Mutex<Vec<Option<Environment>>>>,
}

impl<'a> TerminalCapturingStrategy<'a> {
    #[must_use]
    pub fn new(inner: Box<dyn SearchStrategy + 'a>, slot: usize, terminals: Arc<Mutex<Vec<Option<Environment>>>>) -> Self {
        Self { inner, slot, terminals }
    }
}

#[async_trait::async_trait]
impl SearchStrategy for TerminalCapturingStrategy<'_> {
    async fn advance(&mut self, feedback: Option<ValidationRecord>) -> Result<SearchStep> {
        let step = self.inner.advance(feedback).await?;
        if let SearchStep::Done(outcome) = &step {
            self.terminals.lock()[self.slot] = Some(outcome.terminal.clone());
        }
        Ok(step)
    }
}

/// Drives `search` to a `Success` validation or exhaustion, running
/// each yielded candidate through `validator`. Failed validations are
/// accumulated (set-unioned by value equality, per §4.H step 5) and
/// fed back into the generator; on exhaustion, raises
/// `NoWorkingEnvironment` carrying every captured per-root terminal.
#[instrument(skip(search, validator, adapters, terminals, progress))]
pub async fn pump<R: ContainerRuntime>(
    mut search: Box<dyn SearchStrategy + '_>,
    validator: &ValidatorDriver<R>,
    adapters: &dyn AdapterRegistry,
    terminals: Arc<Mutex<Vec<Option<Environment>>>>,
    progress: Arc<AtomicU64>,
    started: Instant,
) -> Result<PumpSuccess> {
    let mut feedback: Option<ValidationRecord> = None;
    let mut num_validations: u64 = 0;
    let mut failed_validations: Vec<ValidationRecord> = Vec::new();

    loop {
        match search.advance(feedback.take()).await? {
            SearchStep::Yield(env) => {
                let record = validator.validate(&env, adapters).await?;
                num_validations += 1;
                progress.store(num_validations, Ordering::Relaxed);

                if record.status_code == crucible_core::ValidationStatus::Success {
                    info!(num_validations, elapsed_ms = started.elapsed().as_millis() as u64, "found a working environment");
                    return Ok(PumpSuccess {
                        environment: *env,
                        num_validations,
                    });
                }

                if !failed_validations.contains(&record) {
                    failed_validations.push(record.clone());
                }
                feedback = Some(record);
            }
            SearchStep::Done(outcome) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let mut collected: Vec<Environment> = terminals.lock().iter().filter_map(Clone::clone).collect();
                if collected.is_empty() {
                    collected.push(outcome.terminal);
                }
                info!(elapsed_ms, num_validations, reason = ?outcome.reason, "search exhausted without a working environment");
                return Err(CrucibleError::NoWorkingEnvironment {
                    elapsed_ms,
                    num_validations,
                    terminals: collected,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::{Command, ImageRef};
    use crucible_sandbox::{RunOutcome, RunSpec};
    use std::time::Duration;

    struct AlwaysSucceeds;
    #[async_trait::async_trait]
    impl ContainerRuntime for AlwaysSucceeds {
        async fn run(&self, _spec: RunSpec, _deadline: Duration) -> Result<RunOutcome> {
            let record = ValidationRecord {
                status_code: crucible_core::ValidationStatus::Success,
                dependencies: crucible_core::validation::DependencyInstallResult::default(),
                execution: Some(crucible_core::ExecutionResult {
                    status_code: crucible_core::ExecutionStatus::Success,
                    exception_name: None,
                    exception_message: None,
                    exception_line: None,
                    exception_file: None,
                    exception_stack: Vec::new(),
                }),
            };
            Ok(RunOutcome {
                stdout: sonic_rs::to_vec(&record).unwrap(),
                exit_code: Some(0),
                timed_out: false,
            })
        }
    }

    struct OneShotStrategy {
        env: Option<Environment>,
    }

    #[async_trait::async_trait]
    impl SearchStrategy for OneShotStrategy {
        async fn advance(&mut self, _feedback: Option<ValidationRecord>) -> Result<SearchStep> {
            match self.env.take() {
                Some(env) => Ok(SearchStep::yielded(env)),
                None => Ok(SearchStep::done(crucible_search::SearchOutcome {
                    reason: crucible_search::TerminationReason::Exhausted,
                    fixed_validations: Vec::new(),
                    terminal: Environment::new("root", ImageRef::new("python", "3.11-slim"), "/app", Command::new("python", ["/app/s.py"])),
                })),
            }
        }
    }

    #[tokio::test]
    async fn success_on_first_yield_returns_immediately() {
        let env = Environment::new("root", ImageRef::new("python", "3.11-slim"), "/app", Command::new("python", ["/app/s.py"]));
        let search = Box::new(OneShotStrategy { env: Some(env) });
        let runtime = AlwaysSucceeds;
        let mut images = std::collections::HashMap::new();
        images.insert("python".to_string(), "crucible-validator-python".to_string());
        let validator = ValidatorDriver::new(runtime, "/app", images, Duration::from_secs(30));
        let adapters = crucible_adapters::StaticAdapterRegistry::new();
        let terminals = Arc::new(Mutex::new(vec![None]));
        let progress = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let success = pump(search, &validator, &adapters, terminals, progress, Instant::now()).await.unwrap();
        assert_eq!(success.num_validations, 1);
    }
}
