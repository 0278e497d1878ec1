//! The spreading wrapper (§4.G): runs one coroutine per starting
//! environment, dividing the overall budget evenly and interleaving
//! them round-robin.
//!
//! On each turn it advances one coroutine — passing the validation
//! that resulted from *that coroutine's own* previous yield, never a
//! validation meant for a different one — yields its next environment,
//! then rotates it to the back of the queue. A coroutine that
//! completes is dropped and its terminal metadata collected; the
//! wrapper itself is done once every root's coroutine has finished.

use std::collections::VecDeque;

use crucible_core::{Result, ValidationRecord};

use crate::coroutine::{SearchOutcome, SearchStep, SearchStrategy};

/// Round-robins a fixed set of per-root coroutines, dividing `n` into
/// `ceil(n / roots.len())` per root.
pub struct SpreadingSearch<'a> {
    coroutines: Vec<Box<dyn SearchStrategy + 'a>>,
    queue: VecDeque<usize>,
    pending: Vec<Option<ValidationRecord>>,
    last_yielded_idx: Option<usize>,
    outcomes: Vec<SearchOutcome>,
}

impl<'a> SpreadingSearch<'a> {
    /// Divide `n` evenly (rounding up) across `roots.len()` per-root
    /// coroutines, built by `build_strategy(root, per_root_budget)`.
    pub fn new<F>(roots: Vec<crucible_core::Environment>, n: usize, mut build_strategy: F) -> Self
    where
        F: FnMut(crucible_core::Environment, usize) -> Box<dyn SearchStrategy + 'a>,
    {
        let num_roots = roots.len().max(1);
        let per_root = n.div_ceil(num_roots);
        let coroutines: Vec<_> = roots.into_iter().map(|root| build_strategy(root, per_root)).collect();
        let queue = (0..coroutines.len()).collect();
        let pending = vec![None; coroutines.len()];
        Self {
            coroutines,
            queue,
            pending,
            last_yielded_idx: None,
            outcomes: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl SearchStrategy for SpreadingSearch<'_> {
    async fn advance(&mut self, feedback: Option<ValidationRecord>) -> Result<SearchStep> {
        if let (Some(idx), Some(validation)) = (self.last_yielded_idx, feedback) {
            self.pending[idx] = Some(validation);
        }
        self.last_yielded_idx = None;

        while let Some(idx) = self.queue.pop_front() {
            let own_feedback = self.pending[idx].take();
            match self.coroutines[idx].advance(own_feedback).await? {
                SearchStep::Yield(env) => {
                    self.queue.push_back(idx);
                    self.last_yielded_idx = Some(idx);
                    return Ok(SearchStep::Yield(env));
                }
                SearchStep::Done(outcome) => {
                    self.outcomes.push(*outcome);
                }
            }
        }

        let fixed_validations = self.outcomes.iter().flat_map(|o| o.fixed_validations.iter().cloned()).collect();
        let terminal = self
            .outcomes
            .last()
            .map(|o| o.terminal.clone())
            .expect("spreading search always collects at least one terminal outcome");
        let reason = self
            .outcomes
            .last()
            .map(|o| o.reason)
            .expect("spreading search always collects at least one terminal outcome");
        Ok(SearchStep::done(SearchOutcome {
            reason,
            fixed_validations,
            terminal,
        }))
    }
}
