//! The shared coroutine contract every search strategy in this crate
//! implements (§4.G: "all three are coroutines: they yield a candidate
//! environment, receive the resulting Validation record on resumption,
//! and terminate with an optional metadata payload").
//!
//! Rust has no native generator syntax, so a strategy is modeled as a
//! pull-based state machine: [`SearchStrategy::advance`] is called
//! repeatedly, each time with the validation of whatever it yielded
//! last (`None` on the very first call), and it returns either another
//! yield or a terminal [`SearchOutcome`].

use crucible_core::{Environment, ValidationRecord};

/// Why a coroutine terminated without reaching `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The search space was fully explored (or the budget ran out)
    /// without producing a fix.
    Exhausted,
    /// A validation reported [`crucible_core::ValidationStatus::Timeout`].
    Timeout,
    /// A validation's execution was absent or unclassifiable.
    UnknownException,
    /// The language strategy judged the current exception unrepairable.
    NotRepairable,
}

/// What a coroutine returns when it stops yielding.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Why the coroutine stopped.
    pub reason: TerminationReason,
    /// Validations the feedback-directed strategy deemed resolved
    /// along the way. Always empty for level-order and plain IDDFS,
    /// which never classify repairability.
    pub fixed_validations: Vec<ValidationRecord>,
    /// The environment state at termination, kept for diagnostics
    /// (§7 "carrying each root's terminal metadata").
    pub terminal: Environment,
}

/// One step of a coroutine's execution.
#[derive(Debug)]
pub enum SearchStep {
    /// A candidate environment to validate next.
    Yield(Box<Environment>),
    /// The coroutine is finished.
    Done(Box<SearchOutcome>),
}

impl SearchStep {
    /// Convenience constructor so call sites read `SearchStep::yielded(env)`
    /// instead of `SearchStep::Yield(Box::new(env))`.
    #[must_use]
    pub fn yielded(env: Environment) -> Self {
        Self::Yield(Box::new(env))
    }

    /// Convenience constructor mirroring [`Self::yielded`].
    #[must_use]
    pub fn done(outcome: SearchOutcome) -> Self {
        Self::Done(Box::new(outcome))
    }
}

/// A search strategy's resumable execution state.
#[async_trait::async_trait]
pub trait SearchStrategy: Send {
    /// Advance the search. `feedback` is the validation of the
    /// environment this coroutine yielded last (`None` on the first
    /// call, and ignored by implementations that haven't yielded yet).
    async fn advance(&mut self, feedback: Option<ValidationRecord>) -> crucible_core::Result<SearchStep>;
}
