//! Mutation-tree search strategies (§4.G): level-order, iterative-
//! deepening DFS, feedback-directed DFS, and the spreading wrapper
//! that fans any of them out across several starting environments.
//!
//! Every strategy implements the same pull-based [`coroutine`]
//! contract, so `crucible-driver` can swap one in for another without
//! caring which is active.

pub mod coroutine;
pub mod feedback;
pub mod iddfs;
pub mod level_order;
pub mod matrix;
pub mod registry;
pub mod spreading;

pub use coroutine::{SearchOutcome, SearchStep, SearchStrategy, TerminationReason};
pub use feedback::FeedbackDirectedSearch;
pub use iddfs::IddfsSearch;
pub use level_order::{LevelOrderSearch, DEFAULT_LEVELS};
pub use matrix::{plan_matrix_chain, MatrixMutator};
pub use registry::AdapterRegistry;
pub use spreading::SpreadingSearch;
