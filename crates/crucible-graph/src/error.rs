//! Graph-query failure wrapping.
//!
//! §7 is explicit that graph-query failures propagate — there is no
//! local recovery once [`crate::client::GraphClient::run_query`]'s
//! retries are exhausted. This module only adapts `reqwest`/JSON
//! failures into the shared [`crucible_core::CrucibleError`] set.

use crucible_core::CrucibleError;

pub(crate) fn query_error(query: &str, cause: impl std::fmt::Display) -> CrucibleError {
    CrucibleError::UnexpectedInference {
        message: format!("graph query {query}: {cause}"),
    }
}
