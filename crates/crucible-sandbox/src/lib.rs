//! Container-driven sandboxes (§4.C, §4.D, §6): the parse driver, the
//! validator driver, and the packaging-system sandbox contract, all
//! launched through the Docker Engine API (`bollard`) rather than the
//! `docker` CLI.
//!
//! Every sandbox invocation goes through the same [`container::ContainerRuntime`]
//! seam so tests can substitute an in-process fake instead of a real
//! Docker daemon.

pub mod container;
pub mod driver;
pub mod images;
pub mod packaging;

pub use container::{ContainerRunner, ContainerRuntime, RunOutcome, RunSpec, MAX_STDOUT_BYTES};
pub use driver::{ParseDriver, ParserDialect, SharedRuntime, ValidatorDriver};
pub use images::{build_image, push_image};
pub use packaging::ContainerPackagingSandbox;
