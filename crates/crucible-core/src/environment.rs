//! The `Environment` — a candidate execution configuration — and its
//! metadata bookkeeping.

use crate::dependency::Dependency;
use crate::mutation::MutationRecord;
use crate::validation::{ParseResult, ValidationRecord};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A container base image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Image name, e.g. `python`.
    pub name: String,
    /// Image tag, e.g. `3.11-slim`.
    pub tag: String,
}

impl ImageRef {
    /// Build an image reference.
    #[must_use]
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// The `name:tag` form used by container runtimes.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

/// A command invocation: a program plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// The program to run.
    pub command: String,
    /// Arguments, in order.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Command {
    /// Build a command.
    #[must_use]
    pub fn new(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Render as a single shell-ish string, for logging and recipe emission.
    #[must_use]
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// One piece of evidence justifying a direct dependency: "resource `r`
/// was resolved to package `p`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMapping {
    /// The imported resource name (as reported by the parser sandbox).
    pub resource: String,
    /// The package name it resolved to.
    pub package: String,
}

/// Bookkeeping for direct-dependency resolution (§4.H).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectLookup {
    /// Resource→package evidence, in resolution order.
    pub mapping: Vec<ResourceMapping>,
    /// Count of *non-trivial* resolutions — incremented whenever a
    /// resource resolves to a package whose name differs from the
    /// resource, decremented back out when it turns out the resource
    /// also had a trivial exact-name match (§4.H step c).
    pub name_resolutions: i64,
    /// Resources the driver gave up on resolving (recovered locally
    /// per §7), satisfying invariant I4's "or the inference driver has
    /// recorded the failure to resolve it" branch.
    pub unresolved: Vec<String>,
}

/// One discovered transitive edge: `dependent` depends on `prerequisite`,
/// both as indices into `Environment::dependencies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitiveEdge {
    /// Index of the dependency that requires `prerequisite`.
    pub dependent: usize,
    /// Index of the required dependency.
    pub prerequisite: usize,
}

/// Bookkeeping for the transitive-closure reverse DFS (§4.H step 2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitiveLookup {
    /// Prerequisite edges discovered during the DFS.
    pub edges: Vec<TransitiveEdge>,
    /// Discovery (post-order) sequence of dependency indices, used to
    /// derive the install order (invariant I3).
    pub discovery_order: Vec<usize>,
}

/// Per-dependency feedback-search state, populated lazily the first
/// time the feedback-directed strategy blames a given dependency
/// (§4.G "On first visit to that dependency, attempt to fetch the
/// version-matrix mutation plan").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyFeedback {
    /// Queued version-matrix mutations, head-first.
    pub matrix_queue: Vec<crate::mutation::VersionChange>,
    /// Whether a version-matrix lookup was already attempted (so we
    /// don't re-query on every iteration when the matrix is empty).
    pub matrix_queried: bool,
}

/// All bookkeeping an `Environment` carries alongside its dependency
/// list: the parse result it started from, direct/transitive
/// resolution evidence, the mutation stack, and accumulated "fixed"
/// validations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentMetadata {
    /// The parser sandbox output this environment was built from.
    pub parse_result: Option<ParseResult>,
    /// Direct-dependency resolution evidence.
    pub direct_lookup: DirectLookup,
    /// Transitive-dependency resolution evidence.
    pub transitive_lookup: TransitiveLookup,
    /// Mutation stack (invariant I2): a reversible transformation log,
    /// replaying which from the initial environment reproduces this one.
    pub mutations: Vec<MutationRecord>,
    /// Validations deemed "fixed" by the feedback-directed strategy,
    /// in the order they were resolved.
    pub fixed_validations: Vec<ValidationRecord>,
    /// Per-dependency feedback-search state, keyed by dependency index.
    pub dependency_feedback: AHashMap<usize, DependencyFeedback>,
    /// Monotonically increasing generation counter, bumped on every
    /// mutation, used only to correlate log lines across a search —
    /// never serialized into emitted artifacts.
    #[serde(skip)]
    pub generation: u64,
}

/// A candidate execution configuration: base image, setup steps, a
/// pinned dependency list, and an entry command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Stable label for logging (not necessarily unique across runs).
    pub id: String,
    /// Base container image.
    pub image: ImageRef,
    /// Working directory inside the container.
    pub work_dir: String,
    /// The command that runs the snippet.
    pub entry_cmd: Command,
    /// Commands run before dependency installation (e.g. `apt-get update`).
    pub setup_commands: Vec<Command>,
    /// Dependencies in intended installation order (invariant I3).
    pub dependencies: Vec<Dependency>,
    /// Bookkeeping metadata.
    pub metadata: EnvironmentMetadata,
}

impl Environment {
    /// Build a fresh environment with no dependencies or mutations yet.
    #[must_use]
    pub fn new(id: impl Into<String>, image: ImageRef, work_dir: impl Into<String>, entry_cmd: Command) -> Self {
        Self {
            id: id.into(),
            image,
            work_dir: work_dir.into(),
            entry_cmd,
            setup_commands: Vec::new(),
            dependencies: Vec::new(),
            metadata: EnvironmentMetadata::default(),
        }
    }

    /// Deep clone for search strategies that branch (level-order):
    /// every field is owned, so `Clone` already is a deep clone, but
    /// this method documents the intent at call sites.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }

    /// Push a mutation onto the stack and bump the log-correlation
    /// generation counter.
    pub fn record_mutation(&mut self, mutation: MutationRecord) {
        self.metadata.mutations.push(mutation);
        self.metadata.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::PackageSystem;
    use crate::mutation::{Bookkeeping, MutationKind, VersionChange};

    fn base_env() -> Environment {
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

    #[test]
    fn record_mutation_appends_and_bumps_generation() {
        let mut env = base_env();
        assert_eq!(env.metadata.generation, 0);
        env.record_mutation(MutationRecord {
            kind: MutationKind::DecrementSemverMinor,
            dependency_index: 0,
            change: VersionChange {
                package: "scikit-learn".into(),
                from: Some("0.20.3".into()),
                to: "0.19.2".into(),
            },
            bookkeeping: Bookkeeping::none(),
        });
        assert_eq!(env.metadata.mutations.len(), 1);
        assert_eq!(env.metadata.generation, 1);
    }

    #[test]
    fn deep_clone_is_independent() {
        let env = base_env();
        let mut clone = env.deep_clone();
        clone.dependencies[0].version = Some("0.19.2".into());
        assert_eq!(env.dependencies[0].version.as_deref(), Some("0.20.3"));
        assert_eq!(clone.dependencies[0].version.as_deref(), Some("0.19.2"));
    }

    #[test]
    fn image_reference_format() {
        let image = ImageRef::new("python", "3.11-slim");
        assert_eq!(image.reference(), "python:3.11-slim");
    }

    #[test]
    fn command_render_with_and_without_args() {
        let c1 = Command::new("python", ["/app/snippet.py"]);
        assert_eq!(c1.render(), "python /app/snippet.py");
        let c2 = Command::new("bash", Vec::<String>::new());
        assert_eq!(c2.render(), "bash");
    }
}
