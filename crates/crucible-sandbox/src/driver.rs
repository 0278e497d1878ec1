//! The parse driver (§4.C) and validator driver (§4.D): the two
//! sandbox-facing halves of the pipeline that `crucible-driver`
//! orchestrates.

use std::sync::Arc;
use std::time::Duration;

use crucible_adapters::AdapterRegistry;
use crucible_core::json::from_json_slice;
use crucible_core::{Command, Environment, ImageRef, ParseResult, Result, ValidationRecord};
use tracing::{instrument, warn};

use crate::container::{ContainerRuntime, RunOutcome, RunSpec};

/// One parser sandbox to launch: an image plus the dialect name it
/// reports on success, and the setup commands a starting `Environment`
/// for that dialect should carry (e.g. `apt-get update`).
#[derive(Debug, Clone)]
pub struct ParserDialect {
    /// Dialect label, purely for logging — the authoritative name
    /// comes from the parse result's `language.name`.
    pub label: String,
    /// Parser sandbox image reference.
    pub image: String,
    /// Commands run before dependency installation in any `Environment`
    /// this dialect produces.
    pub setup_commands: Vec<Command>,
}

/// Launches a parser sandbox per configured dialect (§4.C) and builds
/// a starting [`Environment`] from each successful parse. A sandbox
/// failure (non-zero exit, timeout, malformed JSON) is logged and
/// skipped — only when every dialect fails does the caller see zero
/// environments, which `crucible-driver` treats as
/// `NoBaseEnvironments`.
pub struct ParseDriver<R> {
    runtime: R,
    codebase_path: String,
    deadline: Duration,
}

impl<R: ContainerRuntime> ParseDriver<R> {
    /// Build a parse driver that bind-mounts `codebase_path` read-only
    /// into each sandbox, giving each invocation up to `deadline`.
    #[must_use]
    pub fn new(runtime: R, codebase_path: impl Into<String>, deadline: Duration) -> Self {
        Self {
            runtime,
            codebase_path: codebase_path.into(),
            deadline,
        }
    }

    /// Run every dialect concurrently, returning one `Environment` per
    /// dialect whose sandbox succeeded.
    #[instrument(skip(self, dialects), fields(num_dialects = dialects.len()))]
    pub async fn parse_all(&self, dialects: &[ParserDialect]) -> Vec<Environment> {
        let attempts = dialects.iter().map(|dialect| self.parse_one(dialect));
        let results = futures_util::future::join_all(attempts).await;

        let mut environments = Vec::new();
        for (dialect, result) in dialects.iter().zip(results) {
            match result {
                Ok(env) => environments.push(env),
                Err(e) => warn!(dialect = %dialect.label, error = %e, "parser sandbox failed, skipping dialect"),
            }
        }
        environments
    }

    async fn parse_one(&self, dialect: &ParserDialect) -> Result<Environment> {
        let spec = RunSpec {
            image: dialect.image.clone(),
            cmd: vec![self.codebase_path.clone()],
            binds: vec![format!("{}:{}:ro", self.codebase_path, self.codebase_path)],
            work_dir: None,
        };
        let outcome = self.runtime.run(spec, self.deadline).await?;
        if outcome.timed_out {
            return Err(crucible_core::CrucibleError::UnexpectedInference {
                message: format!("parser sandbox {} timed out", dialect.label),
            });
        }
        let parsed: ParseResult = from_json_slice(&outcome.stdout)?;
        Ok(build_environment(dialect, parsed, &self.codebase_path))
    }
}

fn build_environment(dialect: &ParserDialect, parsed: ParseResult, codebase_path: &str) -> Environment {
    let image = ImageRef::new(parsed.language.name.clone(), parsed.language.version.clone());
    let entry_cmd = synthesize_entry(&parsed, codebase_path);
    let mut env = Environment::new(format!("{}-root", dialect.label), image, codebase_path, entry_cmd);
    env.setup_commands.clone_from(&dialect.setup_commands);
    env.metadata.parse_result = Some(parsed);
    env
}

/// Synthesizes the entry command from the dialect plus any
/// special-mode flags present in the parse result (§4.C), fixing the
/// executable path using the codebase's file shape: the first file
/// the parser reported is taken as the snippet's entry point.
fn synthesize_entry(parsed: &ParseResult, work_dir: &str) -> Command {
    let entry_file = parsed
        .files
        .first()
        .map(|f| f.filename.clone())
        .unwrap_or_else(|| "snippet".to_string());
    let entry_path = format!("{}/{entry_file}", work_dir.trim_end_matches('/'));

    if parsed.language.jupyter == Some(true) {
        return Command::new(
            "jupyter",
            ["nbconvert", "--to", "notebook", "--execute", &entry_path],
        );
    }

    match parsed.language.name.as_str() {
        "python" => Command::new("python", [entry_path]),
        other => Command::new(other, [entry_path]),
    }
}

/// Given an environment, synthesizes its install-command list and
/// invokes the validation sandbox for its dialect and mode (§4.D). A
/// well-formed record is returned verbatim to the inference driver;
/// malformed sandbox output is a protocol violation and propagates as
/// [`crucible_core::CrucibleError::ValidationError`] instead (§7).
pub struct ValidatorDriver<R> {
    runtime: R,
    codebase_path: String,
    /// Validator sandbox image, keyed by `language.name` (§6: "the
    /// corresponding validation sandbox image for the dialect and
    /// mode").
    images: std::collections::HashMap<String, String>,
    deadline: Duration,
}

impl<R: ContainerRuntime> ValidatorDriver<R> {
    /// Build a validator driver with one sandbox image per dialect.
    #[must_use]
    pub fn new(runtime: R, codebase_path: impl Into<String>, images: std::collections::HashMap<String, String>, deadline: Duration) -> Self {
        Self {
            runtime,
            codebase_path: codebase_path.into(),
            images,
            deadline,
        }
    }

    /// Synthesize the install-command list for `env` (setup commands
    /// first, then one install command per dependency in installation
    /// order) and run the validation sandbox, returning its record
    /// verbatim.
    #[instrument(skip(self, env, adapters), fields(env_id = %env.id))]
    pub async fn validate(&self, env: &Environment, adapters: &dyn AdapterRegistry) -> Result<ValidationRecord> {
        let dialect = env
            .metadata
            .parse_result
            .as_ref()
            .map(|p| p.language.name.as_str())
            .unwrap_or(env.image.name.as_str());
        let image = self.images.get(dialect).cloned().ok_or_else(|| crucible_core::CrucibleError::UnexpectedInference {
            message: format!("no validator sandbox image configured for dialect {dialect}"),
        })?;

        let install_commands: Vec<String> = env
            .setup_commands
            .iter()
            .map(Command::render)
            .chain(
                env.dependencies
                    .iter()
                    .map(|dep| adapters.adapter_for(dep.system).install_command(dep).render()),
            )
            .collect();

        let spec = RunSpec {
            image,
            cmd: vec![self.codebase_path.clone(), install_commands.join(",")],
            binds: vec![format!("{}:{}", self.codebase_path, self.codebase_path)],
            work_dir: Some(env.work_dir.clone()),
        };

        let outcome = self.runtime.run(spec, self.deadline).await?;
        interpret_outcome(outcome)
    }
}

/// Interprets a finished validation sandbox run. A timeout is
/// caller-visible progress (the search keeps going), but malformed or
/// non-deserializable sandbox output is a validator protocol
/// violation, which §7 requires to propagate rather than be folded
/// into the feedback-directed search as if the snippet itself raised
/// an unclassifiable exception.
fn interpret_outcome(outcome: RunOutcome) -> Result<ValidationRecord> {
    if outcome.timed_out {
        return Ok(ValidationRecord::timeout());
    }
    from_json_slice(&outcome.stdout).map_err(|e| {
        let record = ValidationRecord {
            status_code: crucible_core::ValidationStatus::UnknownException,
            dependencies: crucible_core::validation::DependencyInstallResult::default(),
            execution: None,
        };
        warn!(error = %e, "validator sandbox returned malformed output, propagating");
        crucible_core::CrucibleError::ValidationError {
            record: Box::new(record),
        }
    })
}

/// Convenience alias for an `Arc`-shared [`ContainerRuntime`], the
/// shape both drivers are typically constructed with in production
/// (one Docker connection shared across parse and validate calls).
pub type SharedRuntime = Arc<dyn ContainerRuntime>;

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_adapters::{PackageSystemAdapter, StaticAdapterRegistry};
    use crucible_core::{Dependency, LanguageInfo, PackageSystem, ParsedFile};
    use std::sync::Arc;

    struct ScriptedRuntime {
        stdout: Vec<u8>,
        timed_out: bool,
    }

    #[async_trait::async_trait]
    impl ContainerRuntime for ScriptedRuntime {
        async fn run(&self, _spec: RunSpec, _deadline: Duration) -> Result<RunOutcome> {
            Ok(RunOutcome {
                stdout: self.stdout.clone(),
                exit_code: Some(0),
                timed_out: self.timed_out,
            })
        }
    }

    fn parse_json(jupyter: bool) -> Vec<u8> {
        let result = ParseResult {
            language: LanguageInfo {
                name: "python".into(),
                version: "3.11.4".into(),
                version_major: 3,
                system: "pypi".into(),
                jupyter: Some(jupyter),
            },
            num_files: 1,
            files: vec![ParsedFile {
                filename: "snippet.py".into(),
                imports: vec!["numpy".into()],
            }],
        };
        serde_json::to_vec(&result).unwrap()
    }

    #[tokio::test]
    async fn parse_all_skips_failing_dialects_and_keeps_successes() {
        let runtime = ScriptedRuntime {
            stdout: parse_json(false),
            timed_out: false,
        };
        let driver = ParseDriver::new(runtime, "/app", Duration::from_secs(30));
        let dialects = vec![ParserDialect {
            label: "python".into(),
            image: "crucible-parser-python:latest".into(),
            setup_commands: vec![],
        }];
        let envs = driver.parse_all(&dialects).await;
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].entry_cmd.render(), "python /app/snippet.py");
    }

    #[tokio::test]
    async fn parse_all_returns_empty_when_every_dialect_times_out() {
        let runtime = ScriptedRuntime {
            stdout: Vec::new(),
            timed_out: true,
        };
        let driver = ParseDriver::new(runtime, "/app", Duration::from_secs(30));
        let dialects = vec![ParserDialect {
            label: "python".into(),
            image: "crucible-parser-python:latest".into(),
            setup_commands: vec![],
        }];
        assert!(driver.parse_all(&dialects).await.is_empty());
    }

    #[tokio::test]
    async fn jupyter_flag_switches_entry_command() {
        let runtime = ScriptedRuntime {
            stdout: parse_json(true),
            timed_out: false,
        };
        let driver = ParseDriver::new(runtime, "/app", Duration::from_secs(30));
        let dialects = vec![ParserDialect {
            label: "python".into(),
            image: "crucible-parser-python:latest".into(),
            setup_commands: vec![],
        }];
        let envs = driver.parse_all(&dialects).await;
        assert!(envs[0].entry_cmd.command == "jupyter");
    }

    struct StubAdapter;
    #[async_trait::async_trait]
    impl PackageSystemAdapter for StubAdapter {
        fn system(&self) -> PackageSystem {
            PackageSystem::PyPi
        }
        fn normalize_name(&self, name: &str) -> String {
            name.to_string()
        }
        async fn available_versions(&self, _normalized_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
        fn install_command(&self, dep: &Dependency) -> Command {
            Command::new("pip", ["install".to_string(), format!("{}=={}", dep.name, dep.version.clone().unwrap_or_default())])
        }
    }

    #[tokio::test]
    async fn validate_times_out_as_a_timeout_record_not_an_error() {
        let runtime = ScriptedRuntime {
            stdout: Vec::new(),
            timed_out: true,
        };
        let mut images = std::collections::HashMap::new();
        images.insert("python".to_string(), "crucible-validator-python:latest".to_string());
        let driver = ValidatorDriver::new(runtime, "/app", images, Duration::from_secs(30));
        let adapters = StaticAdapterRegistry::new().register(Arc::new(StubAdapter));

        let mut env = Environment::new(
            "root",
            ImageRef::new("python", "3.11-slim"),
            "/app",
            Command::new("python", ["/app/snippet.py"]),
        );
        env.dependencies.push(Dependency::new("numpy", "1.26.0", PackageSystem::PyPi));
        let record = driver.validate(&env, &adapters).await.unwrap();
        assert_eq!(record.status_code, crucible_core::ValidationStatus::Timeout);
    }

    #[tokio::test]
    async fn validate_propagates_on_malformed_sandbox_output() {
        let runtime = ScriptedRuntime {
            stdout: b"not json".to_vec(),
            timed_out: false,
        };
        let mut images = std::collections::HashMap::new();
        images.insert("python".to_string(), "crucible-validator-python:latest".to_string());
        let driver = ValidatorDriver::new(runtime, "/app", images, Duration::from_secs(30));
        let adapters = StaticAdapterRegistry::new().register(Arc::new(StubAdapter));

        let env = Environment::new(
            "root",
            ImageRef::new("python", "3.11-slim"),
            "/app",
            Command::new("python", ["/app/snippet.py"]),
        );

        let err = driver.validate(&env, &adapters).await.unwrap_err();
        match err {
            crucible_core::CrucibleError::ValidationError { record } => {
                assert_eq!(record.status_code, crucible_core::ValidationStatus::UnknownException);
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }
}
