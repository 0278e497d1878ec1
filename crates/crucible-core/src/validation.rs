//! Validation records and the parser-sandbox output they're paired with.

use serde::{Deserialize, Serialize};

/// Top-level outcome of a validation sandbox run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ValidationStatus {
    /// The entry command ran to completion without raising.
    Success,
    /// The entry command raised or exited non-zero.
    Failed,
    /// The sandbox's internal timeout fired before completion.
    Timeout,
    /// The sandbox could not classify the outcome (malformed output it
    /// chose to paper over, or an exception it didn't recognize).
    UnknownException,
}

/// A single `pip install`/`apt-get install`-shaped failure, captured
/// with output truncated to 1024 bytes per §4.D.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallError {
    /// Package the failing install command targeted.
    pub package: String,
    /// The install command that failed, exactly as invoked.
    pub command: String,
    /// Captured stdout, truncated to 1024 bytes.
    pub stdout: String,
    /// Captured stderr, truncated to 1024 bytes.
    pub stderr: String,
    /// Process exit code, if the process exited (as opposed to being killed).
    pub exit_code: Option<i32>,
}

const TRUNCATE_LIMIT: usize = 1024;

impl InstallError {
    /// Build an install error, truncating `stdout`/`stderr` to the
    /// 1024-byte ceiling required by §4.D. Truncation is at a byte
    /// boundary snapped backward to the nearest char boundary so the
    /// result is always valid UTF-8.
    #[must_use]
    pub fn new(
        package: impl Into<String>,
        command: impl Into<String>,
        stdout: &str,
        stderr: &str,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            package: package.into(),
            command: command.into(),
            stdout: truncate_utf8(stdout, TRUNCATE_LIMIT),
            stderr: truncate_utf8(stderr, TRUNCATE_LIMIT),
            exit_code,
        }
    }
}

fn truncate_utf8(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// One frame of an exception's stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Absolute path of the file the frame executed in.
    pub filename: String,
    /// 1-based line number.
    pub line: u32,
    /// Function or method name, if known.
    #[serde(rename = "fn")]
    pub function: Option<String>,
    /// The source line's text, if the sandbox captured it.
    pub source: Option<String>,
}

/// Outcome of running the entry command, nested inside a
/// [`ValidationRecord`]. Per §3, this carries its own `status_code`
/// distinct from the record's top-level one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Execution-level status (mirrors the top-level status for
    /// `Success`/`Timeout`, but can additionally be `Failed` when the
    /// install phase succeeded and only execution raised).
    pub status_code: ExecutionStatus,
    /// Exception type name, e.g. `ModuleNotFoundError`.
    pub exception_name: Option<String>,
    /// Exception message text.
    pub exception_message: Option<String>,
    /// Line number of the frame the sandbox considers most relevant
    /// (conventionally the deepest frame, but the sandbox decides).
    pub exception_line: Option<u32>,
    /// File of that frame.
    pub exception_file: Option<String>,
    /// Full stack, outermost frame first.
    #[serde(default)]
    pub exception_stack: Vec<StackFrame>,
}

/// Execution-level status, nested under [`ExecutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ExecutionStatus {
    /// Ran to completion without raising.
    Success,
    /// Raised or exited non-zero.
    Failed,
}

/// Dependency-installation portion of a [`ValidationRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DependencyInstallResult {
    /// One entry per failed install command, in attempted order.
    #[serde(default)]
    pub install_errors: Vec<InstallError>,
}

/// The structured record a validation sandbox writes to its primary
/// output channel, verbatim per §4.D ("the driver does not parse the
/// record; it returns it to the inference driver verbatim").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Top-level status.
    pub status_code: ValidationStatus,
    /// Dependency-installation outcome.
    pub dependencies: DependencyInstallResult,
    /// Execution outcome. Absent when `status_code` is `Timeout` and
    /// the sandbox never reached the entry command, per §6.
    pub execution: Option<ExecutionResult>,
}

impl ValidationRecord {
    /// A synthetic `Timeout` record, used when the validator driver's
    /// own deadline fires before the sandbox responds (§4.C/§4.D).
    #[must_use]
    pub fn timeout() -> Self {
        Self {
            status_code: ValidationStatus::Timeout,
            dependencies: DependencyInstallResult::default(),
            execution: None,
        }
    }
}

/// One file reported by a parser sandbox, per the §6 parser contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Path relative to the bind-mounted codebase root.
    pub filename: String,
    /// Import statements the parser extracted, verbatim.
    pub imports: Vec<String>,
}

/// Language/dialect information reported by a parser sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Dialect name, e.g. `python`.
    pub name: String,
    /// Full version string, e.g. `3.11.4`.
    pub version: String,
    /// Major version number, for adapter selection.
    pub version_major: u32,
    /// Which package system this dialect's imports resolve against.
    pub system: String,
    /// Whether the snippet is a Jupyter notebook rather than a plain script.
    #[serde(default)]
    pub jupyter: Option<bool>,
}

/// The full JSON document a parser sandbox writes, per §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Detected language/dialect.
    pub language: LanguageInfo,
    /// Number of files reported (redundant with `files.len()`, kept
    /// because the wire schema mandates it).
    pub num_files: usize,
    /// Per-file import lists.
    pub files: Vec<ParsedFile>,
}

impl ParseResult {
    /// All imported resource names across every file, de-duplicated,
    /// preserving first-seen order.
    #[must_use]
    pub fn imported_resources(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for file in &self.files {
            for import in &file.imports {
                if seen.insert(import.clone()) {
                    out.push(import.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "é".repeat(600); // 2 bytes each = 1200 bytes, over the 1024 limit
        let err = InstallError::new("pkg", "pip install pkg", &s, "", Some(1));
        assert!(err.stdout.len() <= TRUNCATE_LIMIT);
        assert!(err.stdout.is_char_boundary(err.stdout.len()));
    }

    #[test]
    fn short_output_is_untouched() {
        let err = InstallError::new("pkg", "pip install pkg", "ok", "", Some(0));
        assert_eq!(err.stdout, "ok");
    }

    #[test]
    fn imported_resources_deduplicates_preserving_order() {
        let parsed = ParseResult {
            language: LanguageInfo {
                name: "python".into(),
                version: "3.11.4".into(),
                version_major: 3,
                system: "pypi".into(),
                jupyter: Some(false),
            },
            num_files: 2,
            files: vec![
                ParsedFile {
                    filename: "a.py".into(),
                    imports: vec!["numpy".into(), "os".into()],
                },
                ParsedFile {
                    filename: "b.py".into(),
                    imports: vec!["os".into(), "keras".into()],
                },
            ],
        };
        assert_eq!(
            parsed.imported_resources(),
            vec!["numpy".to_string(), "os".to_string(), "keras".to_string()]
        );
    }
}
