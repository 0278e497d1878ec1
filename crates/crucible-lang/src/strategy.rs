//! Language strategy (§4.E): three pure predicates over an
//! `(Environment, ValidationRecord)` pair that the feedback-directed
//! search strategy drives.
//!
//! A dependency's code is "third-party" when its frame's file lives
//! under the managed package-install prefix rather than the codebase
//! under inference. [`LanguageStrategy::is_third_party_frame`] decides
//! that per-language; [`PythonStrategy`] recognizes both the
//! `site-packages` and Debian's `dist-packages` layouts.

use crucible_core::{Environment, StackFrame, ValidationRecord};

/// Which of two validations saw its exception "earlier" in execution,
/// per [`LanguageStrategy::first_execution_exception`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    /// The first argument's exception comes first.
    First,
    /// The second argument's exception comes first.
    Second,
    /// Neither — the comparison is not meaningful (missing data, a
    /// tie, or the two exceptions live in different files, per the
    /// open-question decision recorded in `DESIGN.md`).
    Sentinel,
}

/// The dependency held responsible for an exception, per
/// [`LanguageStrategy::dependency_producing_exception`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blame {
    /// Index into `Environment::dependencies`.
    Dependency(usize),
    /// No single dependency could be blamed.
    Unknown,
}

/// Closed classification of an exception's repair eligibility, driven
/// by a per-language set membership test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairClass {
    /// Known to resist version mutation (e.g. a missing file).
    Unrepairable,
    /// Known to often be fixed by a version change (attribute-missing,
    /// arity/type mismatches).
    RepairEligible,
    /// Not specially classified; repairability falls back to the
    /// third-party-frame and import-resolution heuristics.
    Unclassified,
}

/// Three pure predicates a language plugs into the feedback-directed
/// search (§4.E). Implementations never perform I/O.
pub trait LanguageStrategy: Send + Sync {
    /// Whether `filename` is under this language's managed
    /// third-party install prefix, as opposed to the codebase under
    /// inference.
    fn is_third_party_frame(&self, filename: &str) -> bool;

    /// Extract this language's import-style missing-resource name from
    /// an exception, if `exception_name` denotes an import failure.
    fn missing_resource(&self, exception_name: &str, exception_message: Option<&str>) -> Option<String>;

    fn repair_class(&self, exception_name: &str) -> RepairClass;

    /// Whichever of `a`/`b` saw its exception earlier, by the deepest
    /// in-codebase frame's line number; [`Which::Sentinel`] if the
    /// comparison isn't meaningful (§4.E, §9 open question).
    fn first_execution_exception(&self, a: &ValidationRecord, b: &ValidationRecord) -> Which {
        let da = self.deepest_codebase_frame(a);
        let db = self.deepest_codebase_frame(b);
        match (da, db) {
            (Some(fa), Some(fb)) if fa.filename == fb.filename => {
                if fa.line < fb.line {
                    Which::First
                } else if fb.line < fa.line {
                    Which::Second
                } else {
                    Which::Sentinel
                }
            }
            _ => Which::Sentinel,
        }
    }

    /// Heuristic repairability classification (§4.E).
    fn is_repairable_version_error(&self, env: &Environment, v: &ValidationRecord) -> bool {
        let Some(execution) = &v.execution else {
            return false;
        };
        let Some(exception_name) = &execution.exception_name else {
            return false;
        };

        if self.repair_class(exception_name) == RepairClass::Unrepairable {
            return false;
        }

        let any_third_party_frame = execution
            .exception_stack
            .iter()
            .any(|f| self.is_third_party_frame(&f.filename));
        if any_third_party_frame {
            return true;
        }

        if let Some(resource) = self.missing_resource(exception_name, execution.exception_message.as_deref()) {
            let maps_to_known_dependency = env
                .metadata
                .direct_lookup
                .mapping
                .iter()
                .any(|m| m.resource == resource);
            if maps_to_known_dependency {
                return true;
            }
        }

        self.repair_class(exception_name) == RepairClass::RepairEligible
    }

    /// Blame assignment (§4.E): the dependency responsible for `v`'s
    /// exception, or [`Blame::Unknown`].
    fn dependency_producing_exception(&self, env: &Environment, v: &ValidationRecord) -> Blame {
        let Some(execution) = &v.execution else {
            return Blame::Unknown;
        };

        if let Some(index) = self.deepest_third_party_blame(env, &execution.exception_stack) {
            return Blame::Dependency(index);
        }

        let Some(exception_name) = &execution.exception_name else {
            return Blame::Unknown;
        };
        if let Some(resource) = self.missing_resource(exception_name, execution.exception_message.as_deref()) {
            let matches: Vec<usize> = env
                .metadata
                .direct_lookup
                .mapping
                .iter()
                .enumerate()
                .filter(|(_, m)| m.resource == resource)
                .filter_map(|(_, m)| {
                    env.dependencies
                        .iter()
                        .position(|d| d.name.eq_ignore_ascii_case(&m.package))
                })
                .collect();
            if matches.len() == 1 {
                return Blame::Dependency(matches[0]);
            }
        }

        Blame::Unknown
    }

    /// The deepest (innermost — stack frames are outermost-first)
    /// frame whose file is *not* under the third-party prefix.
    fn deepest_codebase_frame<'a>(&self, v: &'a ValidationRecord) -> Option<&'a StackFrame> {
        v.execution
            .as_ref()?
            .exception_stack
            .iter()
            .rev()
            .find(|f| !self.is_third_party_frame(&f.filename))
    }

    /// The deepest third-party frame whose subpath's head component
    /// (module/package directory name) matches some direct
    /// dependency's name, folding `-`/`_` so ecosystem naming
    /// conventions don't defeat the match.
    fn deepest_third_party_blame(&self, env: &Environment, stack: &[StackFrame]) -> Option<usize> {
        stack
            .iter()
            .rev()
            .filter(|f| self.is_third_party_frame(&f.filename))
            .find_map(|frame| self.blame_from_third_party_path(env, &frame.filename))
    }

    /// Extract the head path component after the third-party prefix
    /// and match it to a dependency name. Provided as a separate
    /// method so languages with different install layouts
    /// (site-packages vs. a flat vendor directory) can override just
    /// the path-splitting half.
    fn blame_from_third_party_path(&self, env: &Environment, filename: &str) -> Option<usize> {
        let head = third_party_head_component(filename)?;
        let folded_head = fold_separators(&head);
        env.dependencies
            .iter()
            .position(|d| fold_separators(&d.name) == folded_head)
    }
}

fn fold_separators(s: &str) -> String {
    s.to_ascii_lowercase().replace(['-', '_'], "")
}

/// Returns the first path component after a `site-packages/` or
/// `dist-packages/` segment, if any.
fn third_party_head_component(filename: &str) -> Option<String> {
    const MARKERS: [&str; 2] = ["site-packages/", "dist-packages/"];
    for marker in MARKERS {
        if let Some(idx) = filename.find(marker) {
            let after = &filename[idx + marker.len()..];
            if let Some(head) = after.split('/').next() {
                if !head.is_empty() {
                    return Some(head.trim_end_matches(".py").to_string());
                }
            }
        }
    }
    None
}

/// The default Python language strategy: `site-packages`/
/// `dist-packages` as the third-party prefix, `ModuleNotFoundError`/
/// `ImportError` as import-like, `AttributeError`/`TypeError` as
/// repair-eligible, `FileNotFoundError`/`PermissionError` as
/// unrepairable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonStrategy;

impl LanguageStrategy for PythonStrategy {
    fn is_third_party_frame(&self, filename: &str) -> bool {
        filename.contains("site-packages/") || filename.contains("dist-packages/")
    }

    fn missing_resource(&self, exception_name: &str, exception_message: Option<&str>) -> Option<String> {
        if !matches!(exception_name, "ModuleNotFoundError" | "ImportError") {
            return None;
        }
        let message = exception_message?;
        // CPython phrasing: "No module named 'keras'" or
        // "cannot import name 'foo' from 'bar'".
        if let Some(start) = message.find("No module named ") {
            let rest = &message[start + "No module named ".len()..];
            return Some(rest.trim_matches(|c| c == '\'' || c == '"').to_string());
        }
        if let Some(start) = message.rfind("from '") {
            let rest = &message[start + "from '".len()..];
            if let Some(end) = rest.find('\'') {
                return Some(rest[..end].to_string());
            }
        }
        None
    }

    fn repair_class(&self, exception_name: &str) -> RepairClass {
        match exception_name {
            "FileNotFoundError" | "PermissionError" | "IsADirectoryError" => RepairClass::Unrepairable,
            "AttributeError" | "TypeError" => RepairClass::RepairEligible,
            _ => RepairClass::Unclassified,
        }
    }
}
