//! Renders an [`InferenceArtifact`] or [`InferenceReport`] into each of
//! the three emission formats (§4.J).

use crucible_core::Result;
use crucible_driver::InferenceReport;

use crate::ir::InferenceArtifact;

/// Renders a Dockerfile-shaped text recipe: `FROM`, `WORKDIR`, `COPY`
/// the snippet in, `RUN` per setup/install command, `CMD` the entry.
#[must_use]
pub fn render_dockerfile(artifact: &InferenceArtifact) -> String {
    let mut lines = vec![format!("FROM {}", artifact.base_image.reference()), format!("WORKDIR {}", artifact.work_dir), "COPY . .".to_string()];

    for cmd in &artifact.setup_commands {
        lines.push(format!("RUN {}", cmd.render()));
    }
    for cmd in &artifact.install_commands {
        lines.push(format!("RUN {}", cmd.render()));
    }

    let entry_json: Vec<String> = std::iter::once(artifact.entry_command.command.clone())
        .chain(artifact.entry_command.args.iter().cloned())
        .map(|part| format!("\"{part}\""))
        .collect();
    lines.push(format!("CMD [{}]", entry_json.join(", ")));

    lines.join("\n")
}

/// Renders the install commands, one per line, in installation order.
#[must_use]
pub fn render_install_commands(artifact: &InferenceArtifact) -> Vec<String> {
    artifact.install_commands.iter().map(crucible_core::Command::render).collect()
}

/// Renders the full inference report as pretty-printed JSON.
pub fn render_metadata(report: &InferenceReport) -> Result<String> {
    crucible_core::json::to_json_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::{Command, Environment, ImageRef};

    fn artifact() -> InferenceArtifact {
        InferenceArtifact {
            base_image: ImageRef::new("python", "3.11-slim"),
            work_dir: "/app".to_string(),
            setup_commands: Vec::new(),
            install_commands: vec![Command::new("pip", ["install".to_string(), "numpy==1.26.0".to_string()])],
            entry_command: Command::new("python", ["/app/snippet.py"]),
        }
    }

    #[test]
    fn dockerfile_has_one_run_per_command_and_a_json_cmd() {
        let rendered = render_dockerfile(&artifact());
        assert!(rendered.contains("FROM python:3.11-slim"));
        assert!(rendered.contains("WORKDIR /app"));
        assert!(rendered.contains("RUN pip install numpy==1.26.0"));
        assert!(rendered.contains("CMD [\"python\", \"/app/snippet.py\"]"));
    }

    #[test]
    fn install_commands_renders_one_line_per_dependency() {
        let lines = render_install_commands(&artifact());
        assert_eq!(lines, vec!["pip install numpy==1.26.0".to_string()]);
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let report = InferenceReport {
            run_id: "20260101T000000.000-1".to_string(),
            environment: Environment::new("root", ImageRef::new("python", "3.11-slim"), "/app", Command::new("python", ["/app/s.py"])),
            num_validations: 3,
            elapsed_ms: 500,
        };
        let json = render_metadata(&report).unwrap();
        assert!(json.contains("\"run_id\""));
        assert!(json.contains("\"num_validations\""));
    }
}
