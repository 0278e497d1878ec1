//! The three artifact shapes a run can be rendered as (§4.J, `--format`).

use std::fmt;
use std::str::FromStr;

use crucible_core::{CrucibleError, Result};

/// Output format selected by the CLI's `--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitFormat {
    /// A Dockerfile-shaped text recipe.
    Dockerfile,
    /// One install command per line.
    InstallCommands,
    /// The full inference report as JSON.
    Metadata,
}

impl FromStr for EmitFormat {
    type Err = CrucibleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dockerfile" => Ok(Self::Dockerfile),
            "install-commands" => Ok(Self::InstallCommands),
            "metadata" => Ok(Self::Metadata),
            other => Err(CrucibleError::UnexpectedInference {
                message: format!("unknown emit format: {other}"),
            }),
        }
    }
}

impl fmt::Display for EmitFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dockerfile => "dockerfile",
            Self::InstallCommands => "install-commands",
            Self::Metadata => "metadata",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant_through_display() {
        for format in [EmitFormat::Dockerfile, EmitFormat::InstallCommands, EmitFormat::Metadata] {
            assert_eq!(format.to_string().parse::<EmitFormat>().unwrap(), format);
        }
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("yaml".parse::<EmitFormat>().is_err());
    }
}
