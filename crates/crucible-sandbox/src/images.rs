//! Building and pushing the sandbox images the `build`/`push` CLI
//! verbs operate over (§6: "build all container images" / "push all
//! images to the configured registry").
//!
//! Distinct from [`crate::container`]'s run lifecycle: this is the
//! image-management half of the same Docker Engine API client.

use std::io::Write;
use std::path::Path;

use bollard::image::{BuildImageOptions, PushImageOptions};
use bollard::Docker;
use crucible_core::{CrucibleError, Result};
use futures_util::StreamExt;
use tracing::{info, warn};

/// Builds `tag` from the Dockerfile + context rooted at `context_dir`,
/// streaming daemon build output to `tracing` at `info`.
///
/// # Errors
/// Returns an error if the context can't be packed into a tar stream
/// or the daemon reports a build failure.
pub async fn build_image(docker: &Docker, tag: &str, context_dir: &Path) -> Result<()> {
    let tar_body = pack_context(context_dir)?;

    let options = BuildImageOptions {
        dockerfile: "Dockerfile",
        t: tag,
        rm: true,
        ..Default::default()
    };

    let mut stream = docker.build_image(options, None, Some(tar_body.into()));
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(build_info) => {
                if let Some(stream_line) = build_info.stream {
                    info!(tag, "{}", stream_line.trim_end());
                }
                if let Some(err) = build_info.error {
                    return Err(image_error(tag, "build", err));
                }
            }
            Err(e) => return Err(image_error(tag, "build", e)),
        }
    }
    Ok(())
}

/// Pushes `tag` to the registry implied by its name, streaming daemon
/// push output to `tracing` at `info`.
///
/// # Errors
/// Returns an error if the daemon reports a push failure.
pub async fn push_image(docker: &Docker, tag: &str) -> Result<()> {
    let (name, push_tag) = tag.rsplit_once(':').unwrap_or((tag, "latest"));
    let options = PushImageOptions { tag: push_tag };

    let mut stream = docker.push_image(name, Some(options), None);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(push_info) => {
                if let Some(status) = push_info.status {
                    info!(tag, "{status}");
                }
                if let Some(err) = push_info.error {
                    return Err(image_error(tag, "push", err));
                }
            }
            Err(e) => return Err(image_error(tag, "push", e)),
        }
    }
    Ok(())
}

fn pack_context(context_dir: &Path) -> Result<Vec<u8>> {
    if !context_dir.is_dir() {
        warn!(dir = %context_dir.display(), "build context missing, packing an empty tar");
    }

    let mut builder = tar::Builder::new(Vec::new());
    if context_dir.is_dir() {
        builder
            .append_dir_all(".", context_dir)
            .map_err(|e| image_error(&context_dir.display().to_string(), "pack context", e))?;
    }
    let raw = builder
        .into_inner()
        .map_err(|e| image_error(&context_dir.display().to_string(), "finalize tar", e))?;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| image_error(&context_dir.display().to_string(), "gzip context", e))?;
    encoder
        .finish()
        .map_err(|e| image_error(&context_dir.display().to_string(), "gzip context", e))
}

fn image_error(tag: &str, op: &str, cause: impl std::fmt::Display) -> CrucibleError {
    CrucibleError::UnexpectedInference {
        message: format!("{op} image {tag}: {cause}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_context_handles_missing_directory() {
        let tar = pack_context(Path::new("/nonexistent/crucible-test-context")).unwrap();
        assert!(!tar.is_empty(), "even an empty context produces a gzip header");
    }
}
