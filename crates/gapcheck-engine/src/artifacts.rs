//! Artifact persistence with content hashes.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

use gapcheck_registry::RunId;
use gapcheck_utils::error::GapcheckError;

/// Write a run's parsed result (or fallback) under its artifact name and
/// return the path plus the BLAKE3 hash of the stored bytes.
pub fn store_artifact(
    output_dir: &Utf8Path,
    run: RunId,
    value: &Value,
) -> Result<(Utf8PathBuf, String), GapcheckError> {
    std::fs::create_dir_all(output_dir.as_std_path()).map_err(|e| {
        GapcheckError::ArtifactWrite {
            path: output_dir.to_string(),
            reason: e.to_string(),
        }
    })?;

    let path = output_dir.join(run.spec().output_artifact);
    let mut content = serde_json::to_string_pretty(value).map_err(|e| {
        GapcheckError::ArtifactWrite {
            path: path.to_string(),
            reason: e.to_string(),
        }
    })?;
    content.push('\n');

    std::fs::write(path.as_std_path(), &content).map_err(|e| GapcheckError::ArtifactWrite {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let hash = blake3::hash(content.as_bytes()).to_hex().to_string();
    Ok((path, hash))
}
