use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::ModelArtifact;
use crate::error::PipelineError;

/// Destination filenames are fixed constants, never derived from the
/// source filenames.
pub const MODEL_FILENAME: &str = "chess_yolo.tflite";
pub const LABELS_FILENAME: &str = "labels.txt";

/// Where the app expects its model and label manifest.
#[derive(Debug, Clone)]
pub struct DeployTarget {
    assets_dir: PathBuf,
}

impl DeployTarget {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.assets_dir.join(MODEL_FILENAME)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.assets_dir.join(LABELS_FILENAME)
    }
}

/// Copies the validated artifact into the assets directory, creating it
/// as needed and overwriting any prior file. The copy must be
/// byte-identical; the source artifact is left untouched either way.
pub fn stage(artifact: &ModelArtifact, target: &DeployTarget) -> Result<PathBuf> {
    fs::create_dir_all(target.assets_dir()).map_err(|e| {
        PipelineError::deployment(format!("create {}: {e}", target.assets_dir().display()))
    })?;

    let dest = target.model_path();
    let copied = fs::copy(&artifact.path, &dest).map_err(|e| {
        PipelineError::deployment(format!(
            "copy {} to {}: {e}",
            artifact.path.display(),
            dest.display()
        ))
    })?;

    if copied != artifact.size {
        return Err(PipelineError::deployment(format!(
            "copied {copied} bytes to {}, expected {}",
            dest.display(),
            artifact.size
        ))
        .into());
    }
    Ok(dest)
}
