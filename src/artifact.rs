use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Closed set of model representations the pipeline moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Framework-native training checkpoint (`.pt`).
    Checkpoint,
    /// Framework-neutral interchange representation (`.onnx`).
    Onnx,
    /// Intermediate unoptimized TensorFlow representation (a directory).
    SavedModel,
    /// Mobile deployment format, the pipeline's final output.
    Tflite,
}

impl ModelFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            ModelFormat::Checkpoint => "checkpoint",
            ModelFormat::Onnx => "onnx",
            ModelFormat::SavedModel => "saved_model",
            ModelFormat::Tflite => "tflite",
        }
    }

    /// Guesses the format of a local file the operator handed us.
    pub fn infer(path: &Path) -> Option<ModelFormat> {
        if path.is_dir() {
            return Some(ModelFormat::SavedModel);
        }
        match path.extension().and_then(|e| e.to_str())? {
            "pt" => Some(ModelFormat::Checkpoint),
            "onnx" => Some(ModelFormat::Onnx),
            "tflite" => Some(ModelFormat::Tflite),
            _ => None,
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A model file produced by acquisition or by a conversion stage.
/// Never mutated; each stage supersedes it with a new value.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub path: PathBuf,
    pub format: ModelFormat,
    pub size: u64,
}

impl ModelArtifact {
    /// Builds an artifact from an existing file, recording its byte size.
    pub fn from_path(path: impl Into<PathBuf>, format: ModelFormat) -> Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        Ok(Self { path, format, size })
    }

    /// Directory-shaped artifacts (SavedModel) report no byte size.
    pub fn directory(path: impl Into<PathBuf>, format: ModelFormat) -> Self {
        Self {
            path: path.into(),
            format,
            size: 0,
        }
    }
}
