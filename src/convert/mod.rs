use anyhow::Result;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::artifact::{ModelArtifact, ModelFormat};
use crate::deploy::MODEL_FILENAME;
use crate::deps::Toolchain;
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// Square input resolution. Must match what the app feeds the model.
    pub image_size: u32,
    /// Full-precision export unless explicitly enabled.
    pub quantize: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            image_size: 640,
            quantize: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionStage {
    pub from: ModelFormat,
    pub to: ModelFormat,
}

/// Fixed interchange chain from ONNX to the mobile format. A checkpoint
/// input bypasses it entirely via the framework's own exporter.
pub const INTERCHANGE_CHAIN: [ConversionStage; 2] = [
    ConversionStage {
        from: ModelFormat::Onnx,
        to: ModelFormat::SavedModel,
    },
    ConversionStage {
        from: ModelFormat::SavedModel,
        to: ModelFormat::Tflite,
    },
];

/// Transforms an acquired model into the deployment format by driving
/// the external conversion toolchains.
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Produces the TFLite artifact in the work directory. Idempotent:
    /// an existing non-empty output is returned without re-running any
    /// toolchain.
    pub fn convert(&self, artifact: &ModelArtifact, work_dir: &Path) -> Result<ModelArtifact> {
        let output = work_dir.join(MODEL_FILENAME);
        if let Ok(meta) = std::fs::metadata(&output) {
            if meta.len() > 0 {
                tracing::info!("{} already exists, skipping conversion", output.display());
                return ModelArtifact::from_path(&output, ModelFormat::Tflite);
            }
        }

        match artifact.format {
            ModelFormat::Checkpoint => self.export_native(&artifact.path, &output),
            ModelFormat::Onnx => {
                let saved = self.onnx_to_saved_model(&artifact.path, work_dir)?;
                self.compile_tflite(&saved.path, &output)
            }
            ModelFormat::SavedModel => self.compile_tflite(&artifact.path, &output),
            ModelFormat::Tflite => Ok(artifact.clone()),
        }
    }

    /// Single-tool shortcut: the detection framework exports straight
    /// from its native checkpoint to TFLite.
    fn export_native(&self, checkpoint: &Path, output: &Path) -> Result<ModelArtifact> {
        let mut cmd = Command::new("yolo");
        cmd.arg("export")
            .arg(format!("model={}", checkpoint.display()))
            .arg("format=tflite")
            .arg(format!("imgsz={}", self.options.image_size))
            .arg(format!("int8={}", self.options.quantize));
        run_tool(cmd, "yolo")?;

        let exported = exported_tflite_path(checkpoint, self.options.quantize);
        if !exported.exists() {
            return Err(PipelineError::Conversion {
                tool: "yolo".to_string(),
                detail: format!("export finished but {} was not produced", exported.display()),
            }
            .into());
        }

        std::fs::copy(&exported, output).map_err(|e| PipelineError::Conversion {
            tool: "yolo".to_string(),
            detail: format!("move export to {}: {e}", output.display()),
        })?;
        ModelArtifact::from_path(output, ModelFormat::Tflite)
    }

    fn onnx_to_saved_model(&self, onnx: &Path, work_dir: &Path) -> Result<ModelArtifact> {
        let out_dir = work_dir.join("saved_model");

        let mut cmd = Command::new("onnx2tf");
        cmd.arg("-i").arg(onnx).arg("-o").arg(&out_dir).arg("-osd");
        run_tool(cmd, "onnx2tf")?;

        Ok(ModelArtifact::directory(out_dir, ModelFormat::SavedModel))
    }

    fn compile_tflite(&self, saved_model_dir: &Path, output: &Path) -> Result<ModelArtifact> {
        let mut cmd = Command::new("tflite_convert");
        cmd.arg(format!("--saved_model_dir={}", saved_model_dir.display()))
            .arg(format!("--output_file={}", output.display()))
            .arg("--target_ops=TFLITE_BUILTINS,SELECT_TF_OPS");
        if self.options.quantize {
            cmd.arg("--post_training_quantize");
        }
        run_tool(cmd, "tflite_convert")?;

        ModelArtifact::from_path(output, ModelFormat::Tflite)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

fn run_tool(mut cmd: Command, tool: &str) -> Result<()> {
    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let install = Toolchain::find(tool)
                .map(|t| t.install)
                .unwrap_or("see the toolchain's documentation");
            return Err(PipelineError::ConversionDependency {
                tool: tool.to_string(),
                install: install.to_string(),
            }
            .into());
        }
        Err(e) => {
            return Err(PipelineError::Conversion {
                tool: tool.to_string(),
                detail: e.to_string(),
            }
            .into());
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Conversion {
            tool: tool.to_string(),
            detail: tail(stderr.trim(), 2000),
        }
        .into());
    }
    Ok(())
}

/// Last `max` bytes of a tool's stderr, on a char boundary.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

/// Where the framework exporter leaves its TFLite file: a sibling
/// `<stem>_saved_model` directory next to the checkpoint.
fn exported_tflite_path(checkpoint: &Path, quantize: bool) -> PathBuf {
    let stem = checkpoint
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "model".to_string());
    let precision = if quantize { "int8" } else { "float32" };
    checkpoint
        .with_file_name(format!("{stem}_saved_model"))
        .join(format!("{stem}_{precision}.tflite"))
}
