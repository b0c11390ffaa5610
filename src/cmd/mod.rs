use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::acquire::{Acquirer, ModelSource};
use crate::artifact::{ModelArtifact, ModelFormat};
use crate::convert::{ConvertOptions, Converter};
use crate::deploy::{self, DeployTarget};
use crate::deps;
use crate::envconfig::PipelineConfig;
use crate::error::PipelineError;
use crate::format::human_bytes;
use crate::progress;
use crate::validate;

fn banner(title: &str) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// The full pipeline. Every stage completes or aborts before the next
/// begins; a failure anywhere surfaces as a non-zero exit in main.
pub async fn run(config: &PipelineConfig) -> Result<()> {
    println!("Chess piece detection - model deployment pipeline");

    banner("STEP 1: Checking conversion toolchains");
    ensure_toolchains()?;

    banner("STEP 2: Acquiring detection model");
    let acquired = acquire_model(config).await?;

    banner("STEP 3: Converting to TFLite");
    let tflite = convert_model(config, &acquired)?;

    banner("STEP 4: Validating artifact");
    let size = validate::validate(&tflite.path)?;
    println!("{} ({})", tflite.path.display(), human_bytes(size));

    banner("STEP 5: Staging into app assets");
    let target = DeployTarget::new(config.assets_dir());
    let staged = deploy::stage(&tflite, &target)?;
    println!("model  -> {}", staged.display());
    crate::labels::write_manifest(&target.labels_path())?;
    println!("labels -> {}", target.labels_path().display());

    banner("SUCCESS: model is ready");
    println!("Next steps:");
    println!("  1. gradlew assembleDebug");
    println!("  2. adb install app/build/outputs/apk/debug/app-debug.apk");
    Ok(())
}

pub async fn check() -> Result<()> {
    banner("Conversion toolchains");
    ensure_toolchains()?;
    println!("\nall toolchains present");
    Ok(())
}

pub async fn acquire(config: &PipelineConfig) -> Result<()> {
    banner("Acquiring detection model");
    acquire_model(config).await?;
    Ok(())
}

pub async fn convert(config: &PipelineConfig, input: PathBuf) -> Result<()> {
    let format = ModelFormat::infer(&input).ok_or_else(|| {
        anyhow!(
            "cannot tell the model format of {} (expected .pt, .onnx or .tflite)",
            input.display()
        )
    })?;
    let artifact = ModelArtifact::from_path(&input, format)?;

    banner("Converting to TFLite");
    let tflite = convert_model(config, &artifact)?;
    let size = validate::validate(&tflite.path)?;
    println!("{} ({})", tflite.path.display(), human_bytes(size));
    Ok(())
}

pub async fn stage(config: &PipelineConfig, input: PathBuf) -> Result<()> {
    banner("Staging into app assets");
    let size = validate::validate(&input)?;
    println!("{} ({})", input.display(), human_bytes(size));

    let artifact = ModelArtifact::from_path(&input, ModelFormat::Tflite)?;
    let target = DeployTarget::new(config.assets_dir());
    let staged = deploy::stage(&artifact, &target)?;
    println!("model  -> {}", staged.display());
    crate::labels::write_manifest(&target.labels_path())?;
    println!("labels -> {}", target.labels_path().display());
    Ok(())
}

pub async fn labels(config: &PipelineConfig) -> Result<()> {
    let target = DeployTarget::new(config.assets_dir());
    std::fs::create_dir_all(target.assets_dir()).map_err(|e| {
        PipelineError::deployment(format!("create {}: {e}", target.assets_dir().display()))
    })?;
    crate::labels::write_manifest(&target.labels_path())?;
    println!("labels -> {}", target.labels_path().display());
    Ok(())
}

pub async fn version() -> Result<()> {
    println!("chessprep {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn ensure_toolchains() -> Result<()> {
    let statuses = deps::check_all();
    for status in &statuses {
        if status.present {
            println!("{:<16} ok", status.name);
        } else {
            println!("{:<16} MISSING ({})", status.name, status.install);
        }
    }

    let absent: Vec<_> = statuses.iter().filter(|s| !s.present).collect();
    if absent.is_empty() {
        return Ok(());
    }
    Err(PipelineError::DependencyMissing {
        missing: absent.iter().map(|s| s.name.to_string()).collect(),
        install: absent.iter().map(|s| s.install.to_string()).collect(),
    }
    .into())
}

async fn acquire_model(config: &PipelineConfig) -> Result<ModelArtifact> {
    let source = ModelSource::chess_default();

    let bar = progress::download_bar("downloading");
    let tick = bar.clone();
    let artifact = Acquirer::new()
        .acquire(&source, &config.work_dir, move |completed, total| {
            if total > 0 {
                tick.set_length(total);
            }
            tick.set_position(completed);
        })
        .await;
    bar.finish_and_clear();

    let artifact = artifact?;
    println!(
        "acquired {} ({}, {})",
        artifact.path.display(),
        artifact.format,
        human_bytes(artifact.size)
    );
    Ok(artifact)
}

fn convert_model(config: &PipelineConfig, artifact: &ModelArtifact) -> Result<ModelArtifact> {
    let options = ConvertOptions {
        image_size: config.image_size,
        quantize: config.quantize,
    };

    let spinner = progress::spinner("running conversion toolchain");
    let result = Converter::new(options).convert(artifact, &config.work_dir);
    spinner.finish_and_clear();

    let tflite = result?;
    println!("converted -> {}", tflite.path.display());
    Ok(tflite)
}
