use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use chessprep::acquire::{AcquireStrategy, Acquirer, ModelSource};
use chessprep::artifact::{ModelArtifact, ModelFormat};
use chessprep::convert::Converter;
use chessprep::deploy::{self, DeployTarget, MODEL_FILENAME};
use chessprep::error::PipelineError;
use chessprep::labels::{self, PIECE_LABELS};
use chessprep::validate;

static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "chessprep-it-{}-{}-{tag}",
        std::process::id(),
        DIR_SEQ.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// Port 9 (discard) is not listening; connecting fails immediately
// without leaving the machine.
fn unroutable(filename: &str) -> AcquireStrategy {
    AcquireStrategy::DirectUrl {
        url: format!("http://127.0.0.1:9/{filename}"),
        filename: filename.to_string(),
        format: ModelFormat::Onnx,
        sha256: None,
    }
}

#[tokio::test]
async fn acquirer_skips_download_when_artifact_exists() {
    let work_dir = scratch_dir("idempotent");
    // First candidate of the default source is the registry checkpoint.
    let seeded = work_dir.join("best.pt");
    std::fs::write(&seeded, b"pretend checkpoint").unwrap();

    let artifact = Acquirer::new()
        .acquire(&ModelSource::chess_default(), &work_dir, |_, _| {})
        .await
        .unwrap();

    assert_eq!(artifact.path, seeded);
    assert_eq!(artifact.format, ModelFormat::Checkpoint);
    assert_eq!(std::fs::read(&seeded).unwrap(), b"pretend checkpoint");

    std::fs::remove_dir_all(&work_dir).unwrap();
}

#[tokio::test]
async fn acquirer_tries_strategies_in_declared_order() {
    let work_dir = scratch_dir("fallback");
    // The second strategy's file is already present; reaching it proves
    // the acquirer moved past the failed first strategy in order.
    std::fs::write(work_dir.join("second.onnx"), b"onnx bytes").unwrap();

    let source = ModelSource {
        strategies: vec![unroutable("first.onnx"), unroutable("second.onnx")],
    };

    let artifact = Acquirer::new()
        .acquire(&source, &work_dir, |_, _| {})
        .await
        .unwrap();

    assert!(artifact.path.ends_with("second.onnx"));
    assert!(!work_dir.join("first.onnx").exists());

    std::fs::remove_dir_all(&work_dir).unwrap();
}

#[tokio::test]
async fn exhausted_strategies_report_manual_instructions() {
    let work_dir = scratch_dir("exhausted");
    // A zero-byte placeholder must not satisfy the skip check.
    std::fs::write(work_dir.join("model.onnx"), b"").unwrap();

    let source = ModelSource {
        strategies: vec![unroutable("model.onnx")],
    };

    let err = Acquirer::new()
        .acquire(&source, &work_dir, |_, _| {})
        .await
        .unwrap_err();

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Acquisition { url, filename, .. }) => {
            assert_eq!(url, "http://127.0.0.1:9/model.onnx");
            assert_eq!(filename, "model.onnx");
        }
        other => panic!("expected Acquisition error, got {other:?}"),
    }
    let rendered = err.to_string();
    assert!(rendered.contains("manual download"));
    assert!(rendered.contains("model.onnx"));

    std::fs::remove_dir_all(&work_dir).unwrap();
}

#[test]
fn staging_yields_exactly_two_asset_files() {
    let root = scratch_dir("staging");
    let model = root.join("converted.tflite");
    std::fs::write(&model, vec![42u8; 2048]).unwrap();

    let size = validate::validate(&model).unwrap();
    let artifact = ModelArtifact::from_path(&model, ModelFormat::Tflite).unwrap();
    assert_eq!(artifact.size, size);

    let target = DeployTarget::new(root.join("app/src/main/assets"));
    let staged = deploy::stage(&artifact, &target).unwrap();
    labels::write_manifest(&target.labels_path()).unwrap();

    assert_eq!(std::fs::metadata(&staged).unwrap().len(), size);

    let mut entries: Vec<String> = std::fs::read_dir(target.assets_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["chess_yolo.tflite", "labels.txt"]);

    let manifest = std::fs::read_to_string(target.labels_path()).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines, PIECE_LABELS);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn empty_artifact_never_reaches_staging() {
    let root = scratch_dir("gate");
    let model = root.join("broken.tflite");
    std::fs::write(&model, b"").unwrap();

    assert!(validate::validate(&model).is_err());
    assert!(!root.join("app").exists());

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn converter_reuses_existing_output() {
    let work_dir = scratch_dir("convert-skip");
    std::fs::write(work_dir.join(MODEL_FILENAME), vec![9u8; 512]).unwrap();

    // The input deliberately does not exist; the pre-existing output
    // must short-circuit before any toolchain is invoked.
    let input = ModelArtifact {
        path: work_dir.join("missing.onnx"),
        format: ModelFormat::Onnx,
        size: 0,
    };

    let tflite = Converter::default().convert(&input, &work_dir).unwrap();
    assert_eq!(tflite.path, work_dir.join(MODEL_FILENAME));
    assert_eq!(tflite.size, 512);

    std::fs::remove_dir_all(&work_dir).unwrap();
}
