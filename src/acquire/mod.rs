use anyhow::{anyhow, bail, Result};
use futures::StreamExt;
use reqwest::{header, Client};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub mod registry;

use crate::artifact::{ModelArtifact, ModelFormat};
use crate::error::PipelineError;
use registry::Registry;

/// The published chess-piece detector.
pub const DETECTOR_REPO: &str = "yamero999/chess-piece-detection-yolo11n";
pub const DETECTOR_FILE: &str = "best.pt";

/// Base model substituted when the trained detector cannot be pulled.
pub const BASE_REPO: &str = "Ultralytics/YOLO11";
pub const BASE_FILE: &str = "yolo11n.pt";

/// Mobile ONNX export mirrored alongside the checkpoint. Already traced
/// at the 640px input resolution the app expects.
pub const ONNX_URL: &str =
    "https://huggingface.co/yamero999/chess-piece-detection-yolo11n/resolve/main/best_mobile.onnx";

/// One registry coordinate: which repository, which file inside it.
#[derive(Debug, Clone)]
pub struct RegistryRef {
    pub repo: String,
    pub file: String,
    pub format: ModelFormat,
}

/// A single way of obtaining the source model. Strategies are declared in
/// order and evaluated in sequence; each catches its own failure mode.
#[derive(Debug, Clone)]
pub enum AcquireStrategy {
    /// Identifier-based lookup with a substitute identifier tried before
    /// giving up on the registry entirely.
    Registry {
        primary: RegistryRef,
        fallback: RegistryRef,
    },
    /// Plain HTTPS fetch of a fixed URL.
    DirectUrl {
        url: String,
        filename: String,
        format: ModelFormat,
        sha256: Option<String>,
    },
}

impl AcquireStrategy {
    pub fn direct(url: impl Into<String>, format: ModelFormat) -> Self {
        let url = url.into();
        let filename =
            filename_from_url(&url).unwrap_or_else(|| format!("model.{}", format.tag()));
        AcquireStrategy::DirectUrl {
            url,
            filename,
            format,
            sha256: None,
        }
    }
}

/// Ordered acquisition strategies. The first success terminates
/// acquisition; exhausting the list is an acquisition failure.
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub strategies: Vec<AcquireStrategy>,
}

impl ModelSource {
    /// Default source for the chess detector: registry checkpoint (with
    /// the base-model substitute), then the pre-exported ONNX mirror.
    pub fn chess_default() -> Self {
        Self {
            strategies: vec![
                AcquireStrategy::Registry {
                    primary: RegistryRef {
                        repo: DETECTOR_REPO.to_string(),
                        file: DETECTOR_FILE.to_string(),
                        format: ModelFormat::Checkpoint,
                    },
                    fallback: RegistryRef {
                        repo: BASE_REPO.to_string(),
                        file: BASE_FILE.to_string(),
                        format: ModelFormat::Checkpoint,
                    },
                },
                AcquireStrategy::direct(ONNX_URL, ModelFormat::Onnx),
            ],
        }
    }

    /// URL and filename quoted in the manual-recovery instructions when
    /// every strategy has been exhausted.
    pub fn manual_reference(&self) -> (String, String) {
        for strategy in &self.strategies {
            if let AcquireStrategy::DirectUrl { url, filename, .. } = strategy {
                return (url.clone(), filename.clone());
            }
        }
        match self.strategies.first() {
            Some(AcquireStrategy::Registry { primary, .. }) => (
                registry::browse_url(&primary.repo),
                primary.file.clone(),
            ),
            _ => (
                ONNX_URL.to_string(),
                filename_from_url(ONNX_URL).unwrap_or_else(|| "best_mobile.onnx".to_string()),
            ),
        }
    }
}

/// Obtains the source model into the work directory, trying each strategy
/// in declared order. Re-runs are idempotent: an existing non-empty file
/// short-circuits before any network traffic.
pub struct Acquirer {
    client: Client,
    registry: Registry,
}

impl Acquirer {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            registry: Registry::new(),
        }
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            client: Client::new(),
            registry,
        }
    }

    pub async fn acquire<F>(
        &self,
        source: &ModelSource,
        work_dir: &Path,
        mut progress: F,
    ) -> Result<ModelArtifact>
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        std::fs::create_dir_all(work_dir)
            .map_err(|e| anyhow!("create work dir {}: {e}", work_dir.display()))?;

        for strategy in &source.strategies {
            match strategy {
                AcquireStrategy::Registry { primary, fallback } => {
                    for rref in [primary, fallback] {
                        let dest = work_dir.join(&rref.file);
                        if let Some(existing) = existing_artifact(&dest, rref.format) {
                            println!("{} already exists, skipping download", dest.display());
                            return Ok(existing);
                        }
                        match self.fetch_registry(rref, &dest, &mut progress).await {
                            Ok(artifact) => return Ok(artifact),
                            Err(e) => {
                                tracing::warn!(repo = %rref.repo, "registry pull failed: {e}");
                                println!("registry {} unavailable, trying next source", rref.repo);
                            }
                        }
                    }
                }
                AcquireStrategy::DirectUrl {
                    url,
                    filename,
                    format,
                    sha256,
                } => {
                    let dest = work_dir.join(filename);
                    if let Some(existing) = existing_artifact(&dest, *format) {
                        println!("{} already exists, skipping download", dest.display());
                        return Ok(existing);
                    }
                    match self
                        .fetch_url(url, sha256.as_deref(), &dest, *format, &mut progress)
                        .await
                    {
                        Ok(artifact) => return Ok(artifact),
                        Err(e) => {
                            tracing::warn!(url = %url, "download failed: {e}");
                            println!("download from {url} failed, trying next source");
                        }
                    }
                }
            }
        }

        let (url, filename) = source.manual_reference();
        Err(PipelineError::Acquisition {
            url,
            filename,
            dir: work_dir.to_path_buf(),
        }
        .into())
    }

    async fn fetch_registry<F>(
        &self,
        rref: &RegistryRef,
        dest: &Path,
        progress: &mut F,
    ) -> Result<ModelArtifact>
    where
        F: FnMut(u64, u64),
    {
        let info = self.registry.repo_info(&rref.repo).await?;
        if !info.has_file(&rref.file) {
            bail!("{} does not carry {}", rref.repo, rref.file);
        }

        let url = self.registry.resolve_url(&rref.repo, &rref.file)?;
        self.download(url.as_str(), dest, progress).await?;
        ModelArtifact::from_path(dest, rref.format)
    }

    async fn fetch_url<F>(
        &self,
        url: &str,
        sha256: Option<&str>,
        dest: &Path,
        format: ModelFormat,
        progress: &mut F,
    ) -> Result<ModelArtifact>
    where
        F: FnMut(u64, u64),
    {
        self.download(url, dest, progress).await?;
        if let Some(expected) = sha256 {
            verify_digest(dest, expected).await?;
        }
        ModelArtifact::from_path(dest, format)
    }

    /// Streams the response body to `<dest>.partial`, then renames into
    /// place so an interrupted run never leaves a half-written artifact
    /// at the destination path.
    async fn download<F>(&self, url: &str, dest: &Path, progress: &mut F) -> Result<()>
    where
        F: FnMut(u64, u64),
    {
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            bail!("GET {url} returned {}", res.status());
        }

        let total = res
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let staging = staging_path(dest);
        let mut file = tokio::fs::File::create(&staging).await?;
        let mut body = res.bytes_stream();
        let mut completed = 0u64;

        while let Some(item) = body.next().await {
            let chunk = item?;
            file.write_all(&chunk).await?;
            completed += chunk.len() as u64;
            progress(completed, total);
        }
        file.flush().await?;
        drop(file);

        if completed == 0 {
            let _ = tokio::fs::remove_file(&staging).await;
            bail!("GET {url} returned an empty body");
        }

        tokio::fs::rename(&staging, dest).await?;
        Ok(())
    }
}

impl Default for Acquirer {
    fn default() -> Self {
        Self::new()
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

fn existing_artifact(dest: &Path, format: ModelFormat) -> Option<ModelArtifact> {
    match std::fs::metadata(dest) {
        Ok(meta) if meta.len() > 0 => Some(ModelArtifact {
            path: dest.to_path_buf(),
            format,
            size: meta.len(),
        }),
        _ => None,
    }
}

async fn verify_digest(path: &Path, expected: &str) -> Result<()> {
    let path = path.to_owned();
    let expected = expected.to_owned();

    tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        let digest = format!("{:x}", hasher.finalize());

        if digest != expected {
            bail!("digest mismatch: expected {expected}, got {digest}");
        }
        Ok(())
    })
    .await?
}

pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .next_back()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url(ONNX_URL).as_deref(),
            Some("best_mobile.onnx")
        );
        assert_eq!(filename_from_url("https://example.com/"), None);
        assert_eq!(filename_from_url("not a url"), None);
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/tmp/best_mobile.onnx")),
            PathBuf::from("/tmp/best_mobile.onnx.partial")
        );
    }

    #[test]
    fn test_default_source_order() {
        let source = ModelSource::chess_default();
        assert_eq!(source.strategies.len(), 2);
        match &source.strategies[0] {
            AcquireStrategy::Registry { primary, fallback } => {
                assert_eq!(primary.repo, DETECTOR_REPO);
                assert_eq!(fallback.file, BASE_FILE);
                assert_eq!(primary.format, ModelFormat::Checkpoint);
            }
            other => panic!("expected registry strategy first, got {other:?}"),
        }
        match &source.strategies[1] {
            AcquireStrategy::DirectUrl { filename, format, .. } => {
                assert_eq!(filename, "best_mobile.onnx");
                assert_eq!(*format, ModelFormat::Onnx);
            }
            other => panic!("expected direct-url strategy second, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_reference_prefers_direct_url() {
        let source = ModelSource::chess_default();
        let (url, filename) = source.manual_reference();
        assert_eq!(url, ONNX_URL);
        assert_eq!(filename, "best_mobile.onnx");
    }

    #[tokio::test]
    async fn test_verify_digest() {
        let path = std::env::temp_dir().join(format!("chessprep-digest-{}", std::process::id()));
        std::fs::write(&path, b"model bytes").unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"model bytes");
        let good = format!("{:x}", hasher.finalize());

        assert!(verify_digest(&path, &good).await.is_ok());
        assert!(verify_digest(&path, "deadbeef").await.is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
