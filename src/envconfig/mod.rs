use std::env;
use std::path::PathBuf;

/// Runtime configuration for a pipeline run. The project root is always
/// explicit (flag or environment), never inferred from the working
/// directory.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the Android project tree the artifacts are staged into.
    pub project_root: PathBuf,
    /// Scratch directory for downloads and intermediate conversions.
    pub work_dir: PathBuf,
    /// Square input resolution, used consistently across every stage.
    pub image_size: u32,
    /// Quantized export. Off by default; the app expects full precision.
    pub quantize: bool,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let project_root = env::var("CHESSPREP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self::for_root(project_root)
    }

    pub fn for_root(project_root: PathBuf) -> Self {
        let work_dir = env::var("CHESSPREP_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("build").join("model"));

        Self {
            project_root,
            work_dir,
            image_size: env::var("CHESSPREP_IMGSZ")
                .unwrap_or_else(|_| "640".to_string())
                .parse()
                .unwrap_or(640),
            quantize: env::var("CHESSPREP_INT8")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Destination directory consumed by the Android app.
    pub fn assets_dir(&self) -> PathBuf {
        self.project_root
            .join("app")
            .join("src")
            .join("main")
            .join("assets")
    }
}
