use std::path::PathBuf;
use thiserror::Error;

/// Every way the pipeline can fail. Each variant renders with enough
/// detail for the operator to remediate by hand and re-run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "missing conversion toolchains: {}\ninstall with:\n  {}",
        .missing.join(", "),
        .install.join("\n  ")
    )]
    DependencyMissing {
        missing: Vec<String>,
        install: Vec<String>,
    },

    #[error(
        "no acquisition strategy produced a usable model\n\nmanual download:\n  1. visit {url}\n  2. download '{filename}'\n  3. place it in {}",
        .dir.display()
    )]
    Acquisition {
        url: String,
        filename: String,
        dir: PathBuf,
    },

    #[error("{tool} is not installed\ninstall with: {install}")]
    ConversionDependency { tool: String, install: String },

    #[error("conversion failed in {tool}: {detail}")]
    Conversion { tool: String, detail: String },

    #[error("artifact at {}: {detail}", .path.display())]
    Validation { path: PathBuf, detail: String },

    #[error("deployment failed: {detail}")]
    Deployment { detail: String },
}

impl PipelineError {
    pub fn validation(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn deployment(detail: impl Into<String>) -> Self {
        Self::Deployment {
            detail: detail.into(),
        }
    }
}
