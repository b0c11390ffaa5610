use anyhow::Result;
use std::path::Path;

use crate::error::PipelineError;

/// Gate between conversion and staging: the file must exist and be
/// strictly larger than zero bytes. A failure here is a pipeline defect,
/// never a warning. Returns the byte size.
pub fn validate(path: &Path) -> Result<u64> {
    let meta = std::fs::metadata(path)
        .map_err(|_| PipelineError::validation(path, "file is missing"))?;

    if meta.len() == 0 {
        return Err(PipelineError::validation(path, "file is empty").into());
    }
    Ok(meta.len())
}
