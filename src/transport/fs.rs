use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::PipelineError;
use crate::types::SourceId;

/// Fail with `InputNotFound` unless `path` exists.
pub fn require_path(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::InputNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Create the parent directory of `path` when it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Files directly under `dir` whose name ends with `suffix`, keyed by the
/// name prefix and sorted by it.
///
/// `Eclipse_data.csv` with suffix `_data.csv` yields `("Eclipse", path)`.
pub fn files_with_suffix(
    dir: &Path,
    suffix: &str,
) -> Result<Vec<(SourceId, PathBuf)>, PipelineError> {
    require_path(dir)?;
    let mut found: Vec<(SourceId, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let stem = name.strip_suffix(suffix)?;
            if stem.is_empty() {
                return None;
            }
            Some((stem.to_string(), entry.path().to_path_buf()))
        })
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}
