use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceId;

/// Error type for extraction, cleaning, splitting, and persistence failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required file or directory is absent.
    #[error("required input '{}' does not exist", .path.display())]
    InputNotFound {
        /// Missing path.
        path: PathBuf,
    },
    /// One unit of a dump could not be parsed.
    #[error("malformed record in '{}' at line {line}: {reason}", .path.display())]
    MalformedRecord {
        /// Dump file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Parser message.
        reason: String,
    },
    /// A stage had nothing to work with.
    #[error("stage '{stage}' produced no usable rows: {details}")]
    NoValidData {
        /// `extract`, `merge`, or `split`.
        stage: &'static str,
        /// What was missing.
        details: String,
    },
    /// A training size above the balanced maximum.
    #[error("requested training size {requested} exceeds balanced maximum {max}")]
    InfeasibleSize {
        /// Requested rows.
        requested: usize,
        /// Largest balanced size.
        max: usize,
    },
    /// A source has no rows for one label.
    #[error("source '{source_id}' has no rows with label {label}; cannot sample a balanced cell")]
    EmptyCell {
        /// Source of the empty cell.
        source_id: SourceId,
        /// Missing label, `0` or `1`.
        label: u8,
    },
    /// Invalid configuration value or file.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// CSV read or write failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON failure outside per-line dump parsing.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn no_valid_data(stage: &'static str, details: impl Into<String>) -> Self {
        Self::NoValidData {
            stage,
            details: details.into(),
        }
    }
}
