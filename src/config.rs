use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::defaults;
use crate::constants::files::{
    DEFAULT_BALANCED_DIR, DEFAULT_EXTRACTED_DIR, DEFAULT_PROCESSED_DIR, DEFAULT_RAW_DIR,
};
use crate::errors::PipelineError;
use crate::types::SourceId;

/// Policy for filling or dropping missing cells during cleaning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValueStrategy {
    /// Fill every gap: numeric → 0, `days_resolution` → local quantile, text → `Unknown`.
    #[default]
    Conservative,
    /// Drop rows that are mostly empty, then fill numeric gaps with the
    /// column quantile and text gaps with the column mode.
    Aggressive,
}

/// Character whitelist applied by the text cleaner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningVariant {
    /// Keep only ASCII alphanumerics and whitespace.
    Basic,
    /// Keep word characters, whitespace, and `.,!?-`.
    #[default]
    Strict,
}

/// Directory layout shared by all stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineLayout {
    /// Raw `<Source>_original.json` dumps.
    pub raw_dir: PathBuf,
    /// Extracted `<Source>_data.csv` files.
    pub extracted_dir: PathBuf,
    /// Cleaned, labeled, and merged CSVs plus statistics.
    pub processed_dir: PathBuf,
    /// Balanced validation, test, and training splits.
    pub balanced_dir: PathBuf,
}

impl Default for PipelineLayout {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            extracted_dir: PathBuf::from(DEFAULT_EXTRACTED_DIR),
            processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            balanced_dir: PathBuf::from(DEFAULT_BALANCED_DIR),
        }
    }
}

impl PipelineLayout {
    /// Default layout rooted at `root` instead of the working directory.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_dir: root.join(DEFAULT_RAW_DIR),
            extracted_dir: root.join(DEFAULT_EXTRACTED_DIR),
            processed_dir: root.join(DEFAULT_PROCESSED_DIR),
            balanced_dir: root.join(DEFAULT_BALANCED_DIR),
        }
    }
}

/// Top-level pipeline configuration threaded through every stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// RNG seed that controls every sampling, shuffling, and splitting step.
    pub seed: u64,
    /// Missing-value policy used by the cleaner.
    pub strategy: MissingValueStrategy,
    /// Character whitelist used by the cleaner.
    pub cleaning: CleaningVariant,
    /// Sources extracted from `layout.raw_dir`, in order.
    pub sources: Vec<SourceId>,
    /// Sources excluded from balancing.
    pub denylist: Vec<SourceId>,
    /// Lower bound applied to the smallest (source, label) population.
    pub min_cell_floor: usize,
    /// Training-set sizes to produce when feasible.
    pub requested_sizes: Vec<usize>,
    /// Quantile used for local imputation and the global label threshold.
    pub label_quantile: f64,
    /// Draw/population ratio above which a cell is reported as oversampled.
    pub oversample_warn_ratio: f64,
    /// Working-directory layout.
    pub layout: PipelineLayout,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: defaults::SEED,
            strategy: MissingValueStrategy::default(),
            cleaning: CleaningVariant::default(),
            sources: defaults::SOURCES.iter().map(|s| s.to_string()).collect(),
            denylist: defaults::DENYLIST.iter().map(|s| s.to_string()).collect(),
            min_cell_floor: defaults::MIN_CELL_FLOOR,
            requested_sizes: defaults::REQUESTED_SIZES.to_vec(),
            label_quantile: defaults::LABEL_QUANTILE,
            oversample_warn_ratio: defaults::OVERSAMPLE_WARN_RATIO,
            layout: PipelineLayout::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validated()
    }

    /// Reject values no stage can run with.
    pub fn validated(self) -> Result<Self, PipelineError> {
        if !(self.label_quantile > 0.0 && self.label_quantile < 1.0) {
            return Err(PipelineError::Configuration(format!(
                "label_quantile must lie in (0, 1), got {}",
                self.label_quantile
            )));
        }
        if self.oversample_warn_ratio <= 0.0 {
            return Err(PipelineError::Configuration(
                "oversample_warn_ratio must be positive".to_string(),
            ));
        }
        if self.requested_sizes.contains(&0) {
            return Err(PipelineError::Configuration(
                "requested training sizes must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    /// Whether `source` is excluded from balancing.
    pub fn is_denied(&self, source: &str) -> bool {
        self.denylist.iter().any(|denied| denied == source)
    }
}
