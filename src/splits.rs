//! Source- and label-balanced validation, test, and training splits.
//!
//! Every (source, label) cell contributes the same number of rows to each
//! split. Cells are drawn with replacement, so a small cell is duplicated
//! rather than shrinking the split; such cells are reported as oversampled.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants::columns::LABELED_HEADER;
use crate::constants::files::{
    CSV_EXTENSION, MERGED_FILENAME, TEST_FILENAME, TRAIN_PREFIX, VALIDATION_FILENAME,
};
use crate::constants::splits::{
    STREAM_PARTITION, STREAM_SHUFFLE, STREAM_TRAIN, STREAM_VALIDATION_TEST,
};
use crate::data::{LabeledRecord, ResolutionLabel};
use crate::errors::PipelineError;
use crate::heuristics::{
    CellCounts, SizePlan, cell_floor, feasible_sizes, format_replay_factor,
    format_usize_with_commas, max_balanced_size, train_rows_per_cell,
};
use crate::sampler::{CellSampler, stream_key};
use crate::transport::tabular::{read_rows, write_rows_with_header};
use crate::types::SourceId;
use crate::verify::training_files;

/// Logical dataset partitions written by the splitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitLabel {
    /// Training split of the given total size.
    Train {
        /// Requested row count.
        size: usize,
    },
    /// Validation split.
    Validation,
    /// Test split.
    Test,
}

impl SplitLabel {
    /// Output file name, e.g. `balanced_train_2000.csv`.
    pub fn file_name(&self) -> String {
        match self {
            SplitLabel::Validation => VALIDATION_FILENAME.to_string(),
            SplitLabel::Test => TEST_FILENAME.to_string(),
            SplitLabel::Train { size } => format!("{TRAIN_PREFIX}{size}{CSV_EXTENSION}"),
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitLabel::Train { size } => write!(f, "train_{size}"),
            SplitLabel::Validation => f.write_str("validation"),
            SplitLabel::Test => f.write_str("test"),
        }
    }
}

/// One split ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct BalancedSplit {
    /// Which partition these rows belong to.
    pub label: SplitLabel,
    /// Shuffled rows, balanced across (source, label) cells.
    pub rows: Vec<LabeledRecord>,
}

/// A cell whose draw exceeded its population by more than the configured ratio.
#[derive(Clone, Debug, PartialEq)]
pub struct OversampledCell {
    /// `validation_test` or `train_<size>`.
    pub split: String,
    /// Source of the cell.
    pub source: SourceId,
    /// Label of the cell.
    pub label: ResolutionLabel,
    /// Rows available in the cell.
    pub population: usize,
    /// Rows drawn from the cell.
    pub drawn: usize,
    /// `drawn / population`.
    pub ratio: f64,
}

/// Every split computed for one merged table, before anything is written.
#[derive(Clone, Debug)]
pub struct BalancedSplits {
    /// Cell populations of the input table.
    pub counts: CellCounts,
    /// Per-cell target `m`.
    pub floor: usize,
    /// Feasible and dropped training sizes.
    pub sizes: SizePlan,
    /// Validation split.
    pub validation: BalancedSplit,
    /// Test split.
    pub test: BalancedSplit,
    /// Training splits, in feasible-size order.
    pub train: Vec<BalancedSplit>,
    /// Cells drawn beyond the warning ratio.
    pub oversampled: Vec<OversampledCell>,
}

impl BalancedSplits {
    /// Validation, test, then training splits in size order.
    pub fn all(&self) -> impl Iterator<Item = &BalancedSplit> {
        [&self.validation, &self.test]
            .into_iter()
            .chain(self.train.iter())
    }
}

/// Outcome of the split stage.
#[derive(Clone, Debug)]
pub struct SplitReport {
    /// Rows dropped by the denylist.
    pub excluded_rows: usize,
    /// Cell populations after the denylist.
    pub counts: CellCounts,
    /// Per-cell target `m`.
    pub floor: usize,
    /// Feasible and dropped training sizes.
    pub sizes: SizePlan,
    /// Written files with their row counts.
    pub files: Vec<(PathBuf, usize)>,
    /// Stale training files removed before writing.
    pub removed: Vec<PathBuf>,
    /// Cells drawn beyond the warning ratio.
    pub oversampled: Vec<OversampledCell>,
}

struct OversampleTracker {
    warn_ratio: f64,
    cells: Vec<OversampledCell>,
}

impl OversampleTracker {
    fn record(
        &mut self,
        split: &str,
        source: &str,
        label: ResolutionLabel,
        population: usize,
        drawn: usize,
    ) {
        if population == 0 {
            return;
        }
        let ratio = drawn as f64 / population as f64;
        if ratio <= self.warn_ratio {
            return;
        }
        warn!(
            split,
            source,
            label = label.as_u8(),
            population,
            drawn,
            "[bugsplit:split] cell oversampled {}",
            format_replay_factor(drawn, population)
        );
        self.cells.push(OversampledCell {
            split: split.to_string(),
            source: source.to_string(),
            label,
            population,
            drawn,
            ratio,
        });
    }
}

/// Build validation, test, and every feasible training split.
///
/// `rows` must already exclude denylisted sources.
pub fn build_balanced_splits(
    rows: &[LabeledRecord],
    config: &PipelineConfig,
) -> Result<BalancedSplits, PipelineError> {
    if rows.is_empty() {
        return Err(PipelineError::no_valid_data(
            "split",
            "no rows left after excluding denylisted sources",
        ));
    }
    let sampler = CellSampler::new(config.seed, rows);
    let counts = sampler.counts();
    let cells: Vec<(String, ResolutionLabel, usize)> = counts
        .iter()
        .map(|(source, label, population)| (source.to_string(), label, population))
        .collect();
    if let Some((source, label, _)) = cells.iter().find(|(_, _, population)| *population == 0) {
        return Err(PipelineError::EmptyCell {
            source_id: source.clone(),
            label: label.as_u8(),
        });
    }

    let floor = cell_floor(&counts, config.min_cell_floor);
    let source_count = counts.source_count();
    info!(
        seed = sampler.seed(),
        sources = source_count,
        smallest_cell = counts.smallest().unwrap_or(0),
        floor,
        "[bugsplit:split] cell floor"
    );

    let mut oversampled = OversampleTracker {
        warn_ratio: config.oversample_warn_ratio,
        cells: Vec::new(),
    };

    let per_cell = floor / 2;
    let mut validation = Vec::with_capacity(per_cell * cells.len());
    let mut test = Vec::with_capacity(per_cell * cells.len());
    for (source, label, population) in &cells {
        let label_key = label.as_u8().to_string();
        let mut drawn = sampler.draw(
            &stream_key(&[STREAM_VALIDATION_TEST, source, &label_key]),
            source,
            *label,
            per_cell,
        )?;
        oversampled.record(STREAM_VALIDATION_TEST, source, *label, *population, per_cell);
        sampler.shuffle(
            &stream_key(&[STREAM_PARTITION, source, &label_key]),
            &mut drawn,
        );
        let cell_test = drawn.split_off(per_cell / 2);
        validation.extend(drawn);
        test.extend(cell_test);
    }
    sampler.shuffle(
        &stream_key(&[STREAM_SHUFFLE, &SplitLabel::Validation.to_string()]),
        &mut validation,
    );
    sampler.shuffle(
        &stream_key(&[STREAM_SHUFFLE, &SplitLabel::Test.to_string()]),
        &mut test,
    );

    let sizes = feasible_sizes(
        &config.requested_sizes,
        max_balanced_size(floor, source_count),
    );
    for requested in &sizes.dropped {
        warn!(
            "[bugsplit:split] size dropped: {}",
            PipelineError::InfeasibleSize {
                requested: *requested,
                max: sizes.max,
            }
        );
    }

    let mut train = Vec::with_capacity(sizes.feasible.len());
    for size in &sizes.feasible {
        let size_key = size.to_string();
        let split_label = SplitLabel::Train { size: *size };
        let split_name = split_label.to_string();
        let per_cell = train_rows_per_cell(*size, source_count);
        let mut rows = Vec::with_capacity(per_cell * cells.len());
        for (source, label, population) in &cells {
            let label_key = label.as_u8().to_string();
            rows.extend(sampler.draw(
                &stream_key(&[STREAM_TRAIN, &size_key, source, &label_key]),
                source,
                *label,
                per_cell,
            )?);
            oversampled.record(&split_name, source, *label, *population, per_cell);
        }
        sampler.shuffle(
            &stream_key(&[STREAM_SHUFFLE, &split_name]),
            &mut rows,
        );
        info!(
            size = %format_usize_with_commas(*size),
            per_cell,
            rows = rows.len(),
            "[bugsplit:split] training split built"
        );
        train.push(BalancedSplit {
            label: split_label,
            rows,
        });
    }

    Ok(BalancedSplits {
        counts,
        floor,
        sizes,
        validation: BalancedSplit {
            label: SplitLabel::Validation,
            rows: validation,
        },
        test: BalancedSplit {
            label: SplitLabel::Test,
            rows: test,
        },
        train,
        oversampled: oversampled.cells,
    })
}

/// Remove `balanced_train_<size>.csv` files whose size is not in `keep`.
pub fn remove_stale_training_files(
    dir: &Path,
    keep: &[usize],
) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut removed = Vec::new();
    for (size, path) in training_files(dir)? {
        if keep.contains(&size) {
            continue;
        }
        fs::remove_file(&path)?;
        warn!("[bugsplit:split] removed stale {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}

/// Write every split into `dir`; returns each path with its row count.
pub fn write_splits(
    splits: &BalancedSplits,
    dir: &Path,
) -> Result<Vec<(PathBuf, usize)>, PipelineError> {
    let mut written = Vec::new();
    for split in splits.all() {
        let path = dir.join(split.label.file_name());
        write_rows_with_header(&path, &LABELED_HEADER, &split.rows)?;
        info!(
            split = %split.label,
            rows = split.rows.len(),
            "[bugsplit:split] wrote {}",
            path.display()
        );
        written.push((path, split.rows.len()));
    }
    Ok(written)
}

/// Drop rows whose source is denylisted; returns the kept rows and the drop count.
pub fn exclude_denied(
    rows: Vec<LabeledRecord>,
    config: &PipelineConfig,
) -> (Vec<LabeledRecord>, usize) {
    let before = rows.len();
    let kept: Vec<LabeledRecord> = rows
        .into_iter()
        .filter(|row| !config.is_denied(&row.source))
        .collect();
    let excluded = before - kept.len();
    (kept, excluded)
}

/// Balance `layout.processed_dir/merged_processed_labeled.csv` into `layout.balanced_dir`.
pub fn run_split(config: &PipelineConfig) -> Result<SplitReport, PipelineError> {
    let merged_path = config.layout.processed_dir.join(MERGED_FILENAME);
    let rows: Vec<LabeledRecord> = read_rows(&merged_path)?;
    let (rows, excluded_rows) = exclude_denied(rows, config);
    info!(
        rows = rows.len(),
        excluded = excluded_rows,
        denylist = ?config.denylist,
        "[bugsplit:split] loaded {}",
        merged_path.display()
    );

    let splits = build_balanced_splits(&rows, config)?;
    let removed = remove_stale_training_files(&config.layout.balanced_dir, &splits.sizes.feasible)?;
    let files = write_splits(&splits, &config.layout.balanced_dir)?;
    Ok(SplitReport {
        excluded_rows,
        counts: splits.counts,
        floor: splits.floor,
        sizes: splits.sizes,
        files,
        removed,
        oversampled: splits.oversampled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(source: &str, label: ResolutionLabel, idx: usize) -> LabeledRecord {
        LabeledRecord {
            short_desc: format!("{source} bug {idx}"),
            product: "Core".into(),
            priority: "P3".into(),
            bug_severity: "normal".into(),
            days_resolution: idx as f64,
            comments: "body".into(),
            source: source.into(),
            label,
        }
    }

    fn table(cells: &[(&str, usize, usize)]) -> Vec<LabeledRecord> {
        let mut rows = Vec::new();
        for (source, fast, slow) in cells {
            rows.extend((0..*fast).map(|idx| row(source, ResolutionLabel::Fast, idx)));
            rows.extend((0..*slow).map(|idx| row(source, ResolutionLabel::Slow, idx)));
        }
        rows
    }

    fn cell_sizes(rows: &[LabeledRecord]) -> HashMap<(String, u8), usize> {
        let mut counts = HashMap::new();
        for row in rows {
            *counts
                .entry((row.source.clone(), row.label.as_u8()))
                .or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn odd_per_cell_draw_keeps_both_halves_balanced() {
        let rows = table(&[("A", 30, 20), ("B", 25, 21)]);
        let config = PipelineConfig {
            min_cell_floor: 7,
            requested_sizes: vec![],
            ..PipelineConfig::default()
        };
        let splits = build_balanced_splits(&rows, &config).unwrap();
        assert_eq!(splits.floor, 20);
        // 10 per cell: 5 validation, 5 test
        assert!(cell_sizes(&splits.validation.rows).values().all(|n| *n == 5));
        assert!(cell_sizes(&splits.test.rows).values().all(|n| *n == 5));

        let config = PipelineConfig {
            min_cell_floor: 22,
            requested_sizes: vec![],
            ..PipelineConfig::default()
        };
        let splits = build_balanced_splits(&rows, &config).unwrap();
        // 11 per cell: 5 validation, 6 test
        assert!(cell_sizes(&splits.validation.rows).values().all(|n| *n == 5));
        assert!(cell_sizes(&splits.test.rows).values().all(|n| *n == 6));
        assert_eq!(splits.sizes.feasible, vec![88]);
    }

    #[test]
    fn single_label_source_is_an_empty_cell() {
        let rows = table(&[("A", 10, 10), ("B", 10, 0)]);
        let err = build_balanced_splits(&rows, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::EmptyCell { ref source_id, label: 1 } if source_id == "B"
        ));
    }

    #[test]
    fn empty_input_is_no_valid_data() {
        let err = build_balanced_splits(&[], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidData { stage: "split", .. }));
    }

    #[test]
    fn oversampled_cells_are_reported() {
        let rows = table(&[("A", 800, 300), ("B", 200, 900)]);
        let splits = build_balanced_splits(&rows, &PipelineConfig::default()).unwrap();
        let train_2000: Vec<&OversampledCell> = splits
            .oversampled
            .iter()
            .filter(|cell| cell.split == "train_2000")
            .collect();
        assert_eq!(train_2000.len(), 2);
        assert!(
            train_2000
                .iter()
                .any(|cell| cell.source == "B" && cell.label == ResolutionLabel::Fast)
        );
        assert!(
            train_2000
                .iter()
                .any(|cell| cell.source == "A" && cell.label == ResolutionLabel::Slow)
        );
        let held_out: Vec<&OversampledCell> = splits
            .oversampled
            .iter()
            .filter(|cell| cell.split == STREAM_VALIDATION_TEST)
            .collect();
        assert_eq!(held_out.len(), 1);
        assert_eq!(held_out[0].source, "B");
        assert_eq!(held_out[0].drawn, 250);
        assert_eq!(held_out[0].population, 200);
    }

    #[test]
    fn denylisted_sources_are_excluded() {
        let rows = table(&[("KDE", 2, 2), ("W3C", 3, 1)]);
        let (kept, excluded) = exclude_denied(rows, &PipelineConfig::default());
        assert_eq!(excluded, 4);
        assert!(kept.iter().all(|row| row.source == "KDE"));
    }

    #[test]
    fn split_file_names() {
        let train = SplitLabel::Train { size: 2000 };
        assert_eq!(train.file_name(), "balanced_train_2000.csv");
        assert_eq!(train.to_string(), "train_2000");
        assert_eq!(SplitLabel::Validation.file_name(), "balanced_validation.csv");
        assert_eq!(SplitLabel::Test.file_name(), "balanced_test.csv");
    }

    #[test]
    fn stale_training_files_are_removed() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        for name in [
            "balanced_train_1000.csv",
            "balanced_train_5000.csv",
            "balanced_validation.csv",
        ] {
            fs::write(dir.join(name), "header\n").unwrap();
        }
        let removed = remove_stale_training_files(dir, &[1000, 2000]).unwrap();
        assert_eq!(removed, vec![dir.join("balanced_train_5000.csv")]);
        assert!(dir.join("balanced_train_1000.csv").exists());
        assert!(dir.join("balanced_validation.csv").exists());
        assert!(
            remove_stale_training_files(&dir.join("missing"), &[])
                .unwrap()
                .is_empty()
        );
    }
}
