//! Balance checks over written split files.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants::files::{CSV_EXTENSION, TEST_FILENAME, TRAIN_PREFIX, VALIDATION_FILENAME};
use crate::data::LabeledRecord;
use crate::errors::PipelineError;
use crate::heuristics::CellCounts;
use crate::metrics::{Distribution, distribution};
use crate::transport::fs::{files_with_suffix, require_path};
use crate::transport::tabular::read_rows;
use crate::types::SourceId;

/// Balance summary of one split file.
#[derive(Clone, Debug)]
pub struct SplitCheck {
    /// Checked file.
    pub path: PathBuf,
    /// Rows in the file.
    pub rows: usize,
    /// Label counts and shares.
    pub labels: Option<Distribution<u8>>,
    /// Source counts and shares.
    pub sources: Option<Distribution<SourceId>>,
    /// Rows per (source, label) cell.
    pub cells: CellCounts,
    /// Every (source, label) cell holds the same number of rows.
    pub balanced: bool,
}

/// Outcome of the verify stage.
#[derive(Clone, Debug, Default)]
pub struct VerificationReport {
    /// One check per file: validation, test, then training by size.
    pub checks: Vec<SplitCheck>,
}

impl VerificationReport {
    /// Every checked file is balanced.
    pub fn balanced(&self) -> bool {
        self.checks.iter().all(|check| check.balanced)
    }
}

/// Label and source distributions plus the exact cell-balance check.
pub fn check_rows(path: &Path, rows: &[LabeledRecord]) -> SplitCheck {
    let mut label_counts: IndexMap<u8, usize> = IndexMap::new();
    let mut source_counts: IndexMap<SourceId, usize> = IndexMap::new();
    for row in rows {
        *label_counts.entry(row.label.as_u8()).or_insert(0) += 1;
        *source_counts.entry(row.source.clone()).or_insert(0) += 1;
    }
    let cells = CellCounts::from_rows(rows);
    let balanced = {
        let mut populations = cells.iter().map(|(_, _, count)| count);
        match populations.next() {
            Some(first) => populations.all(|count| count == first),
            None => true,
        }
    };
    SplitCheck {
        path: path.to_path_buf(),
        rows: rows.len(),
        labels: distribution(&label_counts),
        sources: distribution(&source_counts),
        cells,
        balanced,
    }
}

/// Read and check one split file.
pub fn check_file(path: &Path) -> Result<SplitCheck, PipelineError> {
    let rows: Vec<LabeledRecord> = read_rows(path)?;
    let check = check_rows(path, &rows);
    log_check(&check);
    Ok(check)
}

fn log_check(check: &SplitCheck) {
    let label_shares: Vec<String> = check
        .labels
        .iter()
        .flat_map(|dist| dist.shares.iter())
        .map(|share| format!("{}={:.1}%", share.key, share.share * 100.0))
        .collect();
    let source_ratio = check.sources.as_ref().map(|dist| dist.ratio).unwrap_or(0.0);
    if check.balanced {
        info!(
            rows = check.rows,
            labels = %label_shares.join(" "),
            source_ratio,
            "[bugsplit:verify] balanced {}",
            check.path.display()
        );
    } else {
        let cells: Vec<String> = check
            .cells
            .iter()
            .map(|(source, label, count)| format!("{source}/{label}={count}"))
            .collect();
        warn!(
            rows = check.rows,
            labels = %label_shares.join(" "),
            cells = %cells.join(" "),
            "[bugsplit:verify] imbalanced {}",
            check.path.display()
        );
    }
}

/// Training split files in `dir`, ordered by size.
pub fn training_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>, PipelineError> {
    let mut found: Vec<(usize, PathBuf)> = files_with_suffix(dir, CSV_EXTENSION)?
        .into_iter()
        .filter_map(|(stem, path)| {
            let size = stem.strip_prefix(TRAIN_PREFIX)?.parse::<usize>().ok()?;
            Some((size, path))
        })
        .collect();
    found.sort_by_key(|(size, _)| *size);
    Ok(found)
}

/// Check validation, test, and every training file in `dir`.
pub fn verify_dir(dir: &Path) -> Result<VerificationReport, PipelineError> {
    require_path(dir)?;
    let mut report = VerificationReport::default();
    for name in [VALIDATION_FILENAME, TEST_FILENAME] {
        report.checks.push(check_file(&dir.join(name))?);
    }
    for (_, path) in training_files(dir)? {
        report.checks.push(check_file(&path)?);
    }
    Ok(report)
}

/// Verify the splits in `layout.balanced_dir`.
pub fn run_verify(config: &PipelineConfig) -> Result<VerificationReport, PipelineError> {
    let report = verify_dir(&config.layout.balanced_dir)?;
    info!(
        files = report.checks.len(),
        balanced = report.balanced(),
        "[bugsplit:verify] checked {}",
        config.layout.balanced_dir.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::columns::LABELED_HEADER;
    use crate::data::ResolutionLabel;
    use crate::transport::tabular::write_rows_with_header;
    use tempfile::tempdir;

    fn row(source: &str, label: ResolutionLabel) -> LabeledRecord {
        LabeledRecord {
            short_desc: "title".into(),
            product: "Core".into(),
            priority: "P1".into(),
            bug_severity: "minor".into(),
            days_resolution: 2.0,
            comments: "c".into(),
            source: source.into(),
            label,
        }
    }

    #[test]
    fn check_rows_detects_balance_and_imbalance() {
        let balanced = vec![
            row("A", ResolutionLabel::Fast),
            row("A", ResolutionLabel::Slow),
            row("B", ResolutionLabel::Slow),
            row("B", ResolutionLabel::Fast),
        ];
        let check = check_rows(Path::new("v.csv"), &balanced);
        assert!(check.balanced);
        assert!(check.labels.as_ref().unwrap().is_uniform());
        assert_eq!(check.sources.as_ref().unwrap().total, 4);

        let skewed = vec![
            row("A", ResolutionLabel::Fast),
            row("A", ResolutionLabel::Fast),
            row("A", ResolutionLabel::Slow),
            row("B", ResolutionLabel::Fast),
            row("B", ResolutionLabel::Slow),
        ];
        assert!(!check_rows(Path::new("t.csv"), &skewed).balanced);

        let one_label = vec![row("A", ResolutionLabel::Fast)];
        assert!(!check_rows(Path::new("x.csv"), &one_label).balanced);
    }

    #[test]
    fn verify_dir_reads_all_split_files_in_size_order() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        let rows = vec![
            row("A", ResolutionLabel::Fast),
            row("A", ResolutionLabel::Slow),
        ];
        for name in [
            "balanced_validation.csv",
            "balanced_test.csv",
            "balanced_train_2000.csv",
            "balanced_train_1000.csv",
        ] {
            write_rows_with_header(&dir.join(name), &LABELED_HEADER, &rows).unwrap();
        }
        write_rows_with_header(
            &dir.join("balanced_train_bad.csv"),
            &LABELED_HEADER,
            &[row("A", ResolutionLabel::Fast)],
        )
        .unwrap();

        let report = verify_dir(dir).unwrap();
        assert_eq!(report.checks.len(), 4);
        assert!(report.balanced());
        assert!(report.checks[2].path.ends_with("balanced_train_1000.csv"));
        assert!(report.checks[3].path.ends_with("balanced_train_2000.csv"));
    }

    #[test]
    fn missing_test_file_is_input_not_found() {
        let temp = tempdir().unwrap();
        write_rows_with_header::<LabeledRecord>(
            &temp.path().join("balanced_validation.csv"),
            &LABELED_HEADER,
            &[],
        )
        .unwrap();
        let err = verify_dir(temp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound { .. }));
    }
}
