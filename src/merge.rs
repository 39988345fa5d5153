//! Clean, label, and merge the extracted per-source tables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::clean::{CleanRecord, CleaningReport, TextCleaner, clean_source};
use crate::config::PipelineConfig;
use crate::constants::files::{
    EXTRACTED_SUFFIX, MERGED_FILENAME, PROCESSED_SUFFIX, STATISTICS_FILENAME,
};
use crate::data::{LabeledRecord, RawRow, ResolutionLabel};
use crate::errors::PipelineError;
use crate::metrics::{numeric_summary, quantile};
use crate::transport::fs::files_with_suffix;
use crate::transport::tabular::{read_raw_rows, write_rows};
use crate::types::SourceId;

/// One row of `dataset_statistics.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceStatistics {
    /// Source name.
    pub source: SourceId,
    /// Rows after cleaning.
    pub total_samples: usize,
    pub samples_label_0: usize,
    pub samples_label_1: usize,
    pub percent_label_0: f64,
    pub percent_label_1: f64,
    /// Shortest resolution time.
    pub min_days: f64,
    /// Longest resolution time.
    pub max_days: f64,
    /// Mean resolution time.
    pub mean_days: f64,
    /// Quantile of this source alone; informational, never used for labels.
    pub local_percentile_75: f64,
    pub global_percentile_75: f64,
}

/// Labeled tables for every surviving source, in discovery order.
#[derive(Clone, Debug)]
pub struct MergedDataset {
    /// Quantile of `days_resolution` over every cleaned row of every source.
    pub threshold: f64,
    /// Labeled rows per source, in first-appearance order.
    pub tables: IndexMap<SourceId, Vec<LabeledRecord>>,
    /// One statistics row per source.
    pub statistics: Vec<SourceStatistics>,
}

impl MergedDataset {
    /// Every row, sources concatenated in order.
    pub fn merged_rows(&self) -> Vec<LabeledRecord> {
        self.tables.values().flatten().cloned().collect()
    }

    /// Row count across every source.
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Outcome of the merge stage.
#[derive(Clone, Debug)]
pub struct MergeReport {
    /// Global labeling threshold.
    pub threshold: f64,
    /// Rows in the merged table.
    pub total_rows: usize,
    /// Per-source cleaning summaries.
    pub cleaning: Vec<CleaningReport>,
    /// Per-source statistics, as written to `dataset_statistics.csv`.
    pub statistics: Vec<SourceStatistics>,
    /// Sources that could not be read or had no rows left after cleaning.
    pub skipped: Vec<(SourceId, String)>,
    /// Written `merged_processed_labeled.csv`.
    pub merged_path: PathBuf,
}

/// Label every cleaned table against one threshold computed over all of them.
pub fn label_tables(
    tables: Vec<(SourceId, Vec<CleanRecord>)>,
    q: f64,
) -> Result<MergedDataset, PipelineError> {
    let all_days: Vec<f64> = tables
        .iter()
        .flat_map(|(_, records)| records.iter().map(|record| record.days_resolution))
        .collect();
    let threshold = quantile(&all_days, q).ok_or_else(|| {
        PipelineError::no_valid_data("merge", "no cleaned rows left in any source")
    })?;
    info!(
        threshold,
        rows = all_days.len(),
        "[bugsplit:merge] global resolution threshold"
    );

    let mut labeled = IndexMap::new();
    let mut statistics = Vec::with_capacity(tables.len());
    for (source, records) in tables {
        let rows: Vec<LabeledRecord> = records
            .into_iter()
            .map(|record| record.into_labeled(&source, threshold))
            .collect();
        if let Some(stats) = source_statistics(&source, &rows, q, threshold) {
            statistics.push(stats);
        }
        labeled.insert(source, rows);
    }
    Ok(MergedDataset {
        threshold,
        tables: labeled,
        statistics,
    })
}

/// Summary of one labeled source; `None` when it has no rows.
pub fn source_statistics(
    source: &str,
    rows: &[LabeledRecord],
    q: f64,
    global_threshold: f64,
) -> Option<SourceStatistics> {
    let days: Vec<f64> = rows.iter().map(|row| row.days_resolution).collect();
    let summary = numeric_summary(&days)?;
    let local = quantile(&days, q)?;
    let slow = rows
        .iter()
        .filter(|row| row.label == ResolutionLabel::Slow)
        .count();
    let fast = rows.len() - slow;
    let percent = |count: usize| 100.0 * count as f64 / rows.len() as f64;
    Some(SourceStatistics {
        source: source.to_string(),
        total_samples: rows.len(),
        samples_label_0: fast,
        samples_label_1: slow,
        percent_label_0: percent(fast),
        percent_label_1: percent(slow),
        min_days: summary.min,
        max_days: summary.max,
        mean_days: summary.mean,
        local_percentile_75: local,
        global_percentile_75: global_threshold,
    })
}

/// Clean each raw table, then label them all against the global threshold.
///
/// Sources left empty by cleaning are reported in the returned skip list.
pub fn merge_tables(
    inputs: Vec<(SourceId, Vec<RawRow>)>,
    config: &PipelineConfig,
) -> Result<(MergedDataset, Vec<CleaningReport>, Vec<(SourceId, String)>), PipelineError> {
    let cleaner = TextCleaner::new(config.cleaning)?;
    let mut cleaned = Vec::with_capacity(inputs.len());
    let mut reports = Vec::with_capacity(inputs.len());
    let mut skipped = Vec::new();
    for (source, rows) in inputs {
        let (records, report) = clean_source(&source, rows, &cleaner, config);
        log_cleaning(&report);
        reports.push(report);
        if records.is_empty() {
            warn!(source = %source, "[bugsplit:merge] no rows left after cleaning; source skipped");
            skipped.push((source, "no rows left after cleaning".to_string()));
            continue;
        }
        cleaned.push((source, records));
    }
    if cleaned.is_empty() {
        return Err(PipelineError::no_valid_data(
            "merge",
            "every source was empty after cleaning",
        ));
    }
    let merged = label_tables(cleaned, config.label_quantile)?;
    Ok((merged, reports, skipped))
}

fn log_cleaning(report: &CleaningReport) {
    for fill in &report.fills {
        info!(
            source = %report.source,
            column = fill.column,
            count = fill.count,
            value = ?fill.value,
            "[bugsplit:merge] filled missing values"
        );
    }
    info!(
        source = %report.source,
        original = report.original_rows,
        sparse_removed = report.sparse_rows_removed,
        duplicates_removed = report.duplicates_removed,
        non_numeric_days = report.coercion_dropped,
        kept = report.final_rows,
        "[bugsplit:merge] cleaned source"
    );
}

/// Path of the labeled CSV for `source` inside `dir`.
pub fn processed_path(dir: &Path, source: &str) -> PathBuf {
    dir.join(format!("{source}{PROCESSED_SUFFIX}"))
}

/// Write per-source tables, the merged table, and the statistics file.
pub fn write_merged(dataset: &MergedDataset, dir: &Path) -> Result<PathBuf, PipelineError> {
    for (source, rows) in &dataset.tables {
        write_rows(&processed_path(dir, source), rows)?;
    }
    let merged_path = dir.join(MERGED_FILENAME);
    write_rows(&merged_path, &dataset.merged_rows())?;
    write_rows(&dir.join(STATISTICS_FILENAME), &dataset.statistics)?;
    Ok(merged_path)
}

/// Merge every `<Source>_data.csv` in `layout.extracted_dir` into `layout.processed_dir`.
pub fn run_merge(config: &PipelineConfig) -> Result<MergeReport, PipelineError> {
    let discovered = files_with_suffix(&config.layout.extracted_dir, EXTRACTED_SUFFIX)?;
    info!(
        sources = discovered.len(),
        strategy = ?config.strategy,
        cleaning = ?config.cleaning,
        "[bugsplit:merge] merging from {}",
        config.layout.extracted_dir.display()
    );

    let mut inputs = Vec::with_capacity(discovered.len());
    let mut unreadable = Vec::new();
    for (source, path) in discovered {
        match read_raw_rows(&path) {
            Ok(rows) => inputs.push((source, rows)),
            Err(err) => {
                warn!(source = %source, "[bugsplit:merge] source skipped: {err}");
                unreadable.push((source, err.to_string()));
            }
        }
    }
    if inputs.is_empty() {
        return Err(PipelineError::no_valid_data(
            "merge",
            format!(
                "no readable '*{EXTRACTED_SUFFIX}' files in '{}'",
                config.layout.extracted_dir.display()
            ),
        ));
    }

    let (dataset, cleaning, mut skipped) = merge_tables(inputs, config)?;
    unreadable.append(&mut skipped);
    let merged_path = write_merged(&dataset, &config.layout.processed_dir)?;
    for stats in &dataset.statistics {
        info!(
            source = %stats.source,
            total = stats.total_samples,
            label_0 = stats.samples_label_0,
            label_1 = stats.samples_label_1,
            local_p75 = stats.local_percentile_75,
            "[bugsplit:merge] source statistics"
        );
    }
    info!(
        rows = dataset.total_rows(),
        sources = dataset.tables.len(),
        "[bugsplit:merge] wrote {}",
        merged_path.display()
    );
    Ok(MergeReport {
        threshold: dataset.threshold,
        total_rows: dataset.total_rows(),
        cleaning,
        statistics: dataset.statistics,
        skipped: unreadable,
        merged_path,
    })
}
