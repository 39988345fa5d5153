//! Per-source cleaning transforms.
//!
//! A source table passes through three named phases, in this order:
//! 1. [`clean_text_columns`] normalizes free text and categorical cells.
//! 2. [`handle_missing_values`] imputes (and, for the aggressive strategy,
//!    drops) according to [`MissingValueStrategy`], then removes exact
//!    duplicates. `days_resolution` gaps use the table's own quantile here.
//! 3. [`coerce_days_resolution`] parses `days_resolution` and drops every row
//!    that is still not numeric. This phase decides which rows survive.
//!
//! The global label threshold is computed later, over all sources at once.

use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::config::{CleaningVariant, MissingValueStrategy, PipelineConfig};
use crate::constants::merge::{AGGRESSIVE_MISSING_SHARE, NUMERIC_FILL_VALUE, UNKNOWN_VALUE};
use crate::data::{CellValue, Column, LabeledRecord, RawRow, ResolutionLabel};
use crate::errors::PipelineError;
use crate::metrics::{mode, quantile};
use crate::types::SourceId;
use crate::utils::{format_number, normalize_inline_whitespace, parse_number};

const URL_PATTERN: &str = r"http\S+|www\S+";
const TAG_PATTERN: &str = r"<.*?>";
const BASIC_DISALLOWED: &str = r"[^a-zA-Z0-9\s]";
const STRICT_DISALLOWED: &str = r"[^\w\s.,!?-]";

/// Compiled text normalizer for one [`CleaningVariant`].
#[derive(Clone, Debug)]
pub struct TextCleaner {
    urls: Regex,
    tags: Regex,
    disallowed: Regex,
}

impl TextCleaner {
    /// Compile the regexes for `variant`.
    pub fn new(variant: CleaningVariant) -> Result<Self, PipelineError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| {
                PipelineError::Configuration(format!("invalid cleaning pattern '{pattern}': {err}"))
            })
        };
        let disallowed = match variant {
            CleaningVariant::Basic => BASIC_DISALLOWED,
            CleaningVariant::Strict => STRICT_DISALLOWED,
        };
        Ok(Self {
            urls: compile(URL_PATTERN)?,
            tags: compile(TAG_PATTERN)?,
            disallowed: compile(disallowed)?,
        })
    }

    /// Strip URLs, tags, and disallowed characters, then collapse whitespace.
    ///
    /// Returns `None` when nothing is left.
    pub fn clean(&self, text: &str) -> Option<String> {
        let text = self.urls.replace_all(text, "");
        let text = self.tags.replace_all(&text, "");
        let text = self.disallowed.replace_all(&text, "");
        let text = normalize_inline_whitespace(text);
        (!text.is_empty()).then_some(text)
    }
}

/// How a column's gaps are filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every present value parses as a number (an all-missing column counts).
    Numeric,
    /// Anything else.
    Text,
}

/// Numeric when every present value parses as a number (or none is present).
pub fn column_kind(rows: &[RawRow], column: Column) -> ColumnKind {
    let all_numeric = rows
        .iter()
        .filter_map(|row| row.get(column))
        .all(|value| parse_number(value).is_some());
    if all_numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

/// Value written into the gaps of one column.
#[derive(Clone, Debug, PartialEq)]
pub enum FillValue {
    /// `0` for numeric columns other than `days_resolution`.
    Zero,
    /// `"Unknown"` for text columns.
    Unknown,
    /// The table's own `days_resolution` quantile.
    Quantile(f64),
    /// Most frequent value of the column.
    Mode(String),
}

/// Gaps filled in one column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnFill {
    /// Column that was filled.
    pub column: &'static str,
    /// Cells filled.
    pub count: usize,
    /// Value written into them.
    pub value: FillValue,
}

/// What the cleaning phases did to one source table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CleaningReport {
    /// Source the table belongs to.
    pub source: SourceId,
    /// Rows before cleaning.
    pub original_rows: usize,
    /// Rows removed by the aggressive sparse-row filter.
    pub sparse_rows_removed: usize,
    /// Imputations, one entry per filled column.
    pub fills: Vec<ColumnFill>,
    /// Rows removed as exact duplicates after imputation.
    pub duplicates_removed: usize,
    /// Rows removed because `days_resolution` was not numeric.
    pub coercion_dropped: usize,
    /// Rows that reached labeling.
    pub final_rows: usize,
}

/// A cleaned row with numeric `days_resolution`, ready for labeling.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanRecord {
    /// Cleaned title.
    pub short_desc: CellValue,
    /// Product, possibly imputed.
    pub product: CellValue,
    /// Priority, possibly imputed.
    pub priority: CellValue,
    /// Severity, possibly imputed.
    pub bug_severity: CellValue,
    /// Parsed resolution time in days.
    pub days_resolution: f64,
    /// Cleaned, joined comment text.
    pub comments: CellValue,
}

impl CleanRecord {
    /// Attach provenance and the label implied by the global `threshold`.
    pub fn into_labeled(self, source: &str, threshold: f64) -> LabeledRecord {
        LabeledRecord {
            label: ResolutionLabel::from_threshold(self.days_resolution, threshold),
            short_desc: self.short_desc,
            product: self.product,
            priority: self.priority,
            bug_severity: self.bug_severity,
            days_resolution: self.days_resolution,
            comments: self.comments,
            source: source.to_string(),
        }
    }
}

/// Phase 1: clean `short_desc`, `comments`, `product`, and `priority`.
pub fn clean_text_columns(rows: &mut [RawRow], cleaner: &TextCleaner) {
    for row in rows.iter_mut() {
        for column in Column::CLEANED {
            let cleaned = row.get(column).and_then(|text| cleaner.clean(text));
            row.set(column, cleaned);
        }
    }
}

/// Phase 2: impute or drop missing cells, then drop exact duplicates.
pub fn handle_missing_values(
    rows: Vec<RawRow>,
    strategy: MissingValueStrategy,
    q: f64,
    report: &mut CleaningReport,
) -> Vec<RawRow> {
    let kinds: Vec<(Column, ColumnKind)> = Column::ALL
        .iter()
        .map(|column| (*column, column_kind(&rows, *column)))
        .collect();

    let mut rows = rows;
    if strategy == MissingValueStrategy::Aggressive {
        let before = rows.len();
        let min_present = Column::ALL.len() as f64 * AGGRESSIVE_MISSING_SHARE;
        rows.retain(|row| (Column::ALL.len() - row.missing_count()) as f64 >= min_present);
        report.sparse_rows_removed = before - rows.len();
    }

    for (column, kind) in &kinds {
        let missing = rows.iter().filter(|row| row.get(*column).is_none()).count();
        if missing == 0 {
            continue;
        }
        let Some(value) = fill_value(&rows, *column, *kind, strategy, q) else {
            debug!(
                column = column.name(),
                missing, "[bugsplit:merge] column has no values to impute from"
            );
            continue;
        };
        let rendered = render_fill(&value);
        for row in rows.iter_mut() {
            if row.get(*column).is_none() {
                row.set(*column, Some(rendered.clone()));
            }
        }
        report.fills.push(ColumnFill {
            column: column.name(),
            count: missing,
            value,
        });
    }

    let (rows, duplicates) = drop_duplicates(rows, &kinds);
    report.duplicates_removed = duplicates;
    rows
}

fn fill_value(
    rows: &[RawRow],
    column: Column,
    kind: ColumnKind,
    strategy: MissingValueStrategy,
    q: f64,
) -> Option<FillValue> {
    let column_quantile = || {
        let present: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(column).and_then(parse_number))
            .collect();
        quantile(&present, q).map(FillValue::Quantile)
    };
    match (strategy, kind) {
        (MissingValueStrategy::Conservative, ColumnKind::Numeric) => {
            if column == Column::DaysResolution {
                column_quantile()
            } else {
                Some(FillValue::Zero)
            }
        }
        (MissingValueStrategy::Conservative, ColumnKind::Text) => Some(FillValue::Unknown),
        (MissingValueStrategy::Aggressive, ColumnKind::Numeric) => column_quantile(),
        (MissingValueStrategy::Aggressive, ColumnKind::Text) => Some(
            mode(rows.iter().filter_map(|row| row.get(column)))
                .map(FillValue::Mode)
                .unwrap_or(FillValue::Unknown),
        ),
    }
}

fn render_fill(value: &FillValue) -> String {
    match value {
        FillValue::Zero => NUMERIC_FILL_VALUE.to_string(),
        FillValue::Unknown => UNKNOWN_VALUE.to_string(),
        FillValue::Quantile(value) => format_number(*value),
        FillValue::Mode(value) => value.clone(),
    }
}

/// Keep the first occurrence of every row; numeric cells compare by value.
fn drop_duplicates(rows: Vec<RawRow>, kinds: &[(Column, ColumnKind)]) -> (Vec<RawRow>, usize) {
    let before = rows.len();
    let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(rows.len());
    let kept: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| {
            let key = kinds
                .iter()
                .map(|(column, kind)| {
                    let cell = row.get(*column)?;
                    Some(match kind {
                        ColumnKind::Numeric => parse_number(cell)
                            .map(format_number)
                            .unwrap_or_else(|| cell.to_string()),
                        ColumnKind::Text => cell.to_string(),
                    })
                })
                .collect();
            seen.insert(key)
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Phase 3: parse `days_resolution`, dropping rows where it is not numeric.
pub fn coerce_days_resolution(rows: Vec<RawRow>, report: &mut CleaningReport) -> Vec<CleanRecord> {
    let before = rows.len();
    let text = |row: &RawRow, column: Column| row.get(column).unwrap_or_default().to_string();
    let records: Vec<CleanRecord> = rows
        .into_iter()
        .filter_map(|row| {
            let days = row.get(Column::DaysResolution).and_then(parse_number)?;
            Some(CleanRecord {
                short_desc: text(&row, Column::ShortDesc),
                product: text(&row, Column::Product),
                priority: text(&row, Column::Priority),
                bug_severity: text(&row, Column::BugSeverity),
                days_resolution: days,
                comments: text(&row, Column::Comments),
            })
        })
        .collect();
    report.coercion_dropped = before - records.len();
    records
}

/// Run all three phases over one source table.
pub fn clean_source(
    source: &str,
    rows: Vec<RawRow>,
    cleaner: &TextCleaner,
    config: &PipelineConfig,
) -> (Vec<CleanRecord>, CleaningReport) {
    let mut report = CleaningReport {
        source: source.to_string(),
        original_rows: rows.len(),
        ..CleaningReport::default()
    };
    let mut rows = rows;
    clean_text_columns(&mut rows, cleaner);
    let rows = handle_missing_values(rows, config.strategy, config.label_quantile, &mut report);
    let records = coerce_days_resolution(rows, &mut report);
    report.final_rows = records.len();
    (records, report)
}
