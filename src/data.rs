use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::columns;

pub use crate::types::{CellValue, CommentText, SourceId};

/// Flat attribute row extracted from one JSON bug entry.
///
/// Every field is kept as text; missing values are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugRecord {
    /// Bug title.
    pub short_desc: CellValue,
    /// Product the bug was filed against.
    pub product: CellValue,
    /// Tracker priority, e.g. `P2`.
    pub priority: CellValue,
    /// Tracker severity, e.g. `major`.
    pub bug_severity: CellValue,
    /// Resolution time as found in the dump; may be empty or non-numeric.
    pub days_resolution: CellValue,
    /// Comment texts joined by a blank line.
    pub comments: CommentText,
}

/// Binary resolution-time label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResolutionLabel {
    /// Resolved within the threshold (`0`).
    Fast,
    /// Resolved strictly after the threshold (`1`).
    Slow,
}

impl ResolutionLabel {
    /// Both labels, in wire order.
    pub const ALL: [ResolutionLabel; 2] = [ResolutionLabel::Fast, ResolutionLabel::Slow];

    /// Label for `days` against a global `threshold` (strictly greater is slow).
    pub fn from_threshold(days: f64, threshold: f64) -> Self {
        if days > threshold {
            ResolutionLabel::Slow
        } else {
            ResolutionLabel::Fast
        }
    }

    /// Wire value (`0` or `1`).
    pub fn as_u8(self) -> u8 {
        match self {
            ResolutionLabel::Fast => 0,
            ResolutionLabel::Slow => 1,
        }
    }
}

impl From<ResolutionLabel> for u8 {
    fn from(value: ResolutionLabel) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for ResolutionLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResolutionLabel::Fast),
            1 => Ok(ResolutionLabel::Slow),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for ResolutionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Cleaned record with provenance and label; the unit every split is built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    /// Cleaned title.
    pub short_desc: CellValue,
    /// Product.
    pub product: CellValue,
    /// Priority.
    pub priority: CellValue,
    /// Severity.
    pub bug_severity: CellValue,
    /// Resolution time in days.
    pub days_resolution: f64,
    /// Cleaned comment text.
    pub comments: CommentText,
    /// Source the row came from.
    pub source: SourceId,
    /// `1` when `days_resolution` exceeds the global threshold.
    pub label: ResolutionLabel,
}

/// Columns of an extracted per-source table, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    /// `short_desc`
    ShortDesc,
    /// `product`
    Product,
    /// `priority`
    Priority,
    /// `bug_severity`
    BugSeverity,
    /// `days_resolution`
    DaysResolution,
    /// `comments`
    Comments,
}

impl Column {
    /// Every column, in file order.
    pub const ALL: [Column; 6] = [
        Column::ShortDesc,
        Column::Product,
        Column::Priority,
        Column::BugSeverity,
        Column::DaysResolution,
        Column::Comments,
    ];

    /// Columns passed through the text cleaner.
    pub const CLEANED: [Column; 4] = [
        Column::ShortDesc,
        Column::Comments,
        Column::Product,
        Column::Priority,
    ];

    /// Header name.
    pub fn name(self) -> &'static str {
        match self {
            Column::ShortDesc => columns::SHORT_DESC,
            Column::Product => columns::PRODUCT,
            Column::Priority => columns::PRIORITY,
            Column::BugSeverity => columns::BUG_SEVERITY,
            Column::DaysResolution => columns::DAYS_RESOLUTION,
            Column::Comments => columns::COMMENTS,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One row of a per-source table while it is being cleaned.
///
/// `None` marks a missing cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawRow {
    cells: [Option<CellValue>; 6],
}

impl RawRow {
    /// Build a row from cells in [`Column::ALL`] order.
    pub fn new(cells: [Option<CellValue>; 6]) -> Self {
        Self { cells }
    }

    /// Cell value, `None` when missing.
    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells[column.index()].as_deref()
    }

    /// Replace one cell.
    pub fn set(&mut self, column: Column, value: Option<CellValue>) {
        self.cells[column.index()] = value;
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }
}
