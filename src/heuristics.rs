use indexmap::IndexMap;

use crate::data::{LabeledRecord, ResolutionLabel};
use crate::types::SourceId;

/// Row counts per (source, label) cell.
///
/// Sources keep first-appearance order; both labels are present for every
/// source, with zero counts where a source has no rows of that label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellCounts {
    counts: IndexMap<(SourceId, ResolutionLabel), usize>,
}

/// Rows grouped by (source, label) cell.
pub type CellGroups<'a> = IndexMap<(SourceId, ResolutionLabel), Vec<&'a LabeledRecord>>;

/// Group rows into cells. Sources keep first-appearance order and every
/// source gets both labels, possibly with no rows.
pub fn group_cells<'a, I>(rows: I) -> CellGroups<'a>
where
    I: IntoIterator<Item = &'a LabeledRecord>,
{
    let mut cells = CellGroups::new();
    for row in rows {
        if !cells.contains_key(&(row.source.clone(), ResolutionLabel::Fast)) {
            for label in ResolutionLabel::ALL {
                cells.insert((row.source.clone(), label), Vec::new());
            }
        }
        if let Some(cell) = cells.get_mut(&(row.source.clone(), row.label)) {
            cell.push(row);
        }
    }
    cells
}

impl CellCounts {
    /// Count the cells of `rows`.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a LabeledRecord>,
    {
        Self::from_groups(&group_cells(rows))
    }

    /// Populations of already grouped cells.
    pub fn from_groups(groups: &CellGroups<'_>) -> Self {
        let counts = groups
            .iter()
            .map(|(key, rows)| (key.clone(), rows.len()))
            .collect();
        Self { counts }
    }

    /// Distinct sources, in first-appearance order.
    pub fn sources(&self) -> Vec<&str> {
        self.counts
            .keys()
            .filter(|(_, label)| *label == ResolutionLabel::Fast)
            .map(|(source, _)| source.as_str())
            .collect()
    }

    /// Number of distinct sources.
    pub fn source_count(&self) -> usize {
        self.counts.len() / ResolutionLabel::ALL.len()
    }

    /// Population of one cell; zero for unknown cells.
    pub fn get(&self, source: &str, label: ResolutionLabel) -> usize {
        self.counts
            .get(&(source.to_string(), label))
            .copied()
            .unwrap_or(0)
    }

    /// Smallest cell population, `None` when there are no cells.
    pub fn smallest(&self) -> Option<usize> {
        self.counts.values().copied().min()
    }

    /// Cells in source-major, label-minor order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ResolutionLabel, usize)> + '_ {
        self.counts
            .iter()
            .map(|((source, label), count)| (source.as_str(), *label, *count))
    }
}

/// Per-cell population target: the smallest cell, raised to `min_floor`.
pub fn cell_floor(counts: &CellCounts, min_floor: usize) -> usize {
    counts.smallest().unwrap_or(0).max(min_floor)
}

/// Largest training size that keeps every cell at or below `floor` rows.
pub fn max_balanced_size(floor: usize, source_count: usize) -> usize {
    floor
        .saturating_mul(ResolutionLabel::ALL.len())
        .saturating_mul(source_count)
}

/// Training sizes to produce, and the requested sizes that were dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizePlan {
    /// `floor * 2 * sources`; always written when nonzero.
    pub max: usize,
    /// Sizes to build, in request order with `max` last.
    pub feasible: Vec<usize>,
    /// Requested sizes above `max`.
    pub dropped: Vec<usize>,
}

/// Keep requested sizes up to `max` in request order, then append `max` if
/// it was not requested. Duplicates are removed.
pub fn feasible_sizes(requested: &[usize], max: usize) -> SizePlan {
    let mut feasible = Vec::with_capacity(requested.len() + 1);
    let mut dropped = Vec::new();
    for size in requested {
        if *size > max {
            if !dropped.contains(size) {
                dropped.push(*size);
            }
        } else if !feasible.contains(size) {
            feasible.push(*size);
        }
    }
    if max > 0 && !feasible.contains(&max) {
        feasible.push(max);
    }
    SizePlan {
        max,
        feasible,
        dropped,
    }
}

/// Rows drawn from each cell for a training split of `size`.
pub fn train_rows_per_cell(size: usize, source_count: usize) -> usize {
    if source_count == 0 {
        return 0;
    }
    (size / source_count) / ResolutionLabel::ALL.len()
}

/// `1234567` as `1,234,567`.
pub fn format_usize_with_commas(value: usize) -> String {
    let raw = value.to_string();
    let mut grouped_reversed = String::with_capacity(raw.len() + (raw.len() / 3));
    for (idx, ch) in raw.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped_reversed.push(',');
        }
        grouped_reversed.push(ch);
    }
    grouped_reversed.chars().rev().collect()
}

/// `drawn / population` as `2.25x`, or `n/a`.
pub fn format_replay_factor(drawn: usize, population: usize) -> String {
    if drawn == 0 || population == 0 {
        return "n/a".to_string();
    }
    let factor = drawn as f64 / population as f64;
    format!("{factor:.2}x")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(source: &str, label: ResolutionLabel) -> LabeledRecord {
        LabeledRecord {
            short_desc: "x".into(),
            product: "p".into(),
            priority: "P1".into(),
            bug_severity: "major".into(),
            days_resolution: 1.0,
            comments: "c".into(),
            source: source.into(),
            label,
        }
    }

    #[test]
    fn cell_counts_keep_first_appearance_and_zero_cells() {
        let rows = vec![
            row("KDE", ResolutionLabel::Slow),
            row("Eclipse", ResolutionLabel::Fast),
            row("KDE", ResolutionLabel::Slow),
        ];
        let counts = CellCounts::from_rows(&rows);
        assert_eq!(counts.sources(), vec!["KDE", "Eclipse"]);
        assert_eq!(counts.source_count(), 2);
        assert_eq!(counts.get("KDE", ResolutionLabel::Slow), 2);
        assert_eq!(counts.get("KDE", ResolutionLabel::Fast), 0);
        assert_eq!(counts.get("Eclipse", ResolutionLabel::Slow), 0);
        assert_eq!(counts.smallest(), Some(0));
        let cells: Vec<(&str, u8, usize)> = counts
            .iter()
            .map(|(source, label, count)| (source, label.as_u8(), count))
            .collect();
        assert_eq!(
            cells,
            vec![("KDE", 0, 0), ("KDE", 1, 2), ("Eclipse", 0, 1), ("Eclipse", 1, 0)]
        );
    }

    #[test]
    fn floor_is_raised_to_minimum() {
        let mut rows = Vec::new();
        rows.extend((0..800).map(|_| row("A", ResolutionLabel::Fast)));
        rows.extend((0..300).map(|_| row("A", ResolutionLabel::Slow)));
        rows.extend((0..200).map(|_| row("B", ResolutionLabel::Fast)));
        rows.extend((0..900).map(|_| row("B", ResolutionLabel::Slow)));
        let counts = CellCounts::from_rows(&rows);
        assert_eq!(cell_floor(&counts, 500), 500);
        assert_eq!(cell_floor(&counts, 100), 200);
        assert_eq!(max_balanced_size(500, counts.source_count()), 2000);
    }

    #[test]
    fn feasible_sizes_drop_oversized_and_append_max() {
        let plan = feasible_sizes(&[1000, 2000, 5000, 10000], 2000);
        assert_eq!(plan.feasible, vec![1000, 2000]);
        assert_eq!(plan.dropped, vec![5000, 10000]);

        let plan = feasible_sizes(&[1000, 5000, 1000], 3000);
        assert_eq!(plan.feasible, vec![1000, 3000]);
        assert_eq!(plan.dropped, vec![5000]);

        let plan = feasible_sizes(&[], 0);
        assert!(plan.feasible.is_empty());
    }

    #[test]
    fn train_rows_per_cell_truncates() {
        assert_eq!(train_rows_per_cell(2000, 2), 500);
        assert_eq!(train_rows_per_cell(1000, 3), 166);
        assert_eq!(train_rows_per_cell(1000, 0), 0);
    }

    #[test]
    fn formatting_helpers_are_stable() {
        assert_eq!(format_usize_with_commas(0), "0");
        assert_eq!(format_usize_with_commas(1_234_567), "1,234,567");
        assert_eq!(format_replay_factor(0, 10), "n/a");
        assert_eq!(format_replay_factor(10, 0), "n/a");
        assert_eq!(format_replay_factor(9, 4), "2.25x");
    }
}
