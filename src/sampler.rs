use rand::prelude::*;

use crate::data::{LabeledRecord, ResolutionLabel};
use crate::errors::PipelineError;
use crate::heuristics::{CellCounts, CellGroups, group_cells};
use crate::rng::DeterministicRng;
use crate::types::StreamKey;

/// Join operation-key parts into one stream key (`train|2000|KDE|1`).
pub fn stream_key(parts: &[&str]) -> StreamKey {
    parts.join("|")
}

/// Seeded sampler over (source, label) cells of a labeled table.
///
/// Every draw and shuffle takes its own stream key, so the result of one
/// operation never depends on which operations ran before it.
pub struct CellSampler<'a> {
    seed: u64,
    cells: CellGroups<'a>,
}

impl<'a> CellSampler<'a> {
    /// Group `rows` into cells; sources keep first-appearance order.
    pub fn new(seed: u64, rows: &'a [LabeledRecord]) -> Self {
        Self {
            seed,
            cells: group_cells(rows),
        }
    }

    /// Base seed every stream is derived from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Population of every cell, in source-major, label-minor order.
    pub fn counts(&self) -> CellCounts {
        CellCounts::from_groups(&self.cells)
    }

    /// Draw `count` rows with replacement from one cell.
    pub fn draw(
        &self,
        stream: &str,
        source: &str,
        label: ResolutionLabel,
        count: usize,
    ) -> Result<Vec<LabeledRecord>, PipelineError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let population = self
            .cells
            .get(&(source.to_string(), label))
            .filter(|rows| !rows.is_empty())
            .ok_or_else(|| PipelineError::EmptyCell {
                source_id: source.to_string(),
                label: label.as_u8(),
            })?;
        let mut rng = DeterministicRng::for_stream(self.seed, stream);
        Ok((0..count)
            .map(|_| population[rng.random_range(0..population.len())].clone())
            .collect())
    }

    /// Seeded in-place shuffle.
    pub fn shuffle<T>(&self, stream: &str, rows: &mut [T]) {
        let mut rng = DeterministicRng::for_stream(self.seed, stream);
        rows.shuffle(&mut rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(source: &str, label: ResolutionLabel, days: f64) -> LabeledRecord {
        LabeledRecord {
            short_desc: format!("{source}-{days}"),
            product: "p".into(),
            priority: "P2".into(),
            bug_severity: "normal".into(),
            days_resolution: days,
            comments: "c".into(),
            source: source.into(),
            label,
        }
    }

    fn table() -> Vec<LabeledRecord> {
        let mut rows = Vec::new();
        for idx in 0..5 {
            rows.push(row("KDE", ResolutionLabel::Fast, idx as f64));
        }
        for idx in 0..3 {
            rows.push(row("KDE", ResolutionLabel::Slow, 100.0 + idx as f64));
        }
        rows.push(row("Gentoo", ResolutionLabel::Fast, 1.0));
        rows
    }

    #[test]
    fn draw_stays_inside_cell_and_replays() {
        let rows = table();
        let sampler = CellSampler::new(42, &rows);
        let first = sampler
            .draw("train|10|KDE|1", "KDE", ResolutionLabel::Slow, 10)
            .unwrap();
        let again = sampler
            .draw("train|10|KDE|1", "KDE", ResolutionLabel::Slow, 10)
            .unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first, again);
        assert!(
            first
                .iter()
                .all(|r| r.source == "KDE" && r.label == ResolutionLabel::Slow)
        );
    }

    #[test]
    fn empty_cell_cannot_be_drawn() {
        let rows = table();
        let sampler = CellSampler::new(42, &rows);
        let err = sampler
            .draw("train|4|Gentoo|1", "Gentoo", ResolutionLabel::Slow, 4)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::EmptyCell { ref source_id, label: 1 } if source_id == "Gentoo"
        ));
        assert!(
            sampler
                .draw("train|0|Gentoo|1", "Gentoo", ResolutionLabel::Slow, 0)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn cells_follow_first_appearance() {
        let rows = table();
        let sampler = CellSampler::new(7, &rows);
        let counts = sampler.counts();
        let cells: Vec<(&str, u8, usize)> = counts
            .iter()
            .map(|(source, label, count)| (source, label.as_u8(), count))
            .collect();
        assert_eq!(
            cells,
            vec![("KDE", 0, 5), ("KDE", 1, 3), ("Gentoo", 0, 1), ("Gentoo", 1, 0)]
        );
        assert_eq!(counts, CellCounts::from_rows(&rows));
        assert_eq!(counts.smallest(), Some(0));
    }

    #[test]
    fn shuffle_is_a_seeded_permutation() {
        let rows = table();
        let sampler = CellSampler::new(42, &rows);
        let mut a: Vec<usize> = (0..50).collect();
        let mut b = a.clone();
        sampler.shuffle("shuffle|validation", &mut a);
        sampler.shuffle("shuffle|validation", &mut b);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_eq!(stream_key(&["train", "2000", "KDE", "1"]), "train|2000|KDE|1");
    }
}
