use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::Hash;

/// Linear-interpolation quantile (`q` in `[0, 1]`) over unsorted values.
///
/// Position `q * (n - 1)` is interpolated between its neighbouring order
/// statistics. Returns `None` for an empty input.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Most frequent value; ties resolve to the lexicographically smallest.
pub fn mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a_value, a_count), (b_value, b_count)| {
            a_count.cmp(b_count).then_with(|| b_value.cmp(a_value))
        })
        .map(|(value, _)| value.to_string())
}

/// Min/max/mean summary of a numeric column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumericSummary {
    /// Values summarized.
    pub count: usize,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

/// Summary of `values`, `None` when empty.
pub fn numeric_summary(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(NumericSummary {
        count: values.len(),
        min,
        max,
        mean,
    })
}

/// Aggregate skew metrics over per-key counts (sources or labels).
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution<K> {
    /// Sum of all counts.
    pub total: usize,
    /// Smallest count.
    pub min: usize,
    /// Largest count.
    pub max: usize,
    /// `max / min`; infinite when a key has zero rows.
    pub ratio: f64,
    /// Per-key shares, largest first.
    pub shares: Vec<Share<K>>,
}

/// One key's share of a distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Share<K> {
    /// Distribution key.
    pub key: K,
    /// Rows with this key.
    pub count: usize,
    /// `count / total`.
    pub share: f64,
}

impl<K> Distribution<K> {
    /// Every key has the same count.
    pub fn is_uniform(&self) -> bool {
        self.min == self.max
    }
}

/// Compute shares from counts, sorted by descending count then key.
pub fn distribution<K>(counts: &IndexMap<K, usize>) -> Option<Distribution<K>>
where
    K: Clone + Ord + Hash,
{
    if counts.is_empty() {
        return None;
    }
    let total: usize = counts.values().sum();
    let min = counts.values().copied().min().unwrap_or(0);
    let max = counts.values().copied().max().unwrap_or(0);
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut shares: Vec<Share<K>> = counts
        .iter()
        .map(|(key, count)| Share {
            key: key.clone(),
            count: *count,
            share: if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64
            },
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    Some(Distribution {
        total,
        min,
        max,
        ratio,
        shares,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_between_order_statistics() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&values, 0.75), Some(3.25));
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&[7.0], 0.75), Some(7.0));
        assert_eq!(quantile(&[], 0.75), None);
    }

    #[test]
    fn mode_prefers_smallest_value_on_ties() {
        assert_eq!(mode(["b", "a", "b", "a", "c"]), Some("a".to_string()));
        assert_eq!(mode(["P3", "P3", "P1"]), Some("P3".to_string()));
        assert_eq!(mode(Vec::<&str>::new()), None);
    }

    #[test]
    fn numeric_summary_reports_extremes_and_mean() {
        let summary = numeric_summary(&[2.0, 4.0, 9.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!(numeric_summary(&[]).is_none());
    }

    #[test]
    fn distribution_reports_balance() {
        let mut counts = IndexMap::new();
        counts.insert("A".to_string(), 2);
        counts.insert("B".to_string(), 2);
        let dist = distribution(&counts).expect("distribution");
        assert_eq!(dist.total, 4);
        assert!(dist.is_uniform());
        assert!((dist.ratio - 1.0).abs() < 1e-6);
        assert!(dist.shares.iter().all(|entry| (entry.share - 0.5).abs() < 1e-6));
    }

    #[test]
    fn distribution_reports_imbalance() {
        let mut counts = IndexMap::new();
        counts.insert("B".to_string(), 2);
        counts.insert("A".to_string(), 4);
        counts.insert("C".to_string(), 2);
        let dist = distribution(&counts).expect("distribution");
        assert_eq!(dist.total, 8);
        assert!(!dist.is_uniform());
        assert!((dist.ratio - 2.0).abs() < 1e-6);
        assert_eq!(dist.shares[0].key, "A");
        assert_eq!(dist.shares[1].key, "B");
        assert!(distribution::<String>(&IndexMap::new()).is_none());
    }
}
