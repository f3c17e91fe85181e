/// Upper boundaries that split sorted data into `strata` equally populated
/// groups.
///
/// The k-th boundary is the nearest-rank value at index `k * n / strata`, so
/// three strata cut at the 33rd and 66th percentiles.
///
/// Returns `strata - 1` cut points; a value `v` belongs to the first stratum
/// whose boundary satisfies `v <= boundary`, or to the last stratum when it
/// exceeds every boundary. Empty input or fewer than two strata yield no cuts.
///
/// ```
/// use palate_stats::percentiles::strata_bounds;
///
/// let values: Vec<f32> = (1..=9).map(|v| v as f32).collect();
/// assert_eq!(strata_bounds(&values, 3), vec![4.0, 7.0]);
/// ```
#[must_use]
pub fn strata_bounds(sorted_values: &[f32], strata: usize) -> Vec<f32> {
    if sorted_values.is_empty() || strata < 2 {
        return Vec::new();
    }
    (1..strata)
        .map(|k| sorted_values[(k * sorted_values.len() / strata).min(sorted_values.len() - 1)])
        .collect()
}

/// Index of the stratum `value` falls into given [`strata_bounds`] output.
///
/// ```
/// use palate_stats::percentiles::stratum_of;
///
/// let bounds = [10.0, 20.0];
/// assert_eq!(stratum_of(&bounds, 5.0), 0);
/// assert_eq!(stratum_of(&bounds, 10.0), 0);
/// assert_eq!(stratum_of(&bounds, 15.0), 1);
/// assert_eq!(stratum_of(&bounds, 99.0), 2);
/// ```
#[must_use]
pub fn stratum_of(bounds: &[f32], value: f32) -> usize {
    bounds
        .iter()
        .position(|&bound| value <= bound)
        .unwrap_or(bounds.len())
}
