/// Summary statistics of an `f32` dataset.
///
/// Variance and standard deviation are population measures (divided by `n`),
/// which is what z-score normalization over a full catalog snapshot needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    /// Number of observations.
    pub count: usize,
    /// Smallest observation.
    pub min: f32,
    /// Largest observation.
    pub max: f32,
    /// Arithmetic mean.
    pub mean: f32,
    /// Upper median (element at `n / 2` of the sorted data).
    pub median: f32,
    /// Population variance.
    pub variance: f32,
    /// Population standard deviation.
    pub std_dev: f32,
}

impl DescriptiveStats {
    /// Computes statistics from unsorted values.
    ///
    /// Returns `None` for an empty dataset.
    ///
    /// # Examples
    ///
    /// ```
    /// # use palate_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.median, 3.0);
    /// assert!((stats.std_dev - 2.0_f32.sqrt()).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f32::total_cmp);
        Self::from_sorted(&values)
    }

    /// Like [`Self::new`], for data already sorted in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f32]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f32;
        let mean = sorted_values.iter().sum::<f32>() / n;
        let median = sorted_values[count / 2];
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / n;

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
        })
    }

    /// Standard score of `value` against this dataset.
    ///
    /// A degenerate dataset (zero spread) uses a unit divisor so the result
    /// stays finite.
    ///
    /// ```
    /// # use palate_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([10.0, 30.0]).unwrap();
    /// assert_eq!(stats.z_score(30.0), 1.0);
    ///
    /// let flat = DescriptiveStats::new([7.0, 7.0]).unwrap();
    /// assert_eq!(flat.z_score(9.0), 2.0);
    /// ```
    #[must_use]
    pub fn z_score(&self, value: f32) -> f32 {
        (value - self.mean) / self.safe_std_dev()
    }

    /// Standard deviation, replaced by `1.0` when it is zero or not finite.
    #[must_use]
    pub fn safe_std_dev(&self) -> f32 {
        if self.std_dev.is_finite() && self.std_dev > 0.0 {
            self.std_dev
        } else {
            1.0
        }
    }
}
