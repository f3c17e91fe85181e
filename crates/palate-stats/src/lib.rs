//! Small statistics toolkit shared by the Palate crates.
//!
//! - [`descriptive`]: summary statistics (mean, population standard deviation,
//!   extremes, median) and z-score normalization built on them
//! - [`percentiles`]: nearest-rank stratum boundaries for price tertiles
//!
//! # Examples
//!
//! ```
//! use palate_stats::{descriptive::DescriptiveStats, percentiles};
//!
//! let prices = [10.0, 20.0, 30.0, 40.0];
//! let stats = DescriptiveStats::new(prices).unwrap();
//! assert_eq!(stats.mean, 25.0);
//!
//! let mut sorted = prices.to_vec();
//! sorted.sort_by(f32::total_cmp);
//! let bounds = percentiles::strata_bounds(&sorted, 2);
//! assert_eq!(bounds, vec![30.0]);
//! assert_eq!(percentiles::stratum_of(&bounds, 20.0), 0);
//! ```

pub mod descriptive;
pub mod percentiles;
