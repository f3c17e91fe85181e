//! Catalog vectorization.
//!
//! A [`FeatureSpace`] is built once from a catalog snapshot and fixes the
//! layout every [`FeatureVector`] of that snapshot uses:
//!
//! ```text
//! [ vendor::* | type::* | tag::* | opt::*::* (first-seen order) | price_min_z | price_max_z ]
//! ```
//!
//! Categorical dimensions are multi-hot (`1.0` when the item carries the
//! value). The two trailing numeric dimensions hold the item's prices as
//! z-scores against every price observed in the snapshot.
//!
//! The space is immutable after [`FeatureSpace::build`] and is meant to be
//! shared (`Arc<FeatureSpace>`) by every session playing on the same catalog.

use std::{collections::HashMap, fmt, iter};

use palate_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;

/// Name of one dimension of a [`FeatureSpace`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKey {
    Vendor { value: String },
    ItemType { value: String },
    Tag { value: String },
    Option { name: String, value: String },
    PriceMin,
    PriceMax,
}

impl FeatureKey {
    #[must_use]
    pub fn vendor(value: &str) -> Self {
        Self::Vendor {
            value: normalize_token(value),
        }
    }

    #[must_use]
    pub fn item_type(value: &str) -> Self {
        Self::ItemType {
            value: normalize_token(value),
        }
    }

    #[must_use]
    pub fn tag(value: &str) -> Self {
        Self::Tag {
            value: normalize_token(value),
        }
    }

    #[must_use]
    pub fn option(name: &str, value: &str) -> Self {
        Self::Option {
            name: normalize_token(name),
            value: normalize_token(value),
        }
    }

    /// Numeric dimensions carry magnitudes rather than presence, so they are
    /// never reported as discoverable taste signals.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::PriceMin | Self::PriceMax)
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor { value } => write!(f, "vendor::{value}"),
            Self::ItemType { value } => write!(f, "type::{value}"),
            Self::Tag { value } => write!(f, "tag::{value}"),
            Self::Option { name, value } => write!(f, "opt::{name}::{value}"),
            Self::PriceMin => f.write_str("price_min_z"),
            Self::PriceMax => f.write_str("price_max_z"),
        }
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Categorical keys an item activates, in a fixed order.
fn categorical_keys(item: &CatalogItem) -> impl Iterator<Item = FeatureKey> + '_ {
    let vendor = item
        .vendor
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(FeatureKey::vendor);
    let item_type = item
        .item_type
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(FeatureKey::item_type);
    let tags = item
        .tags
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| FeatureKey::tag(t));
    let options = item.options.iter().flat_map(|(name, values)| {
        values
            .iter()
            .filter(|v| !v.trim().is_empty())
            .map(move |v| FeatureKey::option(name, v))
    });
    vendor.into_iter().chain(item_type).chain(tags).chain(options)
}

/// Fixed-dimension numeric representation of a catalog item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    #[must_use]
    pub fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    #[must_use]
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> f32 {
        self.0[index]
    }

    /// # Panics
    ///
    /// Panics if the vectors have different dimensions.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        assert_same_dimension(self, other);
        iter::zip(&self.0, &other.0).map(|(a, b)| a * b).sum()
    }

    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Cosine similarity, or `None` when either vector has zero magnitude.
    ///
    /// # Panics
    ///
    /// Panics if the vectors have different dimensions.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Self) -> Option<f32> {
        let denom = self.norm() * other.norm();
        if denom > 0.0 {
            Some(self.dot(other) / denom)
        } else {
            assert_same_dimension(self, other);
            None
        }
    }

    /// Copy of this vector with every dimension not in `keep` set to zero.
    #[must_use]
    pub fn masked(&self, keep: &[usize]) -> Self {
        let mut masked = Self::zeros(self.dimension());
        for &i in keep {
            masked.0[i] = self.0[i];
        }
        masked
    }
}

fn assert_same_dimension(a: &FeatureVector, b: &FeatureVector) {
    assert_eq!(
        a.dimension(),
        b.dimension(),
        "feature vectors from different feature spaces"
    );
}

/// Dimension layout and normalization statistics of one catalog snapshot.
///
/// # Example
///
/// ```
/// use palate_model::{CatalogItem, Category, FeatureKey, FeatureSpace};
///
/// let items = [
///     CatalogItem::new("a", Category::FountainPens)
///         .with_vendor("Lamy")
///         .with_tags(["starter"])
///         .with_price(20.0, 30.0),
///     CatalogItem::new("b", Category::FountainPens)
///         .with_vendor("Pilot")
///         .with_price(40.0, 50.0),
/// ];
/// let space = FeatureSpace::build(&items);
///
/// // vendor::lamy, tag::starter, vendor::pilot, price_min_z, price_max_z
/// assert_eq!(space.dimension(), 5);
/// let v = space.vectorize(&items[0]);
/// assert_eq!(v.get(space.index_of(&FeatureKey::vendor("lamy")).unwrap()), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    keys: Vec<FeatureKey>,
    index: HashMap<FeatureKey, usize>,
    price_stats: PriceStats,
}

/// Mean and (non-zero) standard deviation used for price z-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub mean: f32,
    pub std_dev: f32,
}

impl Default for PriceStats {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std_dev: 1.0,
        }
    }
}

impl PriceStats {
    #[must_use]
    pub fn z_score(&self, price: f32) -> f32 {
        (price - self.mean) / self.std_dev
    }
}

impl FeatureSpace {
    /// Computes the vocabulary and price statistics of `items`.
    ///
    /// Both `price_min` and `price_max` observations feed the same
    /// statistics. Without any price the normalization is the identity.
    #[must_use]
    pub fn build<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a CatalogItem>,
    {
        let mut keys = Vec::new();
        let mut index = HashMap::new();
        let mut prices = Vec::new();

        for item in items {
            for key in categorical_keys(item) {
                index.entry(key).or_insert_with_key(|key| {
                    keys.push(key.clone());
                    keys.len() - 1
                });
            }
            prices.extend(item.price_min.into_iter().chain(item.price_max));
        }
        for key in [FeatureKey::PriceMin, FeatureKey::PriceMax] {
            index.insert(key.clone(), keys.len());
            keys.push(key);
        }

        let price_stats = DescriptiveStats::new(prices)
            .map(|stats| PriceStats {
                mean: stats.mean,
                std_dev: stats.safe_std_dev(),
            })
            .unwrap_or_default();

        Self {
            keys,
            index,
            price_stats,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn keys(&self) -> &[FeatureKey] {
        &self.keys
    }

    #[must_use]
    pub fn key(&self, index: usize) -> &FeatureKey {
        &self.keys[index]
    }

    #[must_use]
    pub fn index_of(&self, key: &FeatureKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    #[must_use]
    pub fn is_numeric(&self, index: usize) -> bool {
        self.keys[index].is_numeric()
    }

    /// Indices of every categorical (non-numeric) dimension.
    pub fn categorical_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.dimension()).filter(|&i| !self.is_numeric(i))
    }

    #[must_use]
    pub fn price_stats(&self) -> PriceStats {
        self.price_stats
    }

    /// Vectorizes an item.
    ///
    /// Categorical values that were not part of the snapshot contribute
    /// nothing; missing prices leave their slot at zero.
    #[must_use]
    pub fn vectorize(&self, item: &CatalogItem) -> FeatureVector {
        let mut vector = FeatureVector::zeros(self.dimension());
        let values = vector.as_mut_slice();
        for key in categorical_keys(item) {
            if let Some(&i) = self.index.get(&key) {
                values[i] = 1.0;
            }
        }
        for (key, price) in [
            (FeatureKey::PriceMin, item.price_min),
            (FeatureKey::PriceMax, item.price_max),
        ] {
            if let Some(price) = price {
                values[self.index[&key]] = self.price_stats.z_score(price);
            }
        }
        vector
    }

    /// Vector with only the named dimensions set, such as a scripted taste.
    /// Unknown keys are ignored.
    #[must_use]
    pub fn indicator<'a, I>(&self, keys: I) -> FeatureVector
    where
        I: IntoIterator<Item = &'a FeatureKey>,
    {
        let mut vector = FeatureVector::zeros(self.dimension());
        for key in keys {
            if let Some(i) = self.index_of(key) {
                vector.as_mut_slice()[i] = 1.0;
            }
        }
        vector
    }
}
