//! Detection of taste the model learned but the player never deliberately
//! acted on.
//!
//! For every categorical dimension the detector compares two numbers:
//!
//! - the *weight*: the learned preference, min-max rescaled to `0..=1`
//!   across the categorical dimensions;
//! - the *frequency*: the share of the player's picks that carry the
//!   dimension.
//!
//! Their difference is the *latency*. A dimension with a high weight and a
//! high latency is a pattern the picks imply without the player having
//! chosen it directly. Price dimensions are magnitudes, not traits, and are
//! never reported.

use std::{cmp::Ordering, collections::HashSet};

use palate_model::{FeatureKey, FeatureSpace, FeatureVector, ItemId};
use serde::{Deserialize, Serialize};

use crate::{Catalog, CategoryCopy, HiddenPreferenceThresholds, Session};

/// Weight, frequency and latency of one categorical dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInsight {
    pub index: usize,
    pub key: FeatureKey,
    pub weight: f32,
    pub frequency: f32,
    pub latency: f32,
}

/// An unseen item that matches the hidden pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gem {
    pub item_id: ItemId,
    pub score: f32,
    /// Labels of the hidden features the item carries.
    pub matched: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiddenPreferenceResult {
    /// Every categorical dimension, in feature order.
    pub features: Vec<FeatureInsight>,
    /// Dimensions passing both thresholds, by latency descending.
    pub qualifying: Vec<FeatureInsight>,
    pub gems: Vec<Gem>,
}

impl HiddenPreferenceResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qualifying.is_empty() && self.gems.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiddenPreferenceDetector {
    thresholds: HiddenPreferenceThresholds,
}

impl HiddenPreferenceDetector {
    #[must_use]
    pub fn new(thresholds: HiddenPreferenceThresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &HiddenPreferenceThresholds {
        &self.thresholds
    }

    /// Analyzes a session's selections and scores gems among the items of
    /// its category the player has not seen.
    ///
    /// Returns an empty result until the session holds
    /// `min_selections` selections.
    #[must_use]
    pub fn detect(&self, session: &Session, catalog: &Catalog) -> HiddenPreferenceResult {
        let selections = session.selections();
        if selections.len() < self.thresholds.min_selections {
            tracing::debug!(
                session_id = %session.id(),
                selections = selections.len(),
                required = self.thresholds.min_selections,
                "too few selections for hidden preferences"
            );
            return HiddenPreferenceResult::default();
        }

        let counted = selections
            .iter()
            .filter(|s| self.thresholds.count_exception_picks || !s.is_exception)
            .filter_map(|s| catalog.vector(&s.item_id))
            .collect::<Vec<_>>();
        let preference = session.model().state().vector();
        let copy = CategoryCopy::for_category(session.category());
        let (features, qualifying) = self.analyze(catalog.space(), copy, preference, &counted);

        let seen = session.seen_items();
        let masked = preference.masked(&qualifying.iter().map(|f| f.index).collect::<Vec<_>>());
        let mut gems = Vec::new();
        if !qualifying.is_empty() {
            gems = catalog
                .in_category(session.category())
                .filter(|&pos| !seen.contains(&catalog.item_at(pos).id))
                .filter_map(|pos| {
                    let vector = catalog.vector_at(pos);
                    let score = masked.cosine_similarity(vector).filter(|&s| s > 0.0)?;
                    let matched = qualifying
                        .iter()
                        .filter(|f| vector.get(f.index) > 0.0)
                        .filter_map(|f| copy.feature_label(&f.key))
                        .collect();
                    Some(Gem {
                        item_id: catalog.item_at(pos).id.clone(),
                        score,
                        matched,
                    })
                })
                .collect();
            gems.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| a.item_id.cmp(&b.item_id))
            });
            gems.truncate(self.thresholds.gem_count);
        }

        tracing::debug!(
            session_id = %session.id(),
            qualifying = qualifying.len(),
            gems = gems.len(),
            "hidden preferences detected"
        );
        HiddenPreferenceResult {
            features,
            qualifying,
            gems,
        }
    }

    /// Computes weight, frequency and latency for each categorical dimension
    /// of `space`, and the qualifying subset.
    ///
    /// `selected` holds the vectors of the picks that count toward
    /// frequency. Features `copy` has no label for never qualify, and of
    /// several features sharing a label only the one with the highest
    /// latency does. Does not check `min_selections`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn analyze(
        &self,
        space: &FeatureSpace,
        copy: &CategoryCopy,
        preference: &FeatureVector,
        selected: &[&FeatureVector],
    ) -> (Vec<FeatureInsight>, Vec<FeatureInsight>) {
        let categorical = space.categorical_indices().collect::<Vec<_>>();
        let (min, max) = categorical
            .iter()
            .map(|&i| preference.get(i))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), w| {
                (lo.min(w), hi.max(w))
            });
        let range = max - min;

        let features = categorical
            .iter()
            .map(|&index| {
                let weight = if range > f32::EPSILON {
                    (preference.get(index) - min) / range
                } else {
                    0.0
                };
                let hits = selected.iter().filter(|v| v.get(index) > 0.0).count();
                let frequency = if selected.is_empty() {
                    0.0
                } else {
                    hits as f32 / selected.len() as f32
                };
                FeatureInsight {
                    index,
                    key: space.key(index).clone(),
                    weight,
                    frequency,
                    latency: weight - frequency,
                }
            })
            .collect::<Vec<_>>();

        let mut qualifying = features
            .iter()
            .filter(|f| {
                f.weight >= self.thresholds.min_weight && f.latency >= self.thresholds.min_latency
            })
            .cloned()
            .collect::<Vec<_>>();
        qualifying.sort_by(|a, b| {
            b.latency
                .partial_cmp(&a.latency)
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        let mut labels = HashSet::new();
        qualifying.retain(|f| {
            copy.feature_label(&f.key)
                .is_some_and(|label| labels.insert(label))
        });
        qualifying.truncate(self.thresholds.max_features);

        (features, qualifying)
    }
}
