//! Sequential preference model.
//!
//! A [`PreferenceModel`] tracks one player's taste as a point in the feature
//! space of the catalog. Every deliberate pick pulls the preference vector
//! toward the picked item; prefix ratings shift a scalar bias. Candidates are
//! scored by cosine similarity to the preference vector plus that bias.
//!
//! # Update rule
//!
//! ```text
//! pref' = (1 - decay) * pref + decay * weight * item
//! ```
//!
//! `weight` is `1.0` for normal picks and [`ModelParams::exception_weight`]
//! for picks the player flagged as exceptions. `decay` comes from a
//! [`DecaySchedule`]; the default schedule starts as a running mean and
//! settles into an exponential moving average.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::feature_space::{FeatureKey, FeatureSpace, FeatureVector};

/// Coherence reported for sets with fewer than two comparable vectors.
pub const NEUTRAL_COHERENCE: f32 = 0.0;

/// How strongly a pick moves the preference vector as history grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecaySchedule {
    /// `max(floor, 1 / (count + 1))`: the first pick is taken as-is, early
    /// picks are averaged, later picks use the floor rate.
    Harmonic { floor: f32 },
    /// Same rate for every pick.
    Constant { rate: f32 },
}

impl Default for DecaySchedule {
    fn default() -> Self {
        Self::Harmonic { floor: 0.15 }
    }
}

impl DecaySchedule {
    /// Rate to apply to the pick that follows `selection_count` earlier picks.
    ///
    /// ```
    /// use palate_model::DecaySchedule;
    ///
    /// let schedule = DecaySchedule::Harmonic { floor: 0.2 };
    /// assert_eq!(schedule.decay(0), 1.0);
    /// assert_eq!(schedule.decay(1), 0.5);
    /// assert_eq!(schedule.decay(9), 0.2);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn decay(&self, selection_count: usize) -> f32 {
        match *self {
            Self::Harmonic { floor } => (1.0 / (selection_count as f32 + 1.0)).max(floor),
            Self::Constant { rate } => rate,
        }
    }
}

/// Tunable constants of the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Weight of an exception-flagged pick relative to a normal pick (< 1).
    pub exception_weight: f32,
    /// Bias step per rating point of error.
    pub rating_learning_rate: f32,
    pub decay: DecaySchedule,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            exception_weight: 0.35,
            rating_learning_rate: 0.25,
            decay: DecaySchedule::default(),
        }
    }
}

/// Evolving taste state of a single session.
///
/// Fields are read-only outside this module: the selection count always
/// equals the number of [`PreferenceModel::update`] calls applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceState {
    vector: FeatureVector,
    bias: f32,
    selection_count: usize,
}

impl PreferenceState {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            vector: FeatureVector::zeros(dimension),
            bias: 0.0,
            selection_count: 0,
        }
    }

    #[must_use]
    pub fn vector(&self) -> &FeatureVector {
        &self.vector
    }

    #[must_use]
    pub fn bias(&self) -> f32 {
        self.bias
    }

    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.selection_count
    }
}

/// A player's preference state together with the parameters that evolve it.
///
/// # Example
///
/// ```
/// use palate_model::{CatalogItem, Category, FeatureSpace, ModelParams, PreferenceModel};
///
/// let items = [
///     CatalogItem::new("a", Category::FountainPens).with_vendor("Lamy"),
///     CatalogItem::new("b", Category::FountainPens).with_vendor("Pilot"),
/// ];
/// let space = FeatureSpace::build(&items);
/// let mut model = PreferenceModel::new(space.dimension(), ModelParams::default());
///
/// // Nothing learned yet: every candidate scores the bias alone.
/// assert_eq!(model.score(&space.vectorize(&items[0])), 0.0);
///
/// model.observe(&space.vectorize(&items[0]), false);
/// assert!(model.score(&space.vectorize(&items[0])) > model.score(&space.vectorize(&items[1])));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceModel {
    params: ModelParams,
    state: PreferenceState,
}

impl PreferenceModel {
    #[must_use]
    pub fn new(dimension: usize, params: ModelParams) -> Self {
        Self::from_state(PreferenceState::new(dimension), params)
    }

    /// Resumes a model from a persisted state.
    #[must_use]
    pub fn from_state(state: PreferenceState, params: ModelParams) -> Self {
        Self { params, state }
    }

    #[must_use]
    pub fn state(&self) -> &PreferenceState {
        &self.state
    }

    #[must_use]
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.state.vector.dimension()
    }

    /// Decay the schedule assigns to the next pick.
    #[must_use]
    pub fn next_decay(&self) -> f32 {
        self.params.decay.decay(self.state.selection_count)
    }

    /// Moves the preference vector toward `selected`.
    ///
    /// Not idempotent: applying the same pick twice moves the vector twice.
    ///
    /// # Panics
    ///
    /// Panics if `selected` does not have the model's dimension.
    pub fn update(&mut self, selected: &FeatureVector, is_exception: bool, decay: f32) {
        assert_eq!(
            selected.dimension(),
            self.dimension(),
            "feature vectors from different feature spaces"
        );
        let weight = if is_exception {
            self.params.exception_weight
        } else {
            1.0
        };
        for (p, &s) in self
            .state
            .vector
            .as_mut_slice()
            .iter_mut()
            .zip(selected.as_slice())
        {
            *p = (1.0 - decay) * *p + decay * weight * s;
        }
        self.state.selection_count += 1;
    }

    /// [`Self::update`] with the decay of the configured schedule.
    pub fn observe(&mut self, selected: &FeatureVector, is_exception: bool) {
        let decay = self.next_decay();
        self.update(selected, is_exception, decay);
    }

    /// Shifts the bias by the rating error against `baseline`.
    pub fn apply_prefix_rating(&mut self, rating: u8, baseline: f32) {
        let error = f32::from(rating) - baseline;
        self.state.bias += self.params.rating_learning_rate * error;
    }

    /// Rating (1 to 5) the model expects the player to give the current
    /// prefix. Grows with the strength of the learned taste.
    #[must_use]
    pub fn predict_prefix_rating(&self) -> f32 {
        let strength = (self.state.vector.norm() / 3.0).tanh();
        (3.0 + 1.5 * strength + self.state.bias).clamp(1.0, 5.0)
    }

    /// Cosine similarity to the preference vector plus the bias.
    ///
    /// With an empty preference (or an all-zero candidate) the similarity
    /// term is zero and the score is the bias alone.
    ///
    /// # Panics
    ///
    /// Panics if `candidate` does not have the model's dimension.
    #[must_use]
    pub fn score(&self, candidate: &FeatureVector) -> f32 {
        self.state
            .vector
            .cosine_similarity(candidate)
            .unwrap_or(0.0)
            + self.state.bias
    }

    /// Mean pairwise cosine similarity of `vectors`.
    ///
    /// Pairs involving a zero vector are skipped. Returns
    /// [`NEUTRAL_COHERENCE`] when no pair is comparable, which includes every
    /// set of fewer than two vectors.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn coherence(vectors: &[FeatureVector]) -> f32 {
        let mut total = 0.0;
        let mut pairs = 0_usize;
        for (i, a) in vectors.iter().enumerate() {
            for b in &vectors[i + 1..] {
                if let Some(similarity) = a.cosine_similarity(b) {
                    total += similarity;
                    pairs += 1;
                }
            }
        }
        if pairs == 0 {
            NEUTRAL_COHERENCE
        } else {
            total / pairs as f32
        }
    }

    /// The `n` categorical features with the largest positive learned
    /// weight, strongest first.
    #[must_use]
    pub fn top_features(&self, space: &FeatureSpace, n: usize) -> Vec<(FeatureKey, f32)> {
        let weights = self.state.vector.as_slice();
        let mut ranked = space
            .categorical_indices()
            .filter(|&i| weights[i] > 0.0)
            .collect::<Vec<_>>();
        ranked.sort_by(|&a, &b| {
            weights[b]
                .partial_cmp(&weights[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|i| (space.key(i).clone(), weights[i]))
            .collect()
    }
}
