//! Per-category tuning and display copy.

use palate_model::{Category, FeatureKey, ModelParams};
use serde::{Deserialize, Serialize};

use crate::InvalidConfigError;

/// Numbers that shape one duel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub category: Category,
    /// Items offered during onboarding.
    pub pool_size: usize,
    /// Items the player must pick from the pool.
    pub onboarding_picks: usize,
    pub total_rounds: usize,
    pub candidates_per_round: usize,
    /// Low-likelihood candidates injected per round.
    pub wildcards_per_round: usize,
    /// Wildcards are drawn from ranks beyond `likely_band_factor * candidates_per_round`.
    pub likely_band_factor: usize,
    /// Unseen items recommended in the final summary.
    pub top_recommendations: usize,
    pub hidden: HiddenPreferenceThresholds,
}

impl CategoryProfile {
    #[must_use]
    pub fn for_category(category: Category) -> Self {
        let total_rounds = match category {
            Category::FountainPens => 10,
            Category::Movies => 5,
        };
        Self {
            category,
            pool_size: 50,
            onboarding_picks: 10,
            total_rounds,
            candidates_per_round: 10,
            wildcards_per_round: 1,
            likely_band_factor: 2,
            top_recommendations: 5,
            hidden: HiddenPreferenceThresholds::default(),
        }
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let fail = |reason| Err(InvalidConfigError { reason });
        if self.onboarding_picks == 0 {
            return fail("onboarding_picks must be positive");
        }
        if self.onboarding_picks > self.pool_size {
            return fail("onboarding_picks exceeds pool_size");
        }
        if self.total_rounds == 0 {
            return fail("total_rounds must be positive");
        }
        if self.candidates_per_round == 0 {
            return fail("candidates_per_round must be positive");
        }
        if self.wildcards_per_round >= self.candidates_per_round {
            return fail("wildcards_per_round must leave room for likely candidates");
        }
        if self.likely_band_factor == 0 {
            return fail("likely_band_factor must be positive");
        }
        if !(0.0..=1.0).contains(&self.hidden.min_weight) {
            return fail("hidden.min_weight must lie in 0..=1");
        }
        Ok(())
    }

    #[must_use]
    pub fn copy(&self) -> &'static CategoryCopy {
        CategoryCopy::for_category(self.category)
    }
}

/// Gates of the hidden-preference detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiddenPreferenceThresholds {
    /// Minimum normalized learned weight.
    pub min_weight: f32,
    /// Minimum gap between normalized weight and selection frequency.
    pub min_latency: f32,
    /// Selections required before anything is reported.
    pub min_selections: usize,
    pub max_features: usize,
    pub gem_count: usize,
    /// Whether exception picks count toward selection frequency.
    pub count_exception_picks: bool,
}

impl Default for HiddenPreferenceThresholds {
    fn default() -> Self {
        Self {
            min_weight: 0.5,
            min_latency: 0.3,
            min_selections: 12,
            max_features: 6,
            gem_count: 5,
            count_exception_picks: false,
        }
    }
}

/// Complete engine configuration; deserializable so that a profile can be
/// overridden without rebuilding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub profile: CategoryProfile,
    #[serde(default)]
    pub model: ModelParams,
}

impl GameConfig {
    #[must_use]
    pub fn for_category(category: Category) -> Self {
        Self {
            profile: CategoryProfile::for_category(category),
            model: ModelParams::default(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::for_category(Category::default())
    }
}

/// Player-facing wording of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCopy {
    pub display_name: &'static str,
    pub item_singular: &'static str,
    pub item_plural: &'static str,
    pub vendor_label: &'static str,
    pub onboarding_action: &'static str,
    pub top_recommendations_label: &'static str,
    pub hidden_gems_label: &'static str,
    pub hidden_gems_subtitle: &'static str,
    /// Values too generic to be worth reporting as a taste signal.
    #[serde(skip)]
    pub redundant_tokens: &'static [&'static str],
}

static FOUNTAIN_PENS_COPY: CategoryCopy = CategoryCopy {
    display_name: "Fountain Pens",
    item_singular: "pen",
    item_plural: "pens",
    vendor_label: "Brand",
    onboarding_action: "Choose 10 pens from a pool of 50 to build your taste profile.",
    top_recommendations_label: "AI's Top 5 Picks for You",
    hidden_gems_label: "Hidden Gems - Patterns You Might Not Have Noticed",
    hidden_gems_subtitle: "Pens You Didn't Know You'd Love",
    redundant_tokens: &[
        "fountain pens",
        "fountain pen",
        "pens",
        "pen",
        "ink",
        "inks",
        "writing",
        "stationery",
        "products",
    ],
};

static MOVIES_COPY: CategoryCopy = CategoryCopy {
    display_name: "Movies",
    item_singular: "movie",
    item_plural: "movies",
    vendor_label: "Studio",
    onboarding_action: "Choose 10 movies from a pool of 50 to build your taste profile.",
    top_recommendations_label: "AI's Top 5 Movies for You",
    hidden_gems_label: "Hidden Gems - Patterns You Might Not Have Noticed",
    hidden_gems_subtitle: "Movies You Didn't Know You'd Love",
    redundant_tokens: &["movie", "movies", "film", "films"],
};

impl CategoryCopy {
    #[must_use]
    pub fn for_category(category: Category) -> &'static Self {
        match category {
            Category::FountainPens => &FOUNTAIN_PENS_COPY,
            Category::Movies => &MOVIES_COPY,
        }
    }

    /// Human-readable label of a feature, or `None` when the feature is
    /// numeric or too generic for this category.
    ///
    /// ```
    /// use palate_engine::CategoryCopy;
    /// use palate_model::{Category, FeatureKey};
    ///
    /// let copy = CategoryCopy::for_category(Category::FountainPens);
    /// assert_eq!(copy.feature_label(&FeatureKey::option("Nib Size", "Fine")).as_deref(), Some("Fine Nib Size"));
    /// assert_eq!(copy.feature_label(&FeatureKey::item_type("Fountain Pens")), None);
    /// ```
    #[must_use]
    pub fn feature_label(&self, key: &FeatureKey) -> Option<String> {
        let value = match key {
            FeatureKey::Vendor { value }
            | FeatureKey::ItemType { value }
            | FeatureKey::Tag { value }
            | FeatureKey::Option { value, .. } => value,
            FeatureKey::PriceMin | FeatureKey::PriceMax => return None,
        };
        if self.redundant_tokens.contains(&value.as_str()) {
            return None;
        }
        let label = match key {
            FeatureKey::Option { name, value } => {
                format!("{} {}", title_case(value), title_case(name))
            }
            _ => title_case(value),
        };
        Some(label)
    }
}

fn title_case(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
