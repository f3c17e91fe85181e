//! Onboarding pools and per-round candidate sets.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
};

use palate_model::{Category, ItemId, PreferenceModel};
use palate_stats::percentiles::{strata_bounds, stratum_of};
use rand::{Rng, seq::SliceRandom as _};
use serde::{Deserialize, Serialize};

use crate::{Catalog, CategoryProfile, InsufficientCatalogError};

/// Number of price strata the onboarding pool is balanced over.
const PRICE_STRATA: usize = 3;

/// A candidate together with the score the model gave it when the round
/// was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub item_id: ItemId,
    pub score: f32,
    /// Drawn from outside the likely band rather than ranked in.
    pub wildcard: bool,
}

/// Builds the item sets a player chooses from.
///
/// All randomness comes from the caller's generator, so a seeded generator
/// and an unchanged model reproduce the same output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSampler {
    wildcards: usize,
    likely_band_factor: usize,
}

impl CandidateSampler {
    #[must_use]
    pub fn new(wildcards: usize, likely_band_factor: usize) -> Self {
        Self {
            wildcards,
            likely_band_factor,
        }
    }

    #[must_use]
    pub fn from_profile(profile: &CategoryProfile) -> Self {
        Self::new(profile.wildcards_per_round, profile.likely_band_factor)
    }

    /// Draws a price- and vendor-diverse pool of `pool_size` items.
    ///
    /// Items are split into three strata at the tertiles of `price_min`
    /// (missing prices count as zero). Each stratum receives an even share
    /// of the pool and is filled round-robin across vendors in random
    /// order, so no vendor gets a second item while another vendor of the
    /// stratum still has none left to give. Shortfalls are topped up from
    /// the remaining items and the pool is shuffled before it is returned.
    pub fn onboarding_pool<R>(
        &self,
        catalog: &Catalog,
        category: Category,
        pool_size: usize,
        rng: &mut R,
    ) -> Result<Vec<ItemId>, InsufficientCatalogError>
    where
        R: Rng + ?Sized,
    {
        let mut eligible = catalog.in_category(category).collect::<Vec<_>>();
        if eligible.len() < pool_size {
            return Err(InsufficientCatalogError {
                category,
                required: pool_size,
                available: eligible.len(),
            });
        }
        eligible.shuffle(rng);

        let price = |pos: usize| catalog.item_at(pos).price_min.unwrap_or(0.0);
        let mut prices = eligible.iter().map(|&pos| price(pos)).collect::<Vec<_>>();
        prices.sort_by(f32::total_cmp);
        let bounds = strata_bounds(&prices, PRICE_STRATA);

        let mut strata = vec![Vec::new(); PRICE_STRATA];
        for &pos in &eligible {
            strata[stratum_of(&bounds, price(pos))].push(pos);
        }

        let mut chosen = Vec::with_capacity(pool_size);
        for (i, stratum) in strata.into_iter().enumerate() {
            let target = pool_size / PRICE_STRATA + usize::from(i < pool_size % PRICE_STRATA);
            let picks = vendor_round_robin(catalog, stratum, target, rng);
            tracing::debug!(stratum = i, target, picked = picks.len(), "onboarding stratum");
            chosen.extend(picks);
        }

        if chosen.len() < pool_size {
            let taken = chosen.iter().copied().collect::<HashSet<_>>();
            let mut remainder = eligible
                .iter()
                .copied()
                .filter(|pos| !taken.contains(pos))
                .collect::<Vec<_>>();
            remainder.shuffle(rng);
            chosen.extend(remainder.into_iter().take(pool_size - chosen.len()));
        }
        chosen.shuffle(rng);

        Ok(chosen
            .into_iter()
            .map(|pos| catalog.item_at(pos).id.clone())
            .collect())
    }

    /// Scores every eligible item and returns `size` candidates ordered by
    /// score (descending, ties by ascending id).
    ///
    /// The best `size - wildcards` items are taken as likely picks. The
    /// wildcard slots are filled at random from ranks beyond
    /// `likely_band_factor * size`, preferring vendors absent from the
    /// likely picks. When that band holds fewer items than there are
    /// wildcard slots, the rest come from the ranks just below the likely
    /// picks. Ids in `excluded` never appear.
    pub fn round_candidates<R>(
        &self,
        model: &PreferenceModel,
        catalog: &Catalog,
        category: Category,
        excluded: &HashSet<ItemId>,
        size: usize,
        rng: &mut R,
    ) -> Result<Vec<ScoredCandidate>, InsufficientCatalogError>
    where
        R: Rng + ?Sized,
    {
        let mut ranked = catalog
            .in_category(category)
            .filter(|&pos| !excluded.contains(&catalog.item_at(pos).id))
            .map(|pos| (model.score(catalog.vector_at(pos)), pos))
            .collect::<Vec<_>>();
        if ranked.len() < size {
            return Err(InsufficientCatalogError {
                category,
                required: size,
                available: ranked.len(),
            });
        }
        ranked.sort_by(|a, b| by_score_then_id(catalog, *a, *b));

        let wildcards = self.wildcards.min(size);
        let likely_len = size - wildcards;
        let (likely, rest) = ranked.split_at(likely_len);
        let band_end = (self.likely_band_factor * size).max(likely_len);
        let tail = match ranked.get(band_end..) {
            Some(tail) if !tail.is_empty() => tail,
            _ => rest,
        };

        let likely_vendors = likely
            .iter()
            .map(|&(_, pos)| catalog.item_at(pos).vendor_or_unknown())
            .collect::<HashSet<_>>();
        let mut drawn = draw_wildcards(catalog, tail, &likely_vendors, wildcards, rng);
        if drawn.len() < wildcards {
            // The band beyond the likely ranks is too thin; fill from the
            // remaining ranks.
            let taken = drawn.iter().map(|&(_, pos)| pos).collect::<HashSet<_>>();
            let remaining = rest
                .iter()
                .copied()
                .filter(|(_, pos)| !taken.contains(pos))
                .collect::<Vec<_>>();
            let missing = wildcards - drawn.len();
            drawn.extend(draw_wildcards(catalog, &remaining, &likely_vendors, missing, rng));
        }
        tracing::debug!(
            eligible = ranked.len(),
            likely = likely.len(),
            wildcards = drawn.len(),
            "round candidates"
        );

        let mut candidates = likely
            .iter()
            .map(|&entry| (entry, false))
            .chain(drawn.into_iter().map(|entry| (entry, true)))
            .collect::<Vec<_>>();
        candidates.sort_by(|(a, _), (b, _)| by_score_then_id(catalog, *a, *b));

        Ok(candidates
            .into_iter()
            .map(|((score, pos), wildcard)| ScoredCandidate {
                item_id: catalog.item_at(pos).id.clone(),
                score,
                wildcard,
            })
            .collect())
    }
}

/// Draws up to `count` entries from `pool` at random, vendors missing from
/// `likely_vendors` first.
fn draw_wildcards<R>(
    catalog: &Catalog,
    pool: &[(f32, usize)],
    likely_vendors: &HashSet<&str>,
    count: usize,
    rng: &mut R,
) -> Vec<(f32, usize)>
where
    R: Rng + ?Sized,
{
    let (mut fresh, mut familiar): (Vec<_>, Vec<_>) = pool
        .iter()
        .copied()
        .partition(|&(_, pos)| {
            !likely_vendors.contains(catalog.item_at(pos).vendor_or_unknown())
        });
    fresh.shuffle(rng);
    familiar.shuffle(rng);
    fresh.into_iter().chain(familiar).take(count).collect()
}

fn by_score_then_id(catalog: &Catalog, (sa, pa): (f32, usize), (sb, pb): (f32, usize)) -> Ordering {
    sb.total_cmp(&sa)
        .then_with(|| catalog.item_at(pa).id.cmp(&catalog.item_at(pb).id))
}

/// Takes up to `target` items from `bucket`, one vendor at a time.
fn vendor_round_robin<R>(catalog: &Catalog, bucket: Vec<usize>, target: usize, rng: &mut R) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    let mut by_vendor = BTreeMap::<&str, Vec<usize>>::new();
    for pos in bucket {
        by_vendor
            .entry(catalog.item_at(pos).vendor_or_unknown())
            .or_default()
            .push(pos);
    }
    for items in by_vendor.values_mut() {
        items.shuffle(rng);
    }
    let mut vendors = by_vendor.keys().copied().collect::<Vec<_>>();
    vendors.shuffle(rng);

    let mut picks = Vec::with_capacity(target);
    while picks.len() < target && !vendors.is_empty() {
        let mut next_round = Vec::with_capacity(vendors.len());
        for vendor in vendors {
            let items = by_vendor.get_mut(vendor).map(Vec::pop);
            if let Some(Some(pos)) = items {
                picks.push(pos);
                if picks.len() >= target {
                    break;
                }
            }
            if by_vendor.get(vendor).is_some_and(|items| !items.is_empty()) {
                next_round.push(vendor);
            }
        }
        vendors = next_round;
    }
    picks
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use palate_model::{CatalogItem, FeatureKey, ModelParams};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn catalog(n: usize, vendors: usize) -> Catalog {
        #[expect(clippy::cast_precision_loss)]
        let items = (0..n)
            .map(|i| {
                CatalogItem::new(format!("item-{i:03}"), Category::FountainPens)
                    .with_vendor(format!("v{}", i % vendors))
                    .with_tags([format!("t{}", i % 4)])
                    .with_price(i as f32, i as f32 + 5.0)
            })
            .collect();
        Catalog::new(items)
    }

    #[test]
    fn test_onboarding_pool_size_and_uniqueness() {
        let catalog = catalog(120, 6);
        let sampler = CandidateSampler::new(1, 2);
        let mut rng = Pcg32::seed_from_u64(1);
        let pool = sampler
            .onboarding_pool(&catalog, Category::FountainPens, 50, &mut rng)
            .unwrap();
        assert_eq!(pool.len(), 50);
        assert_eq!(pool.iter().collect::<HashSet<_>>().len(), 50);
    }

    #[test]
    fn test_onboarding_pool_balances_price_and_vendor() {
        let catalog = catalog(150, 5);
        let sampler = CandidateSampler::new(1, 2);
        let mut rng = Pcg32::seed_from_u64(9);
        let pool = sampler
            .onboarding_pool(&catalog, Category::FountainPens, 50, &mut rng)
            .unwrap();

        // Prices are 0..150, so tertile cuts sit at 50 and 100.
        let mut per_stratum = [0; 3];
        let mut per_vendor = HashMap::<&str, usize>::new();
        for id in &pool {
            let item = catalog.get(id).unwrap();
            let price = item.price_min.unwrap();
            per_stratum[usize::from(price > 50.0) + usize::from(price > 100.0)] += 1;
            *per_vendor.entry(item.vendor_or_unknown()).or_default() += 1;
        }
        assert_eq!(per_stratum, [17, 17, 16]);
        assert_eq!(per_vendor.len(), 5);
        // Each stratum gives every vendor three or four items.
        assert!(per_vendor.values().all(|&n| (9..=12).contains(&n)));
    }

    #[test]
    fn test_onboarding_pool_requires_enough_items() {
        let catalog = catalog(49, 3);
        let err = CandidateSampler::new(1, 2)
            .onboarding_pool(&catalog, Category::FountainPens, 50, &mut Pcg32::seed_from_u64(0))
            .unwrap_err();
        assert_eq!(err.required, 50);
        assert_eq!(err.available, 49);

        let err = CandidateSampler::new(1, 2)
            .onboarding_pool(&catalog, Category::Movies, 1, &mut Pcg32::seed_from_u64(0))
            .unwrap_err();
        assert_eq!(err.available, 0);
    }

    #[test]
    fn test_round_candidates_exclude_and_order() {
        let catalog = catalog(80, 4);
        let mut model = PreferenceModel::new(catalog.space().dimension(), ModelParams::default());
        model.observe(&catalog.space().indicator(&[FeatureKey::tag("t1")]), false);
        let excluded = (0..40)
            .map(|i| ItemId::new(format!("item-{i:03}")))
            .collect::<HashSet<_>>();

        let sampler = CandidateSampler::new(1, 2);
        let candidates = sampler
            .round_candidates(
                &model,
                &catalog,
                Category::FountainPens,
                &excluded,
                10,
                &mut Pcg32::seed_from_u64(3),
            )
            .unwrap();

        assert_eq!(candidates.len(), 10);
        assert!(candidates.iter().all(|c| !excluded.contains(&c.item_id)));
        assert_eq!(candidates.iter().filter(|c| c.wildcard).count(), 1);
        for pair in candidates.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].item_id < pair[1].item_id)
            );
        }
        // The strongest likely pick carries tag t1.
        let top = catalog.get(&candidates[0].item_id).unwrap();
        assert_eq!(top.tags, ["t1"]);
    }

    #[test]
    fn test_round_candidates_reproducible() {
        let catalog = catalog(100, 7);
        let model = PreferenceModel::new(catalog.space().dimension(), ModelParams::default());
        let sampler = CandidateSampler::new(2, 2);
        let run = || {
            sampler
                .round_candidates(
                    &model,
                    &catalog,
                    Category::FountainPens,
                    &HashSet::new(),
                    10,
                    &mut Pcg32::seed_from_u64(77),
                )
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_round_candidates_tie_break_by_id() {
        let catalog = catalog(30, 3);
        // Untrained model: every score is the bias, so the id decides.
        let model = PreferenceModel::new(catalog.space().dimension(), ModelParams::default());
        let candidates = CandidateSampler::new(0, 2)
            .round_candidates(
                &model,
                &catalog,
                Category::FountainPens,
                &HashSet::new(),
                5,
                &mut Pcg32::seed_from_u64(0),
            )
            .unwrap();
        let ids = candidates.iter().map(|c| c.item_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["item-000", "item-001", "item-002", "item-003", "item-004"]);
    }

    #[test]
    fn test_round_candidates_small_remainder() {
        let catalog = catalog(12, 2);
        let model = PreferenceModel::new(catalog.space().dimension(), ModelParams::default());
        let excluded = [ItemId::from("item-000"), ItemId::from("item-001")]
            .into_iter()
            .collect::<HashSet<_>>();
        let sampler = CandidateSampler::new(1, 2);
        let mut rng = Pcg32::seed_from_u64(5);
        let candidates = sampler
            .round_candidates(&model, &catalog, Category::FountainPens, &excluded, 10, &mut rng)
            .unwrap();
        assert_eq!(candidates.len(), 10);

        let err = sampler
            .round_candidates(&model, &catalog, Category::FountainPens, &excluded, 11, &mut rng)
            .unwrap_err();
        assert_eq!(err.available, 10);
    }

    #[test]
    fn test_round_candidates_fill_wildcards_past_thin_band() {
        // 21 items, 10 per round: the band beyond rank 20 holds one item
        // but two wildcard slots need filling.
        let catalog = catalog(21, 3);
        let model = PreferenceModel::new(catalog.space().dimension(), ModelParams::default());
        let candidates = CandidateSampler::new(2, 2)
            .round_candidates(
                &model,
                &catalog,
                Category::FountainPens,
                &HashSet::new(),
                10,
                &mut Pcg32::seed_from_u64(4),
            )
            .unwrap();
        assert_eq!(candidates.len(), 10);
        assert_eq!(candidates.iter().filter(|c| c.wildcard).count(), 2);
        assert_eq!(
            candidates.iter().map(|c| &c.item_id).collect::<HashSet<_>>().len(),
            10
        );
        // The lone item of the band is always drawn.
        assert!(candidates.iter().any(|c| c.item_id.as_str() == "item-020"));
    }
}
