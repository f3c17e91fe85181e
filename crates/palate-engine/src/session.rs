use std::collections::HashSet;

use arrayvec::ArrayVec;
use chrono::{DateTime, Utc};
use palate_model::{Category, ItemId, PreferenceModel};
use serde::{Deserialize, Serialize};

use crate::{AGENT_TOP_K, RoundMetrics, RoundRecord, ScoredCandidate, SessionSeed};

#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Lifecycle of a session. Transitions only move forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[display("onboarding")]
    Onboarding,
    #[display("playing")]
    Playing,
    #[display("complete")]
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum SelectionSource {
    Onboarding,
    Round(usize),
}

/// One pick that was fed to the preference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub item_id: ItemId,
    pub is_exception: bool,
    pub source: SelectionSource,
}

/// A rating of everything picked so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRating {
    pub rating: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Number of selections the rating covers.
    pub selections: usize,
}

/// A started round waiting for the human's pick.
///
/// The agent's prediction is frozen here when the round starts so that the
/// human's pick cannot influence it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRound {
    pub round_number: usize,
    pub candidates: Vec<ScoredCandidate>,
    /// Order in which the candidates are shown to the player.
    pub presentation: Vec<ItemId>,
    pub agent_pick: ItemId,
    pub agent_confidence: f32,
    pub agent_top: ArrayVec<ItemId, AGENT_TOP_K>,
    pub pre_metrics: RoundMetrics,
    pub started_at: DateTime<Utc>,
}

impl OpenRound {
    #[must_use]
    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.candidates.iter().any(|c| &c.item_id == item_id)
    }
}

/// Everything a hosting layer needs to persist for one duel.
///
/// Sessions are mutated only through [`crate::RoundEngine`]; the fields are
/// read through the accessors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) player_name: String,
    pub(crate) category: Category,
    pub(crate) seed: SessionSeed,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) model: PreferenceModel,
    pub(crate) onboarding_pool: Vec<ItemId>,
    pub(crate) selections: Vec<SelectionRecord>,
    pub(crate) prefix_ratings: Vec<PrefixRating>,
    pub(crate) round_index: usize,
    pub(crate) total_rounds: usize,
    pub(crate) open_round: Option<OpenRound>,
    pub(crate) rounds: Vec<RoundRecord>,
    pub(crate) human_score: u32,
    pub(crate) agent_score: u32,
    pub(crate) status: SessionStatus,
}

/// Final figures of a session for leaderboard aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScores {
    pub session_id: SessionId,
    pub player_name: String,
    pub category: Category,
    pub human_score: u32,
    pub agent_score: u32,
    pub rounds_played: usize,
    pub complete: bool,
}

impl Session {
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn seed(&self) -> SessionSeed {
        self.seed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn model(&self) -> &PreferenceModel {
        &self.model
    }

    #[must_use]
    pub fn onboarding_pool(&self) -> &[ItemId] {
        &self.onboarding_pool
    }

    #[must_use]
    pub fn selections(&self) -> &[SelectionRecord] {
        &self.selections
    }

    #[must_use]
    pub fn prefix_ratings(&self) -> &[PrefixRating] {
        &self.prefix_ratings
    }

    /// Number of resolved rounds.
    #[must_use]
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    #[must_use]
    pub fn total_rounds(&self) -> usize {
        self.total_rounds
    }

    #[must_use]
    pub fn open_round(&self) -> Option<&OpenRound> {
        self.open_round.as_ref()
    }

    #[must_use]
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    #[must_use]
    pub fn human_score(&self) -> u32 {
        self.human_score
    }

    #[must_use]
    pub fn agent_score(&self) -> u32 {
        self.agent_score
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn final_scores(&self) -> FinalScores {
        FinalScores {
            session_id: self.id.clone(),
            player_name: self.player_name.clone(),
            category: self.category,
            human_score: self.human_score,
            agent_score: self.agent_score,
            rounds_played: self.rounds.len(),
            complete: self.status.is_complete(),
        }
    }

    /// Items the next round should not offer: every selection and the
    /// previous round's candidates.
    pub(crate) fn round_exclusions(&self) -> HashSet<ItemId> {
        let mut excluded = self.picked_items();
        if let Some(previous) = self.rounds.last() {
            excluded.extend(previous.candidates.iter().map(|c| c.item_id.clone()));
        }
        excluded
    }

    /// Items the player has selected, which no round may offer again.
    pub(crate) fn picked_items(&self) -> HashSet<ItemId> {
        self.selections.iter().map(|s| s.item_id.clone()).collect()
    }

    /// Every item the player has been shown or has selected.
    #[must_use]
    pub fn seen_items(&self) -> HashSet<&ItemId> {
        let round_candidates = self
            .rounds
            .iter()
            .flat_map(|r| &r.candidates)
            .chain(self.open_round.iter().flat_map(|r| &r.candidates))
            .map(|c| &c.item_id);
        self.onboarding_pool
            .iter()
            .chain(self.selections.iter().map(|s| &s.item_id))
            .chain(round_candidates)
            .collect()
    }
}
