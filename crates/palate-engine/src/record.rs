use arrayvec::ArrayVec;
use chrono::{DateTime, Utc};
use palate_model::ItemId;
use serde::{Deserialize, Serialize};

use crate::ScoredCandidate;

/// Points awarded to the winner of a round.
pub const POINTS_PER_ROUND: u32 = 10;

/// Size of the agent's frozen shortlist.
pub const AGENT_TOP_K: usize = 3;

/// Snapshot of the model shown around each round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundMetrics {
    /// Mean pairwise similarity of every selection so far.
    pub coherence: f32,
    /// Prefix rating the model expects for the selections so far.
    pub predicted_rating: f32,
}

/// A resolved round. Records are appended once and never revised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: usize,
    /// Candidates in score order, as ranked when the round started.
    pub candidates: Vec<ScoredCandidate>,
    pub human_pick: ItemId,
    pub is_exception: bool,
    pub agent_pick: ItemId,
    pub agent_confidence: f32,
    pub agent_top: ArrayVec<ItemId, AGENT_TOP_K>,
    pub ai_correct: bool,
    /// The human picked one of the agent's runners-up.
    pub near_miss: bool,
    pub human_points: u32,
    pub agent_points: u32,
    pub pre_metrics: RoundMetrics,
    pub post_metrics: RoundMetrics,
    pub started_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}
