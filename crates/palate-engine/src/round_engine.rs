//! The duel state machine.

use std::{collections::HashSet, sync::Arc};

use arrayvec::ArrayVec;
use chrono::Utc;
use palate_model::{CatalogItem, FeatureKey, FeatureVector, ItemId, PreferenceModel};
use rand::seq::SliceRandom as _;
use serde::{Deserialize, Serialize};

use crate::{
    AGENT_TOP_K, CandidateSampler, Catalog, GameConfig, GameError, HiddenPreferenceDetector,
    HiddenPreferenceResult, InsufficientCatalogError, InvalidConfigError, OpenRound, POINTS_PER_ROUND, PrefixRating,
    RngStream, RoundMetrics, RoundRecord, ScoredCandidate, SelectionRecord, SelectionSource,
    Session, SessionId, SessionSeed, SessionStatus,
};

/// Number of learned features listed in a summary.
const SUMMARY_FEATURES: usize = 5;

/// A freshly started round as presented to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStart {
    pub round_number: usize,
    /// Candidates in presentation order.
    pub candidates: Vec<ItemId>,
    pub pre_metrics: RoundMetrics,
}

/// Result of a resolved round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub record: RoundRecord,
    pub human_score: u32,
    pub agent_score: u32,
    pub game_complete: bool,
}

/// Polling snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub round_index: usize,
    pub total_rounds: usize,
    /// Number of the round awaiting a pick, if any.
    pub open_round: Option<usize>,
    pub human_score: u32,
    pub agent_score: u32,
    pub onboarding_required: usize,
    pub onboarding_pool_size: usize,
    pub selections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Human,
    Agent,
    Draw,
}

/// A learned feature with its display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub key: FeatureKey,
    pub label: String,
    pub weight: f32,
}

/// Final report of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub session_id: SessionId,
    pub player_name: String,
    pub human_score: u32,
    pub agent_score: u32,
    pub winner: Winner,
    pub rounds: Vec<RoundRecord>,
    pub agent_accuracy: f32,
    pub near_misses: usize,
    pub top_features: Vec<FeatureWeight>,
    pub hidden: HiddenPreferenceResult,
    /// Best-scoring items the player has not seen.
    pub recommendations: Vec<ScoredCandidate>,
}

/// Drives sessions through onboarding, the rounds and the summary.
///
/// The engine is stateless between calls apart from its shared catalog and
/// configuration; all per-player state lives in the caller-owned
/// [`Session`]. Every method validates before it mutates, so a rejected call
/// leaves the session untouched.
#[derive(Debug, Clone)]
pub struct RoundEngine {
    catalog: Arc<Catalog>,
    config: GameConfig,
    sampler: CandidateSampler,
    detector: HiddenPreferenceDetector,
}

impl RoundEngine {
    pub fn new(catalog: Arc<Catalog>, config: GameConfig) -> Result<Self, InvalidConfigError> {
        config.profile.validate()?;
        Ok(Self {
            sampler: CandidateSampler::from_profile(&config.profile),
            detector: HiddenPreferenceDetector::new(config.profile.hidden),
            catalog,
            config,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Opens a session and draws its onboarding pool.
    pub fn start(
        &self,
        session_id: impl Into<SessionId>,
        player_name: impl Into<String>,
        seed: SessionSeed,
    ) -> Result<Session, GameError> {
        let profile = &self.config.profile;
        // The last round still needs a full candidate set once every earlier
        // pick is excluded.
        let required = profile.pool_size.max(
            profile.onboarding_picks + profile.total_rounds - 1 + profile.candidates_per_round,
        );
        let available = self.catalog.in_category(profile.category).count();
        if available < required {
            return Err(InsufficientCatalogError {
                category: profile.category,
                required,
                available,
            }
            .into());
        }
        let onboarding_pool = self.sampler.onboarding_pool(
            &self.catalog,
            profile.category,
            profile.pool_size,
            &mut seed.rng(0, RngStream::OnboardingPool),
        )?;
        let session = Session {
            id: session_id.into(),
            player_name: player_name.into(),
            category: profile.category,
            seed,
            created_at: Utc::now(),
            model: PreferenceModel::new(self.catalog.space().dimension(), self.config.model),
            onboarding_pool,
            selections: Vec::new(),
            prefix_ratings: Vec::new(),
            round_index: 0,
            total_rounds: profile.total_rounds,
            open_round: None,
            rounds: Vec::new(),
            human_score: 0,
            agent_score: 0,
            status: SessionStatus::Onboarding,
        };
        tracing::info!(
            session_id = %session.id,
            player = %session.player_name,
            category = %session.category,
            %seed,
            "session started"
        );
        Ok(session)
    }

    /// The session's onboarding pool as catalog items.
    #[must_use]
    pub fn onboarding_items<'a>(&'a self, session: &Session) -> Vec<&'a CatalogItem> {
        session
            .onboarding_pool
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .collect()
    }

    /// Accepts the onboarding picks and the rating of the whole set.
    ///
    /// Exactly `onboarding_picks` distinct items of the issued pool must be
    /// submitted. Each becomes a normal selection; the rating then adjusts
    /// the bias against the model's own prediction.
    pub fn submit_onboarding(
        &self,
        session: &mut Session,
        selected: &[ItemId],
        rating: u8,
    ) -> Result<(), GameError> {
        if !session.status.is_onboarding() {
            return Err(GameError::sequence(
                "submit onboarding",
                session.status,
                "onboarding was already submitted",
            ));
        }
        check_rating(rating)?;

        let expected = self.config.profile.onboarding_picks;
        let mut vectors = Vec::with_capacity(selected.len());
        for (i, id) in selected.iter().enumerate() {
            if selected[..i].contains(id) || !session.onboarding_pool.contains(id) {
                continue;
            }
            if let Some(vector) = self.catalog.vector(id) {
                vectors.push((id, vector));
            }
        }
        if selected.len() != expected || vectors.len() != expected {
            return Err(GameError::InvalidSelectionCount {
                expected,
                valid: vectors.len(),
                submitted: selected.len(),
            });
        }

        for (id, vector) in vectors {
            observe(session, id, vector, false, SelectionSource::Onboarding);
        }
        rate(session, rating, Vec::new());
        session.status = SessionStatus::Playing;
        session.round_index = 0;

        tracing::info!(
            session_id = %session.id,
            selections = session.selections.len(),
            rating,
            bias = session.model.state().bias(),
            "onboarding accepted"
        );
        Ok(())
    }

    /// Opens the next round.
    ///
    /// The agent's pick and shortlist are frozen here, before the human sees
    /// the candidates.
    pub fn start_round(&self, session: &mut Session) -> Result<RoundStart, GameError> {
        const ACTION: &str = "start a round";
        match session.status {
            SessionStatus::Onboarding => {
                return Err(GameError::sequence(
                    ACTION,
                    session.status,
                    "onboarding has not been submitted",
                ));
            }
            SessionStatus::Complete => {
                return Err(GameError::sequence(
                    ACTION,
                    session.status,
                    "every round has been played",
                ));
            }
            SessionStatus::Playing => {}
        }
        if session.open_round.is_some() {
            return Err(GameError::sequence(
                ACTION,
                session.status,
                "the open round has not been resolved",
            ));
        }
        if session.round_index >= session.total_rounds {
            return Err(GameError::sequence(
                ACTION,
                session.status,
                "every round has been played",
            ));
        }

        let round_number = session.round_index + 1;
        let profile = &self.config.profile;
        let draw = |excluded: &HashSet<ItemId>| {
            self.sampler.round_candidates(
                &session.model,
                &self.catalog,
                session.category,
                excluded,
                profile.candidates_per_round,
                &mut session.seed.rng(round_number, RngStream::Wildcards),
            )
        };
        let candidates = match draw(&session.round_exclusions()) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::debug!(
                    session_id = %session.id,
                    round = round_number,
                    available = err.available,
                    "too few fresh items, allowing the previous round's candidates"
                );
                draw(&session.picked_items())?
            }
        };

        let mut presentation = candidates
            .iter()
            .map(|c| c.item_id.clone())
            .collect::<Vec<_>>();
        presentation.shuffle(&mut session.seed.rng(round_number, RngStream::Presentation));
        let agent_top = candidates
            .iter()
            .take(AGENT_TOP_K)
            .map(|c| c.item_id.clone())
            .collect::<ArrayVec<_, AGENT_TOP_K>>();
        // `round_candidates` returns at least one candidate and sorts it first.
        let (agent_pick, agent_confidence) = (candidates[0].item_id.clone(), candidates[0].score);
        let pre_metrics = self.metrics(session);

        tracing::debug!(
            session_id = %session.id,
            round = round_number,
            agent_pick = %agent_pick,
            agent_confidence,
            "round started"
        );
        session.open_round = Some(OpenRound {
            round_number,
            candidates,
            presentation: presentation.clone(),
            agent_pick,
            agent_confidence,
            agent_top,
            pre_metrics,
            started_at: Utc::now(),
        });
        Ok(RoundStart {
            round_number,
            candidates: presentation,
            pre_metrics,
        })
    }

    /// Resolves the open round with the human's pick.
    pub fn submit_pick(
        &self,
        session: &mut Session,
        round_number: usize,
        item_id: &ItemId,
    ) -> Result<RoundOutcome, GameError> {
        self.resolve(session, round_number, item_id, false)
    }

    /// Like [`Self::submit_pick`], but the pick is flagged as an exception to
    /// the player's usual taste and moves the model less.
    pub fn submit_exception_pick(
        &self,
        session: &mut Session,
        round_number: usize,
        item_id: &ItemId,
    ) -> Result<RoundOutcome, GameError> {
        self.resolve(session, round_number, item_id, true)
    }

    fn resolve(
        &self,
        session: &mut Session,
        round_number: usize,
        item_id: &ItemId,
        is_exception: bool,
    ) -> Result<RoundOutcome, GameError> {
        const ACTION: &str = "submit a pick";
        if !session.status.is_playing() {
            let reason = if session.status.is_complete() {
                "every round has been played"
            } else {
                "onboarding has not been submitted"
            };
            return Err(GameError::sequence(ACTION, session.status, reason));
        }
        let Some(open) = &session.open_round else {
            let current = session.round_index + 1;
            if round_number != current {
                return Err(GameError::StaleRound {
                    submitted: round_number,
                    current,
                });
            }
            return Err(GameError::sequence(
                ACTION,
                session.status,
                "no round has been started",
            ));
        };
        if round_number != open.round_number {
            return Err(GameError::StaleRound {
                submitted: round_number,
                current: open.round_number,
            });
        }
        let vector = open
            .contains(item_id)
            .then(|| self.catalog.vector(item_id))
            .flatten()
            .ok_or_else(|| GameError::InvalidCandidate {
                round_number,
                item_id: item_id.clone(),
            })?;

        let open = session.open_round.take().ok_or_else(|| {
            GameError::sequence(ACTION, session.status, "no round has been started")
        })?;
        let ai_correct = &open.agent_pick == item_id;
        let near_miss = !ai_correct && open.agent_top.contains(item_id);
        let (human_points, agent_points) = if ai_correct {
            (0, POINTS_PER_ROUND)
        } else {
            (POINTS_PER_ROUND, 0)
        };

        observe(
            session,
            item_id,
            vector,
            is_exception,
            SelectionSource::Round(round_number),
        );
        session.human_score += human_points;
        session.agent_score += agent_points;

        let record = RoundRecord {
            round_number,
            candidates: open.candidates,
            human_pick: item_id.clone(),
            is_exception,
            agent_pick: open.agent_pick,
            agent_confidence: open.agent_confidence,
            agent_top: open.agent_top,
            ai_correct,
            near_miss,
            human_points,
            agent_points,
            pre_metrics: open.pre_metrics,
            post_metrics: self.metrics(session),
            started_at: open.started_at,
            resolved_at: Utc::now(),
        };
        session.rounds.push(record.clone());
        session.round_index += 1;
        let game_complete = session.round_index >= session.total_rounds;

        tracing::info!(
            session_id = %session.id,
            round = round_number,
            ai_correct,
            near_miss,
            human_score = session.human_score,
            agent_score = session.agent_score,
            "round resolved"
        );
        if game_complete {
            session.status = SessionStatus::Complete;
            tracing::info!(
                session_id = %session.id,
                human_score = session.human_score,
                agent_score = session.agent_score,
                "session complete"
            );
        }

        Ok(RoundOutcome {
            record,
            human_score: session.human_score,
            agent_score: session.agent_score,
            game_complete,
        })
    }

    /// Records a rating of the selections so far, between rounds.
    ///
    /// Returns the model's predicted rating after the adjustment.
    pub fn rate_prefix(
        &self,
        session: &mut Session,
        rating: u8,
        tags: Vec<String>,
    ) -> Result<f32, GameError> {
        const ACTION: &str = "rate the selections";
        if !session.status.is_playing() {
            return Err(GameError::sequence(
                ACTION,
                session.status,
                "ratings are taken between rounds",
            ));
        }
        if session.open_round.is_some() {
            return Err(GameError::sequence(
                ACTION,
                session.status,
                "the open round has not been resolved",
            ));
        }
        check_rating(rating)?;
        rate(session, rating, tags);
        Ok(session.model.predict_prefix_rating())
    }

    #[must_use]
    pub fn status(&self, session: &Session) -> GameStatus {
        GameStatus {
            session_id: session.id.clone(),
            status: session.status,
            round_index: session.round_index,
            total_rounds: session.total_rounds,
            open_round: session.open_round.as_ref().map(|r| r.round_number),
            human_score: session.human_score,
            agent_score: session.agent_score,
            onboarding_required: self.config.profile.onboarding_picks,
            onboarding_pool_size: session.onboarding_pool.len(),
            selections: session.selections.len(),
        }
    }

    /// Final report; only available once every round has been played.
    pub fn summarize(&self, session: &Session) -> Result<GameSummary, GameError> {
        if !session.status.is_complete() {
            return Err(GameError::sequence(
                "summarize",
                session.status,
                "the game is not over",
            ));
        }

        let winner = match session.human_score.cmp(&session.agent_score) {
            std::cmp::Ordering::Greater => Winner::Human,
            std::cmp::Ordering::Less => Winner::Agent,
            std::cmp::Ordering::Equal => Winner::Draw,
        };
        let correct = session.rounds.iter().filter(|r| r.ai_correct).count();
        #[expect(clippy::cast_precision_loss)]
        let agent_accuracy = if session.rounds.is_empty() {
            0.0
        } else {
            correct as f32 / session.rounds.len() as f32
        };

        let copy = self.config.profile.copy();
        let space = self.catalog.space();
        let mut labels = HashSet::new();
        let top_features = session
            .model
            .top_features(space, space.dimension())
            .into_iter()
            .filter_map(|(key, weight)| {
                let label = copy.feature_label(&key)?;
                labels.insert(label.clone()).then_some(FeatureWeight { key, label, weight })
            })
            .take(SUMMARY_FEATURES)
            .collect();

        Ok(GameSummary {
            session_id: session.id.clone(),
            player_name: session.player_name.clone(),
            human_score: session.human_score,
            agent_score: session.agent_score,
            winner,
            rounds: session.rounds.clone(),
            agent_accuracy,
            near_misses: session.rounds.iter().filter(|r| r.near_miss).count(),
            top_features,
            hidden: self.detector.detect(session, &self.catalog),
            recommendations: self.recommendations(session),
        })
    }

    /// Hidden-preference analysis of the session in its current state.
    #[must_use]
    pub fn hidden_preferences(&self, session: &Session) -> HiddenPreferenceResult {
        self.detector.detect(session, &self.catalog)
    }

    fn recommendations(&self, session: &Session) -> Vec<ScoredCandidate> {
        let seen = session.seen_items();
        let mut ranked = self
            .catalog
            .in_category(session.category)
            .map(|pos| self.catalog.item_at(pos))
            .filter(|item| !seen.contains(&item.id))
            .filter_map(|item| {
                let score = session.model.score(self.catalog.vector(&item.id)?);
                Some(ScoredCandidate {
                    item_id: item.id.clone(),
                    score,
                    wildcard: false,
                })
            })
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        ranked.truncate(self.config.profile.top_recommendations);
        ranked
    }

    fn metrics(&self, session: &Session) -> RoundMetrics {
        let vectors = session
            .selections
            .iter()
            .filter_map(|s| self.catalog.vector(&s.item_id))
            .cloned()
            .collect::<Vec<_>>();
        RoundMetrics {
            coherence: PreferenceModel::coherence(&vectors),
            predicted_rating: session.model.predict_prefix_rating(),
        }
    }
}

fn check_rating(rating: u8) -> Result<(), GameError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(GameError::InvalidRating { rating })
    }
}

fn observe(
    session: &mut Session,
    item_id: &ItemId,
    vector: &FeatureVector,
    is_exception: bool,
    source: SelectionSource,
) {
    session.model.observe(vector, is_exception);
    session.selections.push(SelectionRecord {
        item_id: item_id.clone(),
        is_exception,
        source,
    });
}

fn rate(session: &mut Session, rating: u8, tags: Vec<String>) {
    let baseline = session.model.predict_prefix_rating();
    session.model.apply_prefix_rating(rating, baseline);
    session.prefix_ratings.push(PrefixRating {
        rating,
        tags,
        selections: session.selections.len(),
    });
    tracing::debug!(
        session_id = %session.id,
        rating,
        baseline,
        bias = session.model.state().bias(),
        "prefix rating applied"
    );
}
