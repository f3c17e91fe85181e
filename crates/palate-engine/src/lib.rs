//! Round orchestration for the Palate preference duel.
//!
//! A human and the agent compete to predict the human's next pick. The
//! [`RoundEngine`] drives each [`Session`] through a fixed lifecycle:
//!
//! ```text
//! start ──▶ Onboarding ──submit_onboarding──▶ Playing ──(start_round, submit_pick) × N──▶ Complete
//! ```
//!
//! - [`catalog`] - [`Catalog`]: a shared, vectorized catalog snapshot
//! - [`sampler`] - [`CandidateSampler`]: onboarding pools and per-round
//!   candidate sets with wildcard injection
//! - [`hidden`] - [`HiddenPreferenceDetector`]: taste the model learned but the
//!   player never deliberately acted on
//! - [`session`] / [`record`] - persisted session state and immutable round
//!   records
//! - [`profile`] - per-category tuning ([`CategoryProfile`], [`GameConfig`])
//! - [`seed`] - [`SessionSeed`] for reproducible randomness
//! - [`store`] - collaborator interfaces for catalog snapshots and session
//!   persistence
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use palate_engine::{Catalog, GameConfig, RoundEngine, SessionSeed};
//! use palate_model::{CatalogItem, Category};
//!
//! let items = (0..80)
//!     .map(|i| {
//!         CatalogItem::new(format!("pen-{i:02}"), Category::FountainPens)
//!             .with_vendor(format!("vendor-{}", i % 7))
//!             .with_tags([format!("tag-{}", i % 5)])
//!             .with_price(10.0 + i as f32, 12.0 + i as f32)
//!     })
//!     .collect();
//! let catalog = Arc::new(Catalog::new(items));
//! let mut config = GameConfig::for_category(Category::FountainPens);
//! config.profile.total_rounds = 1;
//! let engine = RoundEngine::new(catalog, config).unwrap();
//!
//! let mut session = engine.start("game-1", "Ada", SessionSeed::from_u128(7)).unwrap();
//! let picks: Vec<_> = session.onboarding_pool()[..10].to_vec();
//! engine.submit_onboarding(&mut session, &picks, 4).unwrap();
//!
//! let round = engine.start_round(&mut session).unwrap();
//! let outcome = engine
//!     .submit_pick(&mut session, round.round_number, &round.candidates[0])
//!     .unwrap();
//! assert!(outcome.game_complete);
//! assert_eq!(session.human_score() + session.agent_score(), 10);
//!
//! let summary = engine.summarize(&session).unwrap();
//! assert_eq!(summary.rounds.len(), 1);
//! ```

use palate_model::{Category, ItemId};

pub use self::{
    catalog::*, hidden::*, profile::*, record::*, round_engine::*, sampler::*, seed::*,
    session::*, store::*,
};

pub mod catalog;
pub mod hidden;
pub mod profile;
pub mod record;
pub mod round_engine;
pub mod sampler;
pub mod seed;
pub mod session;
pub mod store;

/// The catalog cannot supply as many eligible items as requested.
///
/// Recoverable by choosing another category or a smaller request.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("category {category} has {available} eligible items, {required} required")]
pub struct InsufficientCatalogError {
    pub category: Category,
    pub required: usize,
    pub available: usize,
}

/// A game configuration whose numbers cannot produce a playable session.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid game configuration: {reason}")]
pub struct InvalidConfigError {
    #[error(not(source))]
    pub reason: &'static str,
}

/// Rejection of an engine call. The session is left exactly as it was.
#[derive(
    Debug,
    Clone,
    PartialEq,
    derive_more::Display,
    derive_more::Error,
    derive_more::From,
    derive_more::IsVariant,
)]
pub enum GameError {
    #[display("{_0}")]
    #[from]
    InsufficientCatalog(InsufficientCatalogError),
    #[display(
        "expected exactly {expected} distinct selections from the onboarding pool, \
         got {valid} valid out of {submitted}"
    )]
    InvalidSelectionCount {
        expected: usize,
        valid: usize,
        submitted: usize,
    },
    #[display("item {item_id} is not a candidate of round {round_number}")]
    InvalidCandidate { round_number: usize, item_id: ItemId },
    #[display("rating {rating} is outside 1..=5")]
    InvalidRating { rating: u8 },
    #[display("round {submitted} is stale; the current round is {current}")]
    StaleRound { submitted: usize, current: usize },
    #[display("cannot {action} while {status}: {reason}")]
    RoundSequence {
        action: &'static str,
        status: SessionStatus,
        reason: &'static str,
    },
}

impl GameError {
    fn sequence(action: &'static str, status: SessionStatus, reason: &'static str) -> Self {
        Self::RoundSequence {
            action,
            status,
            reason,
        }
    }
}
