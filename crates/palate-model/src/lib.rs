//! Taste representation for the Palate preference duel.
//!
//! This crate holds the numeric side of the game:
//!
//! - [`catalog`] - [`CatalogItem`], [`ItemId`] and the closed [`Category`] set
//! - [`feature_space`] - [`FeatureSpace`] turns items into fixed-layout
//!   [`FeatureVector`]s (multi-hot categorical slots plus z-scored prices)
//! - [`preference`] - [`PreferenceModel`] keeps one player's decayed
//!   preference vector and rating bias, and scores candidates against it
//!
//! # Architecture
//!
//! ```text
//! catalog snapshot ──build──▶ FeatureSpace (shared, immutable)
//!                                   │ vectorize
//!                                   ▼
//!        picks / ratings ──▶ PreferenceModel (one per session) ──▶ scores, coherence
//! ```
//!
//! Everything here is pure, synchronous computation. Vectors from different
//! feature spaces must never be mixed; doing so is a programmer error and
//! panics.
//!
//! Session orchestration, candidate sampling and hidden-preference detection
//! live in `palate-engine`.

pub use self::{catalog::*, feature_space::*, preference::*};

pub mod catalog;
pub mod feature_space;
pub mod preference;
