//! Per-instrument scoring: classifiers, the composite score, narration and ranking.

pub mod composite;
pub mod format;
pub mod narrator;
pub mod position;
pub mod ranker;
pub mod rules;
pub mod strength;
pub mod volume_price;

pub use composite::{CompositeScorer, ScoreDetail};
pub use ranker::CandidateRanker;
pub use strength::MarketContext;
