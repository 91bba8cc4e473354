use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One realized-return observation for a recommended instrument.
/// Unique per `(candidate_id, track_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub candidate_id: Uuid,
    pub track_date: NaiveDate,
    /// Trading days between the report date and `track_date`.
    pub days_held: i32,
    pub current_price: f64,
    pub return_pct: f64,
    pub is_trading_day: bool,
}

/// Stored metadata of a recommended instrument, as the aggregator and tracker see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMeta {
    pub candidate_id: Uuid,
    pub report_date: NaiveDate,
    pub sector: String,
    pub code: String,
    pub name: String,
    pub role: Option<String>,
    pub score: i32,
    pub volume_level: String,
    pub strength: String,
    pub is_weak_to_strong: bool,
    pub is_leading_mover: bool,
    pub recommend_price: f64,
    pub change_pct: f64,
    pub open_change: f64,
    pub is_buyable: bool,
    pub unbuyable_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub days_held: i32,
    pub return_pct: f64,
}

/// A candidate left-joined with at most one observation. A candidate with several
/// observations appears once per observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    #[serde(flatten)]
    pub candidate: CandidateMeta,
    pub observation: Option<Observation>,
}
