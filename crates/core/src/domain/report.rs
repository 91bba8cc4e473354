use crate::domain::candidate::{CandidateRecord, RankedEntry};
use crate::domain::market::{InstrumentSnapshot, SectorHistory, SectorSnapshot};
use crate::scoring::{CandidateRanker, MarketContext};
use crate::sector::{self, SectorAssessment};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sector's slice of a daily report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorReport {
    pub sector: SectorSnapshot,
    pub assessment: SectorAssessment,
    pub history: SectorHistory,
    /// Full ranked list, unavailable instruments last.
    pub ranked: Vec<RankedEntry>,
}

impl SectorReport {
    /// Assesses the sector and ranks its instruments against `market_change`.
    pub fn build(
        ranker: &CandidateRanker,
        sector: SectorSnapshot,
        instruments: &[InstrumentSnapshot],
        history: SectorHistory,
        market_change: f64,
    ) -> Self {
        let ctx = MarketContext {
            market_change,
            sector_change: sector.change_pct,
        };
        Self {
            assessment: sector::assess(&sector, instruments, &history),
            ranked: ranker.rank(instruments, ctx),
            sector,
            history,
        }
    }

    /// The top `n` scored candidates; these are what gets recommended and tracked.
    pub fn top_candidates(&self, n: usize) -> Vec<&CandidateRecord> {
        self.ranked
            .iter()
            .filter_map(RankedEntry::as_candidate)
            .take(n)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub market_change: f64,
    pub sectors: Vec<SectorReport>,
}

/// A recommendation as stored, with the buyability verdict applied at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCandidate {
    pub candidate_id: Uuid,
    pub rank: i32,
    pub role: Option<String>,
    pub is_buyable: bool,
    pub unbuyable_reason: Option<String>,
    pub record: CandidateRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSector {
    pub code: String,
    pub name: String,
    pub change_pct: f64,
    pub up_count: i32,
    pub down_count: i32,
    pub assessment: SectorAssessment,
    pub history: SectorHistory,
    pub candidates: Vec<StoredCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub report_id: Uuid,
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub market_change: f64,
    pub sectors: Vec<StoredSector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub report_id: Uuid,
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub market_change: f64,
    pub sectors_count: i32,
    pub candidates_count: i32,
}
