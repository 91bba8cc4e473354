use crate::domain::LIMIT_UP_PCT;
use crate::scoring::composite::ScoreDetail;
use serde::{Deserialize, Serialize};

/// Display strings for the candidate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDisplay {
    pub price: String,
    pub change_pct: String,
    pub volume: String,
    pub traded_value: String,
    pub market_cap: String,
    pub amplitude: String,
    pub turnover_rate: String,
}

/// A scored instrument within one sector's ranked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub amplitude: f64,
    pub traded_value: f64,
    pub market_cap: f64,
    #[serde(flatten)]
    pub detail: ScoreDetail,
    pub signal: String,
    pub rationale: String,
    /// At most one per ranked list: the highest-ranked limit-up instrument.
    pub is_first_limit_up: bool,
    pub display: CandidateDisplay,
}

impl CandidateRecord {
    pub fn score(&self) -> i32 {
        self.detail.score
    }

    pub fn is_limit_up(&self) -> bool {
        self.detail.position.is_limit_up
    }

    pub fn open_change(&self) -> f64 {
        self.detail.strength.open_change
    }

    pub fn unbuyable_reason(&self) -> Option<UnbuyableReason> {
        UnbuyableReason::classify(self.open_change(), self.change_pct)
    }
}

/// An instrument that could not be scored (suspended, no quote).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnavailableInstrument {
    pub code: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankedEntry {
    Candidate(Box<CandidateRecord>),
    Unavailable(UnavailableInstrument),
}

impl RankedEntry {
    pub fn as_candidate(&self) -> Option<&CandidateRecord> {
        match self {
            RankedEntry::Candidate(c) => Some(c.as_ref()),
            RankedEntry::Unavailable(_) => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            RankedEntry::Candidate(c) => &c.code,
            RankedEntry::Unavailable(u) => &u.code,
        }
    }
}

/// Why a recommendation could not realistically have been bought during the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnbuyableReason {
    LockedFromOpen,
    LimitUpAtOpen,
    MorningLock,
}

impl UnbuyableReason {
    /// `None` means buyable.
    pub fn classify(open_change: f64, change_pct: f64) -> Option<Self> {
        let closed_limit_up = change_pct >= LIMIT_UP_PCT;
        if open_change >= 9.5 {
            Some(UnbuyableReason::LockedFromOpen)
        } else if open_change >= 7.0 && closed_limit_up {
            Some(UnbuyableReason::LimitUpAtOpen)
        } else if open_change >= 5.0 && closed_limit_up {
            Some(UnbuyableReason::MorningLock)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnbuyableReason::LockedFromOpen => "locked from open",
            UnbuyableReason::LimitUpAtOpen => "limit-up at open",
            UnbuyableReason::MorningLock => "morning lock",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buyability_precedence() {
        assert_eq!(
            UnbuyableReason::classify(9.6, 3.0),
            Some(UnbuyableReason::LockedFromOpen)
        );
        assert_eq!(
            UnbuyableReason::classify(8.0, 10.0),
            Some(UnbuyableReason::LimitUpAtOpen)
        );
        assert_eq!(
            UnbuyableReason::classify(5.5, 9.95),
            Some(UnbuyableReason::MorningLock)
        );
        assert_eq!(UnbuyableReason::classify(8.0, 9.0), None);
        assert_eq!(UnbuyableReason::classify(4.9, 10.0), None);
    }
}
