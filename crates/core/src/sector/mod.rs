pub mod emotion;
pub mod filter;
pub mod quality;

use crate::domain::market::{InstrumentSnapshot, SectorHistory, SectorSnapshot};
use serde::{Deserialize, Serialize};

/// Emotion and quality read for one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAssessment {
    pub emotion: emotion::SectorEmotion,
    pub quality: quality::SectorQuality,
}

pub fn assess(
    sector: &SectorSnapshot,
    instruments: &[InstrumentSnapshot],
    history: &SectorHistory,
) -> SectorAssessment {
    SectorAssessment {
        emotion: emotion::classify(sector, instruments),
        quality: quality::evaluate(sector, instruments, history),
    }
}
