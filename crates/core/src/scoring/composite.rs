use crate::config::ScoringConfig;
use crate::domain::market::InstrumentSnapshot;
use crate::error::EngineError;
use crate::scoring::position::{self, IntradayPosition, PositionAnalysis};
use crate::scoring::strength::{self, LeaderTag, MarketContext, StrengthAnalysis, StrengthTier};
use crate::scoring::volume_price::{self, VolumePriceAnalysis, VolumePriceSignal};
use serde::{Deserialize, Serialize};

const BASE_SCORE: i32 = 40;

/// Everything the composite score was built from. Created once per refresh, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub volume_price: VolumePriceAnalysis,
    pub position: PositionAnalysis,
    pub strength: StrengthAnalysis,
    /// Clamped to `0..=100`.
    pub score: i32,
    pub is_weak_to_strong: bool,
    pub is_leading_mover: bool,
    pub leading_mover_tags: Vec<LeaderTag>,
}

#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    config: ScoringConfig,
}

impl CompositeScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        snapshot: &InstrumentSnapshot,
        ctx: MarketContext,
    ) -> Result<ScoreDetail, EngineError> {
        if snapshot.valid_price().is_none() {
            return Err(EngineError::MissingData { field: "price" });
        }

        let volume_price = volume_price::classify(snapshot);
        let strength = strength::classify(snapshot, ctx);
        let position = position::classify(snapshot);

        let mut score = BASE_SCORE;
        score += volume_price_points(volume_price.signal);
        score += strength_points(strength.strength);
        if strength.is_weak_to_strong {
            score += 10;
        }
        if strength.is_leading_mover {
            score += 8;
        }
        score += position_points(&position);
        score += self.cap_points(snapshot.market_cap);

        Ok(ScoreDetail {
            score: score.clamp(0, 100),
            is_weak_to_strong: strength.is_weak_to_strong,
            is_leading_mover: strength.is_leading_mover,
            leading_mover_tags: strength.leading_mover_tags.clone(),
            volume_price,
            position,
            strength,
        })
    }

    fn cap_points(&self, market_cap: f64) -> i32 {
        if market_cap > self.config.mid_cap_min && market_cap < self.config.mid_cap_max {
            5
        } else if market_cap > self.config.large_cap_min {
            2
        } else {
            0
        }
    }
}

fn volume_price_points(signal: VolumePriceSignal) -> i32 {
    match signal {
        VolumePriceSignal::VolumeConfirmedRally => 30,
        VolumePriceSignal::LowVolumeStrength => 25,
        VolumePriceSignal::ModerateRally => 15,
        VolumePriceSignal::VolumeWithoutFollowThrough => -10,
        VolumePriceSignal::VolumeConfirmedSelloff => -20,
        VolumePriceSignal::RallyWithoutVolume | VolumePriceSignal::Neutral => 0,
    }
}

fn strength_points(tier: StrengthTier) -> i32 {
    match tier {
        StrengthTier::LimitUp => 20,
        StrengthTier::Strong => 18,
        StrengthTier::Firm => 12,
        StrengthTier::Choppy => 5,
        StrengthTier::Soft | StrengthTier::Weak => -5,
    }
}

fn position_points(position: &PositionAnalysis) -> i32 {
    // Chasing a high close outranks the near-limit bonus.
    if position.position == IntradayPosition::IntradayHigh && !position.is_limit_up {
        -5
    } else if position.is_near_limit {
        8
    } else {
        0
    }
}
