//! Sector emotion cycle: freeze → ignition → fermentation → climax → divergence → ebbing → freeze.

use crate::domain::market::{InstrumentSnapshot, SectorSnapshot};
use crate::domain::{round_dp, LIMIT_UP_PCT};
use crate::scoring::rules::{at_least, first_match, Rule};
use serde::{Deserialize, Serialize};

/// Amplitude above which a single instrument counts toward divergence.
const HIGH_AMPLITUDE_PCT: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmotionStage {
    Climax,
    Fermentation,
    Ignition,
    Divergence,
    Ebbing,
    Freeze,
    DeepFreeze,
    Choppy,
    Correction,
}

impl EmotionStage {
    pub fn label(self) -> &'static str {
        match self {
            EmotionStage::Climax => "climax",
            EmotionStage::Fermentation => "fermentation",
            EmotionStage::Ignition => "ignition",
            EmotionStage::Divergence => "divergence",
            EmotionStage::Ebbing => "ebbing",
            EmotionStage::Freeze => "freeze",
            EmotionStage::DeepFreeze => "deep-freeze",
            EmotionStage::Choppy => "choppy",
            EmotionStage::Correction => "correction",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EmotionStage::Climax => "euphoric, mind the risk",
            EmotionStage::Fermentation => "capital keeps flowing in",
            EmotionStage::Ignition => "watch how the leaders trade",
            EmotionStage::Divergence => "bulls and bears fighting hard",
            EmotionStage::Ebbing => "capital is leaving",
            EmotionStage::Freeze => "waiting for a base",
            EmotionStage::DeepFreeze => "extremely depressed",
            EmotionStage::Choppy => "no clear direction",
            EmotionStage::Correction => "stand aside for now",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            EmotionStage::Freeze | EmotionStage::DeepFreeze => "be patient, do not bottom-fish",
            EmotionStage::Ignition => "small probing positions, follow the leader",
            EmotionStage::Fermentation => "participate moderately alongside the leader",
            EmotionStage::Climax => "do not chase, take profits",
            EmotionStage::Divergence => "observe and wait for direction",
            EmotionStage::Ebbing => "avoid, do not enter",
            EmotionStage::Choppy => "wait and see",
            EmotionStage::Correction => "step back until it stabilises",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            EmotionStage::Ignition => "#17a2b8",
            EmotionStage::Fermentation => "#28a745",
            EmotionStage::Climax => "#dc3545",
            EmotionStage::Divergence => "#ffc107",
            EmotionStage::Ebbing => "#fd7e14",
            EmotionStage::Freeze
            | EmotionStage::DeepFreeze
            | EmotionStage::Choppy
            | EmotionStage::Correction => "#6c757d",
        }
    }
}

/// Aggregates over the sector and its instruments that feed the emotion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionMetrics {
    pub change_pct: f64,
    pub up_ratio: f64,
    pub limit_up_count: u32,
    pub avg_traded_value: f64,
    pub avg_amplitude: f64,
    pub high_amplitude_count: u32,
}

impl EmotionMetrics {
    pub fn collect(sector: &SectorSnapshot, instruments: &[InstrumentSnapshot]) -> Self {
        let limit_up_count = instruments
            .iter()
            .filter(|s| s.change_pct >= LIMIT_UP_PCT)
            .count() as u32;
        let high_amplitude_count = instruments
            .iter()
            .filter(|s| s.amplitude > HIGH_AMPLITUDE_PCT)
            .count() as u32;
        let n = instruments.len().max(1) as f64;

        Self {
            change_pct: sector.change_pct,
            up_ratio: sector.up_ratio_pct(),
            limit_up_count,
            avg_traded_value: instruments.iter().map(|s| s.traded_value).sum::<f64>() / n,
            avg_amplitude: instruments.iter().map(|s| s.amplitude).sum::<f64>() / n,
            high_amplitude_count,
        }
    }

    pub fn score(&self) -> i32 {
        let change_term: i32 = at_least(
            &[(5.0, 25), (3.0, 20), (1.0, 10), (0.0, 5), (-1.0, -5), (-3.0, -15)],
            self.change_pct,
            -20,
        );
        let breadth_term = at_least(
            &[(80.0, 15), (60.0, 10), (50.0, 5), (40.0, -5), (30.0, -10)],
            self.up_ratio,
            -15,
        );
        let limit_up_term = at_least(
            &[(5.0, 15), (3.0, 10), (1.0, 5)],
            self.limit_up_count as f64,
            0,
        );
        let activity_term = at_least(
            &[(1.5e9, 10), (8.0e8, 6), (3.0e8, 3)],
            self.avg_traded_value,
            0,
        );
        // Wide ranges without a matching advance read as divergence.
        let divergence_penalty = if self.avg_amplitude > 10.0 && self.change_pct < 3.0 {
            -10
        } else {
            0
        };

        (50 + change_term + breadth_term + limit_up_term + activity_term + divergence_penalty)
            .clamp(0, 100)
    }
}

struct StageInputs {
    score: i32,
    change: f64,
    up_ratio: f64,
    avg_amplitude: f64,
    limit_up_count: u32,
}

fn stage_rules() -> [Rule<StageInputs, EmotionStage>; 8] {
    [
        Rule {
            when: |i: &StageInputs| i.score >= 80 && i.change >= 4.0 && i.limit_up_count >= 3,
            then: EmotionStage::Climax,
        },
        Rule {
            when: |i: &StageInputs| i.score >= 65 && i.change >= 2.0,
            then: EmotionStage::Fermentation,
        },
        Rule {
            when: |i: &StageInputs| (55..70).contains(&i.score) && i.change >= 0.5,
            then: EmotionStage::Ignition,
        },
        Rule {
            when: |i: &StageInputs| {
                (40..65).contains(&i.score)
                    && i.avg_amplitude >= 6.0
                    && (35.0..=65.0).contains(&i.up_ratio)
            },
            then: EmotionStage::Divergence,
        },
        Rule {
            when: |i: &StageInputs| (25..50).contains(&i.score) && i.change < 0.0,
            then: EmotionStage::Ebbing,
        },
        Rule {
            when: |i: &StageInputs| i.score < 30 && i.change < -2.0,
            then: EmotionStage::Freeze,
        },
        Rule {
            when: |i: &StageInputs| i.score < 20,
            then: EmotionStage::DeepFreeze,
        },
        Rule {
            when: |i: &StageInputs| i.change >= 0.0,
            then: EmotionStage::Choppy,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorEmotion {
    pub stage: EmotionStage,
    pub description: String,
    pub advice: String,
    pub color: String,
    pub emotion_score: i32,
    pub metrics: EmotionMetrics,
}

pub fn classify(sector: &SectorSnapshot, instruments: &[InstrumentSnapshot]) -> SectorEmotion {
    let metrics = EmotionMetrics::collect(sector, instruments);
    let emotion_score = metrics.score();
    let inputs = StageInputs {
        score: emotion_score,
        change: metrics.change_pct,
        up_ratio: metrics.up_ratio,
        avg_amplitude: metrics.avg_amplitude,
        limit_up_count: metrics.limit_up_count,
    };
    let stage = first_match(&stage_rules(), &inputs, EmotionStage::Correction);

    SectorEmotion {
        stage,
        description: stage.description().to_string(),
        advice: stage.advice().to_string(),
        color: stage.color().to_string(),
        emotion_score,
        metrics: EmotionMetrics {
            change_pct: round_dp(metrics.change_pct, 2),
            up_ratio: round_dp(metrics.up_ratio, 1),
            avg_amplitude: round_dp(metrics.avg_amplitude, 2),
            avg_traded_value: round_dp(metrics.avg_traded_value, 0),
            ..metrics
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(change_pct: f64, up_count: u32, down_count: u32) -> SectorSnapshot {
        SectorSnapshot {
            code: "BK0001".to_string(),
            name: "Test sector".to_string(),
            change_pct,
            up_count,
            down_count,
        }
    }

    fn instruments(n: usize, limit_ups: usize, traded_value: f64, amplitude: f64) -> Vec<InstrumentSnapshot> {
        (0..n)
            .map(|i| InstrumentSnapshot {
                code: format!("{i:06}"),
                price: Some(10.0),
                change_pct: if i < limit_ups { 10.0 } else { 2.0 },
                traded_value,
                amplitude,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn hot_sector_is_climax_and_clamped() {
        let e = classify(&sector(6.0, 80, 10), &instruments(10, 4, 2.0e9, 5.0));
        // 50 + 25 + 15 + 10 + 10 = 110
        assert_eq!(e.emotion_score, 100);
        assert_eq!(e.stage, EmotionStage::Climax);
        assert_eq!(e.metrics.limit_up_count, 4);
        assert_eq!(e.color, "#dc3545");
    }

    #[test]
    fn empty_sector_defaults() {
        let e = classify(&sector(0.0, 0, 0), &[]);
        assert_eq!(e.metrics.up_ratio, 50.0);
        assert_eq!(e.metrics.avg_traded_value, 0.0);
        // 50 + 5 + 5
        assert_eq!(e.emotion_score, 60);
        assert_eq!(e.stage, EmotionStage::Choppy);
    }

    #[test]
    fn divergence_penalty_applies_below_three_percent() {
        let wide = instruments(4, 0, 1.0e8, 11.0);
        assert_eq!(classify(&sector(2.9, 50, 50), &wide).emotion_score, 50 + 10 + 5 - 10);
        assert_eq!(classify(&sector(3.0, 50, 50), &wide).emotion_score, 50 + 20 + 5);
    }

    #[test]
    fn score_never_decreases_with_sector_change() {
        let list = instruments(5, 1, 5.0e8, 11.0);
        let mut prev = i32::MIN;
        for step in -100..=100 {
            let change = step as f64 / 10.0;
            let score = classify(&sector(change, 30, 30), &list).emotion_score;
            assert!(score >= prev, "score dropped at change {change}");
            prev = score;
        }
    }

    #[test]
    fn stage_order_matters() {
        // score 65, change 1.0: ignition is checked before divergence
        let s = sector(1.0, 50, 50);
        let list = instruments(4, 0, 1.0e8, 7.0);
        let e = classify(&s, &list);
        assert_eq!(e.emotion_score, 65);
        assert_eq!(e.stage, EmotionStage::Ignition);

        // flat, wide and balanced
        let e = classify(&sector(0.2, 50, 50), &list);
        assert_eq!(e.emotion_score, 60);
        assert_eq!(e.stage, EmotionStage::Divergence);
    }

    #[test]
    fn falling_sectors() {
        let list = instruments(4, 0, 1.0e8, 3.0);
        let e = classify(&sector(-2.0, 35, 65), &list);
        // 50 - 15 - 10
        assert_eq!(e.emotion_score, 25);
        assert_eq!(e.stage, EmotionStage::Ebbing);

        let e = classify(&sector(-4.0, 10, 90), &list);
        // 50 - 20 - 15
        assert_eq!(e.emotion_score, 15);
        assert_eq!(e.stage, EmotionStage::Freeze);

        let e = classify(&sector(-0.5, 20, 80), &list);
        // 50 - 5 - 15
        assert_eq!(e.emotion_score, 30);
        assert_eq!(e.stage, EmotionStage::Ebbing);

        let e = classify(&sector(-1.5, 45, 55), &instruments(4, 0, 1.0e8, 12.0));
        // 50 - 15 - 5 - 10
        assert_eq!(e.emotion_score, 20);
        assert_eq!(e.stage, EmotionStage::Correction);
    }
}
