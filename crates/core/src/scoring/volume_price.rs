use crate::domain::market::InstrumentSnapshot;
use crate::domain::round_dp;
use crate::scoring::rules::{at_least, first_match, Rule};
use serde::{Deserialize, Serialize};

/// Share of total cap assumed tradable when the float cap is unknown.
const FLOAT_CAP_FALLBACK_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeLevel {
    Explosive,
    Elevated,
    Moderate,
    Light,
    Minimal,
}

impl VolumeLevel {
    const TIERS: [(f64, VolumeLevel); 4] = [
        (15.0, VolumeLevel::Explosive),
        (8.0, VolumeLevel::Elevated),
        (4.0, VolumeLevel::Moderate),
        (2.0, VolumeLevel::Light),
    ];

    pub fn from_turnover_rate(turnover_rate: f64) -> Self {
        at_least(&Self::TIERS, turnover_rate, VolumeLevel::Minimal)
    }

    pub fn is_heavy(self) -> bool {
        matches!(self, VolumeLevel::Explosive | VolumeLevel::Elevated)
    }

    pub fn label(self) -> &'static str {
        match self {
            VolumeLevel::Explosive => "explosive",
            VolumeLevel::Elevated => "elevated",
            VolumeLevel::Moderate => "moderate",
            VolumeLevel::Light => "light",
            VolumeLevel::Minimal => "minimal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumePriceSignal {
    /// Heavy turnover with a solid advance: capital entering.
    VolumeConfirmedRally,
    /// Strong advance on ordinary turnover: holders are not selling.
    LowVolumeStrength,
    /// Heavy turnover going nowhere: possible distribution.
    VolumeWithoutFollowThrough,
    VolumeConfirmedSelloff,
    ModerateRally,
    /// Advance on almost no turnover, typically a one-price limit-up or locked float.
    RallyWithoutVolume,
    Neutral,
}

impl VolumePriceSignal {
    pub fn is_healthy(self) -> bool {
        matches!(
            self,
            VolumePriceSignal::VolumeConfirmedRally
                | VolumePriceSignal::LowVolumeStrength
                | VolumePriceSignal::ModerateRally
                | VolumePriceSignal::RallyWithoutVolume
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            VolumePriceSignal::VolumeConfirmedRally => "volume-confirmed rally",
            VolumePriceSignal::LowVolumeStrength => "low-volume strength",
            VolumePriceSignal::VolumeWithoutFollowThrough => "volume-without-follow-through",
            VolumePriceSignal::VolumeConfirmedSelloff => "volume-confirmed selloff",
            VolumePriceSignal::ModerateRally => "moderate rally",
            VolumePriceSignal::RallyWithoutVolume => "rally without volume",
            VolumePriceSignal::Neutral => "neutral/watch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePriceAnalysis {
    pub volume_level: VolumeLevel,
    /// Percent, rounded to 2 dp.
    pub turnover_rate: f64,
    pub signal: VolumePriceSignal,
    pub is_healthy: bool,
}

struct Reading {
    level: VolumeLevel,
    change: f64,
}

fn signal_rules() -> [Rule<Reading, VolumePriceSignal>; 6] {
    [
        Rule {
            when: |r: &Reading| r.level.is_heavy() && r.change > 3.0,
            then: VolumePriceSignal::VolumeConfirmedRally,
        },
        Rule {
            when: |r: &Reading| {
                matches!(r.level, VolumeLevel::Moderate | VolumeLevel::Light) && r.change > 5.0
            },
            then: VolumePriceSignal::LowVolumeStrength,
        },
        Rule {
            when: |r: &Reading| r.level.is_heavy() && r.change > -1.0 && r.change < 2.0,
            then: VolumePriceSignal::VolumeWithoutFollowThrough,
        },
        Rule {
            when: |r: &Reading| r.level.is_heavy() && r.change < -3.0,
            then: VolumePriceSignal::VolumeConfirmedSelloff,
        },
        Rule {
            when: |r: &Reading| r.change > 2.0,
            then: VolumePriceSignal::ModerateRally,
        },
        Rule {
            when: |r: &Reading| r.level == VolumeLevel::Minimal && r.change > 0.0,
            then: VolumePriceSignal::RallyWithoutVolume,
        },
    ]
}

/// Traded value over the tradable cap, in percent.
///
/// Uses the float cap, else 70% of total cap, else reports 0.
pub fn turnover_rate(snapshot: &InstrumentSnapshot) -> f64 {
    let base = if snapshot.float_cap > 0.0 {
        snapshot.float_cap
    } else if snapshot.market_cap > 0.0 {
        snapshot.market_cap * FLOAT_CAP_FALLBACK_RATIO
    } else {
        0.0
    };

    if base > 0.0 {
        snapshot.traded_value / base * 100.0
    } else {
        0.0
    }
}

pub fn classify(snapshot: &InstrumentSnapshot) -> VolumePriceAnalysis {
    let rate = turnover_rate(snapshot);
    let reading = Reading {
        level: VolumeLevel::from_turnover_rate(rate),
        change: snapshot.change_pct,
    };
    let signal = first_match(&signal_rules(), &reading, VolumePriceSignal::Neutral);

    VolumePriceAnalysis {
        volume_level: reading.level,
        turnover_rate: round_dp(rate, 2),
        signal,
        is_healthy: signal.is_healthy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(traded_value: f64, float_cap: f64, market_cap: f64, change_pct: f64) -> InstrumentSnapshot {
        InstrumentSnapshot {
            code: "000001".to_string(),
            price: Some(10.0),
            traded_value,
            float_cap,
            market_cap,
            change_pct,
            ..Default::default()
        }
    }

    #[test]
    fn tier_boundaries_belong_to_the_higher_tier() {
        assert_eq!(VolumeLevel::from_turnover_rate(15.0), VolumeLevel::Explosive);
        assert_eq!(VolumeLevel::from_turnover_rate(8.0), VolumeLevel::Elevated);
        assert_eq!(VolumeLevel::from_turnover_rate(4.0), VolumeLevel::Moderate);
        assert_eq!(VolumeLevel::from_turnover_rate(2.0), VolumeLevel::Light);
        assert_eq!(VolumeLevel::from_turnover_rate(1.99), VolumeLevel::Minimal);
    }

    #[test]
    fn level_never_decreases_with_turnover() {
        let order = |l: VolumeLevel| match l {
            VolumeLevel::Minimal => 0,
            VolumeLevel::Light => 1,
            VolumeLevel::Moderate => 2,
            VolumeLevel::Elevated => 3,
            VolumeLevel::Explosive => 4,
        };
        let mut prev = 0;
        for i in 0..400 {
            let rank = order(VolumeLevel::from_turnover_rate(i as f64 * 0.05));
            assert!(rank >= prev);
            prev = rank;
        }
    }

    #[test]
    fn turnover_falls_back_to_total_cap() {
        let s = snap(1.4e8, 0.0, 1.0e10, 1.0);
        assert!((turnover_rate(&s) - 2.0).abs() < 1e-9);
        assert_eq!(turnover_rate(&snap(1.0e8, 0.0, 0.0, 1.0)), 0.0);
    }

    #[test]
    fn heavy_volume_rally_is_confirmed() {
        let a = classify(&snap(1.2e9, 1.0e10, 0.0, 5.0));
        assert_eq!(a.turnover_rate, 12.0);
        assert_eq!(a.volume_level, VolumeLevel::Elevated);
        assert_eq!(a.signal, VolumePriceSignal::VolumeConfirmedRally);
        assert!(a.is_healthy);
    }

    #[test]
    fn rule_order_decides_the_signal() {
        // moderate volume, +6%: low-volume strength beats moderate rally
        assert_eq!(
            classify(&snap(5.0e8, 1.0e10, 0.0, 6.0)).signal,
            VolumePriceSignal::LowVolumeStrength
        );
        // heavy volume, flat close
        assert_eq!(
            classify(&snap(1.0e9, 1.0e10, 0.0, 0.5)).signal,
            VolumePriceSignal::VolumeWithoutFollowThrough
        );
        // heavy volume, -4%
        assert_eq!(
            classify(&snap(1.0e9, 1.0e10, 0.0, -4.0)).signal,
            VolumePriceSignal::VolumeConfirmedSelloff
        );
        // light volume, +3%
        assert_eq!(
            classify(&snap(3.0e8, 1.0e10, 0.0, 3.0)).signal,
            VolumePriceSignal::ModerateRally
        );
        // minimal volume, +1%
        let a = classify(&snap(1.0e7, 1.0e10, 0.0, 1.0));
        assert_eq!(a.signal, VolumePriceSignal::RallyWithoutVolume);
        assert!(a.is_healthy);
        // heavy volume, +2.5%: no heavy rule matches, falls to moderate rally
        assert_eq!(
            classify(&snap(1.0e9, 1.0e10, 0.0, 2.5)).signal,
            VolumePriceSignal::ModerateRally
        );
        let a = classify(&snap(3.0e8, 1.0e10, 0.0, -0.5));
        assert_eq!(a.signal, VolumePriceSignal::Neutral);
        assert!(!a.is_healthy);
    }
}
