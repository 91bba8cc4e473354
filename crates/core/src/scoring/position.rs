use crate::domain::market::InstrumentSnapshot;
use crate::domain::{LIMIT_UP_PCT, NEAR_LIMIT_PCT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntradayPosition {
    IntradayHigh,
    MidRange,
    IntradayLow,
}

impl IntradayPosition {
    pub fn label(self) -> &'static str {
        match self {
            IntradayPosition::IntradayHigh => "intraday-high",
            IntradayPosition::MidRange => "mid-range",
            IntradayPosition::IntradayLow => "intraday-low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionAnalysis {
    pub position: IntradayPosition,
    pub is_limit_up: bool,
    pub is_near_limit: bool,
    pub amplitude: f64,
}

pub fn classify(snapshot: &InstrumentSnapshot) -> PositionAnalysis {
    let position = match snapshot.intraday_position() {
        Some(p) if p > 0.8 => IntradayPosition::IntradayHigh,
        Some(p) if p < 0.3 => IntradayPosition::IntradayLow,
        _ => IntradayPosition::MidRange,
    };
    let change = snapshot.change_pct;

    PositionAnalysis {
        position,
        is_limit_up: change >= LIMIT_UP_PCT,
        is_near_limit: (NEAR_LIMIT_PCT..LIMIT_UP_PCT).contains(&change),
        amplitude: snapshot.amplitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(price: f64, high: f64, low: f64, change_pct: f64) -> InstrumentSnapshot {
        InstrumentSnapshot {
            price: Some(price),
            high,
            low,
            change_pct,
            ..Default::default()
        }
    }

    #[test]
    fn classifies_position_in_range() {
        assert_eq!(classify(&snap(10.5, 11.0, 10.2, 5.0)).position, IntradayPosition::MidRange);
        assert_eq!(classify(&snap(10.95, 11.0, 10.2, 5.0)).position, IntradayPosition::IntradayHigh);
        assert_eq!(classify(&snap(10.25, 11.0, 10.2, 5.0)).position, IntradayPosition::IntradayLow);
    }

    #[test]
    fn degenerate_range_is_mid_range() {
        assert_eq!(classify(&snap(11.0, 11.0, 11.0, 10.0)).position, IntradayPosition::MidRange);
        assert_eq!(classify(&snap(11.0, 0.0, 10.0, 1.0)).position, IntradayPosition::MidRange);
    }

    #[test]
    fn limit_flags_are_exclusive() {
        for (change, limit, near) in [
            (9.9, true, false),
            (9.95, true, false),
            (9.89, false, true),
            (7.0, false, true),
            (6.99, false, false),
        ] {
            let a = classify(&snap(10.0, 10.0, 9.0, change));
            assert_eq!(a.is_limit_up, limit, "change {change}");
            assert_eq!(a.is_near_limit, near, "change {change}");
        }
    }
}
