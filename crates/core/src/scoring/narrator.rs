use crate::scoring::composite::ScoreDetail;
use crate::scoring::strength::StrengthTier;
use crate::scoring::volume_price::VolumePriceSignal;

pub const DEFAULT_SIGNAL: &str = "watch";
pub const DEFAULT_RATIONALE: &str = "mixed performance";

/// Short trading label, e.g. `volume+price up | reversal✓`.
pub fn signal(detail: &ScoreDetail) -> String {
    let mut tags: Vec<&str> = Vec::new();

    match detail.volume_price.signal {
        VolumePriceSignal::VolumeConfirmedRally => tags.push("volume+price up"),
        VolumePriceSignal::LowVolumeStrength => tags.push("chips locked"),
        VolumePriceSignal::VolumeWithoutFollowThrough => tags.push("⚠ stalling"),
        VolumePriceSignal::VolumeConfirmedSelloff => tags.push("⚠ distribution"),
        _ => {}
    }

    if detail.is_weak_to_strong {
        tags.push("reversal✓");
    }

    match detail.strength.strength {
        StrengthTier::LimitUp => tags.push("board locked"),
        StrengthTier::Strong => tags.push("sector leader"),
        _ => {}
    }

    if detail.position.is_near_limit {
        tags.push("approaching limit");
    }

    if tags.is_empty() {
        DEFAULT_SIGNAL.to_string()
    } else {
        tags.join(" | ")
    }
}

/// Human-readable reasons behind the score.
pub fn rationale(detail: &ScoreDetail) -> String {
    let mut reasons: Vec<String> = Vec::new();

    let level = detail.volume_price.volume_level;
    if level.is_heavy() {
        reasons.push(format!("{} active", level.label()));
    }

    let tier = detail.strength.strength;
    match tier {
        StrengthTier::LimitUp => reasons.push("locked strong".to_string()),
        StrengthTier::Strong => reasons.push("sector-leading theme".to_string()),
        StrengthTier::Firm => reasons.push("steady advance".to_string()),
        _ => {}
    }

    if detail.is_weak_to_strong {
        reasons.push("reversal pattern".to_string());
    }

    let open = detail.strength.open_strength;
    if matches!(tier, StrengthTier::Strong | StrengthTier::Firm) {
        if open.is_gap_up() {
            reasons.push("gap-up strength".to_string());
        } else if open.is_gap_down() {
            reasons.push("gap-down rally".to_string());
        }
    }

    if reasons.is_empty() {
        DEFAULT_RATIONALE.to_string()
    } else {
        reasons.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::InstrumentSnapshot;
    use crate::scoring::composite::CompositeScorer;
    use crate::scoring::strength::MarketContext;

    fn detail(s: InstrumentSnapshot) -> ScoreDetail {
        let ctx = MarketContext {
            market_change: 0.3,
            sector_change: 2.0,
        };
        CompositeScorer::default().score(&s, ctx).unwrap()
    }

    #[test]
    fn quiet_instrument_gets_defaults() {
        let d = detail(InstrumentSnapshot {
            code: "000002".to_string(),
            price: Some(10.0),
            prev_close: 10.0,
            open: 10.0,
            change_pct: 0.2,
            traded_value: 3.0e8,
            float_cap: 1.0e10,
            ..Default::default()
        });
        assert_eq!(signal(&d), DEFAULT_SIGNAL);
        assert_eq!(rationale(&d), DEFAULT_RATIONALE);
    }

    #[test]
    fn tags_follow_fixed_precedence() {
        // elevated turnover, +8%, gapped down then rallied to the high
        let d = detail(InstrumentSnapshot {
            code: "000003".to_string(),
            price: Some(10.8),
            prev_close: 10.0,
            open: 9.8,
            high: 10.9,
            low: 9.7,
            change_pct: 8.0,
            amplitude: 12.0,
            traded_value: 1.0e9,
            float_cap: 1.0e10,
            ..Default::default()
        });
        assert_eq!(
            signal(&d),
            "volume+price up | reversal✓ | sector leader | approaching limit"
        );
        assert_eq!(
            rationale(&d),
            "elevated active, sector-leading theme, reversal pattern, gap-down rally"
        );
    }

    #[test]
    fn gap_up_firm_close() {
        let d = detail(InstrumentSnapshot {
            code: "000004".to_string(),
            price: Some(10.4),
            prev_close: 10.0,
            open: 10.2,
            high: 10.5,
            low: 10.15,
            change_pct: 4.0,
            amplitude: 3.5,
            traded_value: 3.0e8,
            float_cap: 1.0e10,
            ..Default::default()
        });
        assert_eq!(signal(&d), DEFAULT_SIGNAL);
        assert_eq!(rationale(&d), "steady advance, gap-up strength");
    }
}
