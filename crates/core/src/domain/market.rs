use crate::domain::{lenient, round_dp, LIMIT_UP_PCT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One instrument's quote for a single refresh cycle.
///
/// `change_pct` is taken as supplied upstream even when it disagrees with
/// `(price - prev_close) / prev_close`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::option")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub prev_close: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub open: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub high: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub low: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub change_pct: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub amplitude: f64,
    /// Traded volume in lots.
    #[serde(default, deserialize_with = "lenient::zero")]
    pub volume: f64,
    #[serde(default, alias = "amount", deserialize_with = "lenient::zero")]
    pub traded_value: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub market_cap: f64,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub float_cap: f64,
}

impl InstrumentSnapshot {
    /// Last price when present and positive.
    pub fn valid_price(&self) -> Option<f64> {
        self.price.filter(|p| *p > 0.0)
    }

    /// Opening gap versus the previous close, in percent. 0 when either side is unknown.
    pub fn open_change_pct(&self) -> f64 {
        if self.prev_close > 0.0 && self.open > 0.0 {
            (self.open - self.prev_close) / self.prev_close * 100.0
        } else {
            0.0
        }
    }

    /// Where the last price sits inside the day range, `0.0..=1.0`.
    ///
    /// `None` when any bound is missing or the range is degenerate.
    pub fn intraday_position(&self) -> Option<f64> {
        let price = self.valid_price()?;
        if self.high <= 0.0 || self.low <= 0.0 {
            return None;
        }
        let range = self.high - self.low;
        if range <= 0.0 {
            return None;
        }
        Some((price - self.low) / range)
    }

    pub fn is_limit_up(&self) -> bool {
        self.change_pct >= LIMIT_UP_PCT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorSnapshot {
    pub code: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub change_pct: f64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub up_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub down_count: u32,
}

impl SectorSnapshot {
    pub fn constituent_count(&self) -> u32 {
        self.up_count + self.down_count
    }

    /// Advancers as a percentage of advancers + decliners; 50 when the sector is flat.
    pub fn up_ratio_pct(&self) -> f64 {
        match self.constituent_count() {
            0 => 50.0,
            total => self.up_count as f64 / total as f64 * 100.0,
        }
    }
}

/// One stored trading day for a sector, as kept by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorDailyRow {
    pub trade_date: NaiveDate,
    pub change_pct: f64,
    /// Net capital inflow in currency units; positive means inflow.
    pub net_inflow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorDay {
    pub date: NaiveDate,
    pub change_pct: f64,
}

/// Trailing three-trading-day view of a sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorHistory {
    pub days: Vec<SectorDay>,
    pub consecutive_up: u32,
    pub consecutive_inflow: u32,
    pub change_3d: f64,
    pub inflow_3d: f64,
    pub is_notable: bool,
}

pub const HISTORY_WINDOW_DAYS: usize = 3;

impl SectorHistory {
    /// Builds the window from stored rows in any order; only the latest three dates count.
    pub fn from_daily(rows: &[SectorDailyRow]) -> Self {
        let mut rows: Vec<&SectorDailyRow> = rows.iter().collect();
        rows.sort_by_key(|r| r.trade_date);
        let window = &rows[rows.len().saturating_sub(HISTORY_WINDOW_DAYS)..];

        let consecutive_up = window
            .iter()
            .rev()
            .take_while(|r| r.change_pct > 0.0)
            .count() as u32;
        let consecutive_inflow = window
            .iter()
            .rev()
            .take_while(|r| r.net_inflow > 0.0)
            .count() as u32;
        let change_3d = round_dp(window.iter().map(|r| r.change_pct).sum(), 2);
        let inflow_3d = window.iter().map(|r| r.net_inflow).sum();

        Self {
            days: window
                .iter()
                .map(|r| SectorDay {
                    date: r.trade_date,
                    change_pct: r.change_pct,
                })
                .collect(),
            consecutive_up,
            consecutive_inflow,
            change_3d,
            inflow_3d,
            is_notable: consecutive_up >= 2 || consecutive_inflow >= 2 || change_3d >= 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(d: u32, change_pct: f64, net_inflow: f64) -> SectorDailyRow {
        SectorDailyRow {
            trade_date: NaiveDate::from_ymd_opt(2026, 3, d).unwrap(),
            change_pct,
            net_inflow,
        }
    }

    #[test]
    fn decodes_sentinel_price_as_missing() {
        let s: InstrumentSnapshot = serde_json::from_value(json!({
            "code": "600000",
            "name": "Halted",
            "price": "-",
            "change_pct": "-",
            "amount": 123.0
        }))
        .unwrap();
        assert_eq!(s.price, None);
        assert_eq!(s.change_pct, 0.0);
        assert_eq!(s.traded_value, 123.0);
    }

    #[test]
    fn decodes_numeric_strings_and_nulls() {
        let s: InstrumentSnapshot = serde_json::from_value(json!({
            "code": "000001",
            "price": "10.5",
            "high": null,
            "market_cap": 5.0e9
        }))
        .unwrap();
        assert_eq!(s.price, Some(10.5));
        assert_eq!(s.high, 0.0);
        assert_eq!(s.market_cap, 5.0e9);
    }

    #[test]
    fn intraday_position_needs_a_real_range() {
        let mut s = InstrumentSnapshot {
            price: Some(10.5),
            high: 11.0,
            low: 10.2,
            ..Default::default()
        };
        let p = s.intraday_position().unwrap();
        assert!((p - 0.375).abs() < 1e-9);

        s.low = 11.0;
        assert_eq!(s.intraday_position(), None);
        s.low = 0.0;
        assert_eq!(s.intraday_position(), None);
    }

    #[test]
    fn open_change_is_zero_without_prev_close() {
        let s = InstrumentSnapshot {
            open: 10.3,
            prev_close: 0.0,
            ..Default::default()
        };
        assert_eq!(s.open_change_pct(), 0.0);
    }

    #[test]
    fn up_ratio_defaults_to_fifty() {
        let s = SectorSnapshot::default();
        assert_eq!(s.up_ratio_pct(), 50.0);
        let s = SectorSnapshot {
            up_count: 80,
            down_count: 20,
            ..Default::default()
        };
        assert_eq!(s.up_ratio_pct(), 80.0);
    }

    #[test]
    fn history_uses_latest_three_days() {
        let rows = vec![
            day(6, 1.2, 10.0),
            day(2, -4.0, -1.0),
            day(5, 0.8, -5.0),
            day(4, -0.5, 3.0),
        ];
        let h = SectorHistory::from_daily(&rows);
        assert_eq!(h.days.len(), 3);
        assert_eq!(h.days[0].date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(h.consecutive_up, 2);
        assert_eq!(h.consecutive_inflow, 1);
        assert_eq!(h.change_3d, 1.5);
        assert_eq!(h.inflow_3d, 8.0);
        assert!(h.is_notable);
    }

    #[test]
    fn quiet_history_is_not_notable() {
        let rows = vec![day(2, 1.0, 1.0), day(3, -1.0, -1.0), day(4, 2.0, -2.0)];
        let h = SectorHistory::from_daily(&rows);
        assert_eq!(h.consecutive_up, 1);
        assert_eq!(h.consecutive_inflow, 0);
        assert!(!h.is_notable);
    }
}
