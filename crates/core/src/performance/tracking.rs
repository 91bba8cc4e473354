use crate::domain::performance::{CandidateMeta, PerformanceRecord};
use crate::domain::round_dp;
use crate::time::cn_market::TradingCalendar;
use chrono::NaiveDate;

/// Percent return from `recommend_price` to `current_price`, 2 dp; 0 when either is not positive.
pub fn calculate_return(recommend_price: f64, current_price: f64) -> f64 {
    if recommend_price <= 0.0 || current_price <= 0.0 {
        return 0.0;
    }
    round_dp((current_price - recommend_price) / recommend_price * 100.0, 2)
}

/// Builds the observation for `track_date`. `None` on the report day itself or without a price.
pub fn observe(
    candidate: &CandidateMeta,
    track_date: NaiveDate,
    current_price: f64,
    calendar: &TradingCalendar,
) -> Option<PerformanceRecord> {
    let days_held = calendar.trading_days_between(candidate.report_date, track_date);
    if days_held < 1 || current_price <= 0.0 {
        return None;
    }
    Some(PerformanceRecord {
        candidate_id: candidate.candidate_id,
        track_date,
        days_held,
        current_price,
        return_pct: calculate_return(candidate.recommend_price, current_price),
        is_trading_day: calendar.is_trading_day(track_date),
    })
}
