use chrono::NaiveDate;
use sectorpulse_core::domain::performance::{CandidateMeta, PerformanceRecord};
use sectorpulse_core::ingest::MarketDataProvider;
use sectorpulse_core::performance::tracking::observe;
use sectorpulse_core::storage;
use sectorpulse_core::time::cn_market::TradingCalendar;
use std::collections::{BTreeSet, HashMap};

/// Trading days; the longest reported horizon is T+5.
const DEFAULT_WINDOW_DAYS: u32 = 5;

pub fn window_days_from_env() -> u32 {
    std::env::var("TRACKING_WINDOW_DAYS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(DEFAULT_WINDOW_DAYS)
}

/// Earliest report date still tracked on `track_date`: a report exactly `window_days`
/// sessions back gets its T+`window_days` observation today.
fn window_start(calendar: &TradingCalendar, track_date: NaiveDate, window_days: u32) -> NaiveDate {
    calendar.trading_days_before(track_date, window_days)
}

/// Prices every buyable recommendation from the last `window_days` trading days at
/// `track_date` and upserts the observations. Returns the number of observations.
pub async fn run(
    provider: &dyn MarketDataProvider,
    pool: &sqlx::PgPool,
    calendar: &TradingCalendar,
    track_date: NaiveDate,
    window_days: u32,
    dry_run: bool,
) -> anyhow::Result<usize> {
    if !calendar.is_trading_day(track_date) {
        tracing::info!(%track_date, "not a trading day; nothing to track");
        return Ok(0);
    }

    let since = window_start(calendar, track_date, window_days);
    let candidates = storage::reports::fetch_candidates_since(pool, since, true).await?;
    if candidates.is_empty() {
        tracing::info!(%track_date, %since, "no candidates in tracking window");
        return Ok(0);
    }

    let codes: Vec<String> = candidates
        .iter()
        .map(|c| c.code.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let prices = provider.fetch_quotes(&codes).await?;

    let records = observations(&candidates, &prices, track_date, calendar);
    tracing::info!(
        %track_date,
        candidates = candidates.len(),
        quoted = prices.len(),
        observations = records.len(),
        dry_run,
        "tracking prepared"
    );

    if !dry_run {
        storage::performance::upsert_performance(pool, &records).await?;
    }
    Ok(records.len())
}

fn observations(
    candidates: &[CandidateMeta],
    prices: &HashMap<String, f64>,
    track_date: NaiveDate,
    calendar: &TradingCalendar,
) -> Vec<PerformanceRecord> {
    candidates
        .iter()
        .filter_map(|c| {
            let Some(price) = prices.get(&c.code) else {
                tracing::debug!(code = %c.code, "no quote; skipped");
                return None;
            };
            observe(c, track_date, *price, calendar)
        })
        .collect()
}
