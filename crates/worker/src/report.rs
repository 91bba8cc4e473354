use anyhow::Context;
use chrono::{NaiveDate, Utc};
use sectorpulse_core::domain::market::{SectorDailyRow, SectorHistory, HISTORY_WINDOW_DAYS};
use sectorpulse_core::domain::report::{DailyReport, SectorReport};
use sectorpulse_core::ingest::types::HotSector;
use sectorpulse_core::ingest::MarketDataProvider;
use sectorpulse_core::scoring::CandidateRanker;
use sectorpulse_core::storage;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Hot sectors included in the report.
    pub sector_limit: usize,
    /// Top candidates per sector that are stored and tracked.
    pub candidates_per_sector: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sector_limit: 8,
            candidates_per_sector: 3,
        }
    }
}

impl ReportOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("REPORT_SECTOR_LIMIT") {
            if let Ok(n) = s.parse::<usize>() {
                out.sector_limit = n;
            }
        }

        if let Ok(s) = std::env::var("REPORT_CANDIDATES_PER_SECTOR") {
            if let Ok(n) = s.parse::<usize>() {
                out.candidates_per_sector = n;
            }
        }

        out
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=50).contains(&self.sector_limit),
            "REPORT_SECTOR_LIMIT must be 1..=50 (got {})",
            self.sector_limit
        );
        anyhow::ensure!(
            (1..=20).contains(&self.candidates_per_sector),
            "REPORT_CANDIDATES_PER_SECTOR must be 1..=20 (got {})",
            self.candidates_per_sector
        );
        Ok(())
    }
}

/// Fetches hot sectors and their instruments, scores them and builds the day's report.
///
/// With a pool, today's sector rows are upserted first so the history window includes them.
/// Without one (dry run) the history holds today only.
pub async fn build_report(
    provider: &dyn MarketDataProvider,
    pool: Option<&sqlx::PgPool>,
    ranker: &CandidateRanker,
    report_date: NaiveDate,
    opts: &ReportOptions,
) -> anyhow::Result<DailyReport> {
    opts.validate()?;

    let market_change = provider
        .fetch_market_change()
        .await
        .context("fetch market change failed")?;
    let hot = provider
        .fetch_hot_sectors(opts.sector_limit)
        .await
        .context("fetch hot sectors failed")?;
    anyhow::ensure!(!hot.is_empty(), "provider returned no hot sectors");

    tracing::info!(
        %report_date,
        provider = provider.provider_name(),
        market_change,
        sectors = hot.len(),
        "hot sectors fetched"
    );

    if let Some(pool) = pool {
        storage::sector_daily::upsert_sector_daily(pool, report_date, &hot).await?;
    }

    let mut sectors = Vec::with_capacity(hot.len());
    for item in hot {
        let instruments = match provider.fetch_sector_instruments(&item.sector.code).await {
            Ok(v) => v,
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::warn!(sector = %item.sector.name, error = %err, "instrument fetch failed; skipping sector");
                continue;
            }
        };

        let stored = match pool {
            Some(pool) => {
                storage::sector_daily::fetch_sector_history(
                    pool,
                    &item.sector.code,
                    report_date,
                    HISTORY_WINDOW_DAYS as i64,
                )
                .await?
            }
            None => Vec::new(),
        };
        let history = SectorHistory::from_daily(&with_today(stored, &item, report_date));

        let report = SectorReport::build(ranker, item.sector, &instruments, history, market_change);
        tracing::info!(
            sector = %report.sector.name,
            instruments = instruments.len(),
            stage = report.assessment.emotion.stage.label(),
            quality = report.assessment.quality.total_score,
            "sector analyzed"
        );
        sectors.push(report);
    }

    anyhow::ensure!(!sectors.is_empty(), "no sector could be analyzed for {report_date}");

    Ok(DailyReport {
        report_date,
        generated_at: Utc::now(),
        market_change,
        sectors,
    })
}

/// Stored rows with today's values from the live feed taking precedence.
fn with_today(
    mut rows: Vec<SectorDailyRow>,
    hot: &HotSector,
    report_date: NaiveDate,
) -> Vec<SectorDailyRow> {
    rows.retain(|r| r.trade_date != report_date);
    rows.push(SectorDailyRow {
        trade_date: report_date,
        change_pct: hot.sector.change_pct,
        net_inflow: hot.net_inflow,
    });
    rows
}
