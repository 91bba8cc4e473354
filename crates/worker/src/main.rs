use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sectorpulse_core::config::{ScoringConfig, Settings};
use sectorpulse_core::ingest::HttpJsonMarketData;
use sectorpulse_core::performance::aggregate;
use sectorpulse_core::scoring::{CandidateRanker, CompositeScorer};
use sectorpulse_core::storage;
use sectorpulse_core::time::cn_market::{resolve_report_date, today_cst, TradingCalendar};

mod report;
mod track;

#[derive(Debug, Parser)]
#[command(name = "sectorpulse_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and store the daily hot-sector report.
    Report {
        /// Report date (YYYY-MM-DD). Defaults to the latest closed China trading session.
        #[arg(long)]
        report_date: Option<String>,

        /// Fetch and score, but do not touch the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Record realized returns of recent recommendations.
    Track {
        /// Tracking date (YYYY-MM-DD). Defaults to the latest closed China trading session.
        #[arg(long)]
        track_date: Option<String>,

        /// Compute observations without writing them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the performance summary as JSON.
    Summary {
        #[arg(long, default_value_t = 7)]
        days: i64,

        #[arg(long)]
        include_unbuyable: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let calendar = TradingCalendar::from_env();

    let result = match args.command {
        Command::Report {
            report_date,
            dry_run,
        } => run_report(&settings, &calendar, report_date.as_deref(), dry_run).await,
        Command::Track {
            track_date,
            dry_run,
        } => run_track(&settings, &calendar, track_date.as_deref(), dry_run).await,
        Command::Summary {
            days,
            include_unbuyable,
        } => run_summary(&settings, days, include_unbuyable).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

async fn run_report(
    settings: &Settings,
    calendar: &TradingCalendar,
    report_date_arg: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let report_date = resolve_report_date(report_date_arg, Utc::now(), calendar)?;
    let provider = HttpJsonMarketData::from_settings(settings)?;
    let ranker = CandidateRanker::new(CompositeScorer::new(ScoringConfig::from_env()));
    let opts = report::ReportOptions::from_env();

    if dry_run {
        let daily = report::build_report(&provider, None, &ranker, report_date, &opts).await?;
        let candidates: usize = daily
            .sectors
            .iter()
            .map(|s| s.top_candidates(opts.candidates_per_sector).len())
            .sum();
        tracing::info!(
            %report_date,
            dry_run = true,
            sectors = daily.sectors.len(),
            candidates,
            "report built (dry-run)"
        );
        return Ok(());
    }

    let pool = connect(settings).await?;

    let acquired = storage::lock::try_acquire_report_lock(&pool, report_date).await?;
    if !acquired {
        tracing::warn!(%report_date, "report lock not acquired; another run in progress");
        return Ok(());
    }

    let outcome: anyhow::Result<uuid::Uuid> = async {
        let daily =
            report::build_report(&provider, Some(&pool), &ranker, report_date, &opts).await?;
        storage::reports::save_report(&pool, &daily, opts.candidates_per_sector).await
    }
    .await;

    let _ = storage::lock::release_report_lock(&pool, report_date).await;

    let report_id = outcome?;
    tracing::info!(%report_date, %report_id, "report run finished");
    Ok(())
}

async fn run_track(
    settings: &Settings,
    calendar: &TradingCalendar,
    track_date_arg: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let track_date = resolve_report_date(track_date_arg, Utc::now(), calendar)?;
    let provider = HttpJsonMarketData::from_settings(settings)?;
    let pool = connect(settings).await?;

    let tracked = track::run(
        &provider,
        &pool,
        calendar,
        track_date,
        track::window_days_from_env(),
        dry_run,
    )
    .await?;

    tracing::info!(%track_date, tracked, dry_run, "track run finished");
    Ok(())
}

async fn run_summary(settings: &Settings, days: i64, include_unbuyable: bool) -> anyhow::Result<()> {
    anyhow::ensure!((1..=365).contains(&days), "--days must be 1..=365 (got {days})");

    let pool = connect(settings).await?;
    let since = today_cst(Utc::now())? - Duration::days(days);

    let rows = storage::reports::fetch_performance_rows(&pool, since, include_unbuyable).await?;
    let unbuyable = storage::reports::fetch_unbuyable_since(&pool, since).await?;
    let summary = aggregate(&rows, &unbuyable);

    let out = serde_json::to_string_pretty(&summary).context("summary serialize failed")?;
    println!("{out}");
    Ok(())
}

async fn connect(settings: &Settings) -> anyhow::Result<sqlx::PgPool> {
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    storage::migrate(&pool).await?;
    Ok(pool)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
