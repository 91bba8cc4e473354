use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sectorpulse_core::config::ScoringConfig;
use sectorpulse_core::domain::market::{
    InstrumentSnapshot, SectorDailyRow, SectorHistory, SectorSnapshot,
};
use sectorpulse_core::domain::performance::CandidateMeta;
use sectorpulse_core::domain::report::{ReportHeader, SectorReport, StoredReport};
use sectorpulse_core::performance::{aggregate, PerformanceSummary};
use sectorpulse_core::scoring::{CandidateRanker, CompositeScorer};
use sectorpulse_core::storage::reports;
use sectorpulse_core::time::cn_market::today_cst;

const DEFAULT_SUMMARY_DAYS: i64 = 7;
const MAX_SUMMARY_DAYS: i64 = 365;
const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sectorpulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match sectorpulse_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let ranker = CandidateRanker::new(CompositeScorer::new(ScoringConfig::from_env()));
    let state = AppState { pool, ranker };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/reports", get(list_reports))
        .route("/reports/latest", get(get_latest_report))
        .route("/reports/:report_date", get(get_report_by_date))
        .route("/performance/summary", get(get_performance_summary))
        .route("/candidates/:code/history", get(get_candidate_history))
        .route("/analyze", post(analyze))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
    ranker: CandidateRanker,
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %e, "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn parse_date(s: &str) -> Result<NaiveDate, StatusCode> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list_reports(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ReportHeader>>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

    let headers = reports::list_recent_reports(pool, limit)
        .await
        .map_err(internal_error)?;
    Ok(Json(headers))
}

async fn get_latest_report(
    State(state): State<AppState>,
) -> Result<Json<StoredReport>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let report = reports::fetch_report(pool, None)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(report))
}

async fn get_report_by_date(
    State(state): State<AppState>,
    Path(report_date): Path<String>,
) -> Result<Json<StoredReport>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let report_date = parse_date(&report_date)?;

    let report = reports::fetch_report(pool, Some(report_date))
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    days: Option<i64>,
    #[serde(default)]
    include_unbuyable: bool,
}

#[derive(Debug, Serialize)]
struct ApiSummary {
    since: NaiveDate,
    days: i64,
    include_unbuyable: bool,
    #[serde(flatten)]
    summary: PerformanceSummary,
}

async fn get_performance_summary(
    State(state): State<AppState>,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<ApiSummary>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let days = q.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let today = today_cst(Utc::now()).map_err(internal_error)?;
    let since = today - Duration::days(days);

    let rows = reports::fetch_performance_rows(pool, since, q.include_unbuyable)
        .await
        .map_err(internal_error)?;
    let unbuyable = reports::fetch_unbuyable_since(pool, since)
        .await
        .map_err(internal_error)?;

    Ok(Json(ApiSummary {
        since,
        days,
        include_unbuyable: q.include_unbuyable,
        summary: aggregate(&rows, &unbuyable),
    }))
}

async fn get_candidate_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<CandidateMeta>>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    let code = code.trim();
    if code.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

    let history = reports::fetch_candidate_history(pool, code, limit)
        .await
        .map_err(internal_error)?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    sector: SectorSnapshot,
    instruments: Vec<InstrumentSnapshot>,
    #[serde(default)]
    market_change: f64,
    /// Stored daily rows for the sector; any order, the latest three count.
    #[serde(default)]
    history: Vec<SectorDailyRow>,
}

/// Runs the engine over posted snapshots; works without a database.
async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<SectorReport>, StatusCode> {
    if req.sector.code.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let history = SectorHistory::from_daily(&req.history);
    let report = SectorReport::build(
        &state.ranker,
        req.sector,
        &req.instruments,
        history,
        req.market_change,
    );
    tracing::debug!(
        sector = %report.sector.name,
        ranked = report.ranked.len(),
        stage = report.assessment.emotion.stage.label(),
        "analyze"
    );
    Ok(Json(report))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &sectorpulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
