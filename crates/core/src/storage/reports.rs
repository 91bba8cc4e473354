use crate::domain::candidate::{CandidateRecord, UnbuyableReason};
use crate::domain::market::SectorHistory;
use crate::domain::performance::{CandidateMeta, Observation, PerformanceRow};
use crate::domain::report::{
    DailyReport, ReportHeader, StoredCandidate, StoredReport, StoredSector,
};
use crate::sector::SectorAssessment;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Candidate row ready for insert, with buyability decided.
struct CandidateInsert<'a> {
    id: Uuid,
    sector_code: &'a str,
    sector_name: &'a str,
    rank: i32,
    record: &'a CandidateRecord,
    unbuyable: Option<UnbuyableReason>,
    record_json: Value,
}

/// Replaces the report for `report.report_date`: header, sectors and the top
/// `candidates_per_sector` candidates of each sector, in one transaction.
pub async fn save_report(
    pool: &sqlx::PgPool,
    report: &DailyReport,
    candidates_per_sector: usize,
) -> anyhow::Result<Uuid> {
    anyhow::ensure!(!report.sectors.is_empty(), "report must have at least one sector");
    anyhow::ensure!(candidates_per_sector >= 1, "candidates_per_sector must be >= 1");

    let mut inserts = Vec::new();
    for sector in &report.sectors {
        for (idx, record) in sector.top_candidates(candidates_per_sector).into_iter().enumerate() {
            let record_json =
                serde_json::to_value(record).context("candidate record serialize failed")?;
            inserts.push(CandidateInsert {
                id: Uuid::new_v4(),
                sector_code: &sector.sector.code,
                sector_name: &sector.sector.name,
                rank: idx as i32 + 1,
                record,
                unbuyable: record.unbuyable_reason(),
                record_json,
            });
        }
    }

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let report_id: Uuid = sqlx::query_scalar(
        "INSERT INTO reports (id, report_date, generated_at, market_change, sectors_count, candidates_count) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (report_date) DO UPDATE \
           SET generated_at = EXCLUDED.generated_at, market_change = EXCLUDED.market_change, \
               sectors_count = EXCLUDED.sectors_count, candidates_count = EXCLUDED.candidates_count \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(report.report_date)
    .bind(report.generated_at)
    .bind(report.market_change)
    .bind(report.sectors.len() as i32)
    .bind(inserts.len() as i32)
    .fetch_one(&mut *tx)
    .await
    .context("upsert reports failed")?;

    // A re-run for the same date replaces the previous contents; performance rows of the
    // old candidates go with them.
    sqlx::query("DELETE FROM recommended_candidates WHERE report_id = $1")
        .bind(report_id)
        .execute(&mut *tx)
        .await
        .context("delete old recommended_candidates failed")?;
    sqlx::query("DELETE FROM report_sectors WHERE report_id = $1")
        .bind(report_id)
        .execute(&mut *tx)
        .await
        .context("delete old report_sectors failed")?;

    for (position, sector) in report.sectors.iter().enumerate() {
        let emotion = serde_json::to_value(&sector.assessment.emotion)
            .context("emotion serialize failed")?;
        let quality = serde_json::to_value(&sector.assessment.quality)
            .context("quality serialize failed")?;
        let history =
            serde_json::to_value(&sector.history).context("history serialize failed")?;

        sqlx::query(
            "INSERT INTO report_sectors \
               (report_id, position, sector_code, sector_name, change_pct, up_count, down_count, emotion, quality, history) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(report_id)
        .bind(position as i32)
        .bind(&sector.sector.code)
        .bind(&sector.sector.name)
        .bind(sector.sector.change_pct)
        .bind(sector.sector.up_count as i32)
        .bind(sector.sector.down_count as i32)
        .bind(emotion)
        .bind(quality)
        .bind(history)
        .execute(&mut *tx)
        .await
        .context("insert report_sectors failed")?;
    }

    if !inserts.is_empty() {
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO recommended_candidates \
               (id, report_id, sector_code, sector_name, rank, code, name, recommend_price, change_pct, \
                open_change, score, signal, rationale, volume_level, strength, is_weak_to_strong, \
                is_leading_mover, leading_mover_tags, is_first_limit_up, market_cap, traded_value, \
                turnover_rate, is_buyable, unbuyable_reason, record) ",
        );
        qb.push_values(&inserts, |mut b, c| {
            let detail = &c.record.detail;
            let tags: Vec<String> = detail
                .leading_mover_tags
                .iter()
                .map(|t| t.label().to_string())
                .collect();
            b.push_bind(c.id)
                .push_bind(report_id)
                .push_bind(c.sector_code)
                .push_bind(c.sector_name)
                .push_bind(c.rank)
                .push_bind(&c.record.code)
                .push_bind(&c.record.name)
                .push_bind(c.record.price)
                .push_bind(c.record.change_pct)
                .push_bind(c.record.open_change())
                .push_bind(c.record.score())
                .push_bind(&c.record.signal)
                .push_bind(&c.record.rationale)
                .push_bind(detail.volume_price.volume_level.label())
                .push_bind(detail.strength.strength.label())
                .push_bind(detail.is_weak_to_strong)
                .push_bind(detail.is_leading_mover)
                .push_bind(tags)
                .push_bind(c.record.is_first_limit_up)
                .push_bind(c.record.market_cap)
                .push_bind(c.record.traded_value)
                .push_bind(detail.volume_price.turnover_rate)
                .push_bind(c.unbuyable.is_none())
                .push_bind(c.unbuyable.map(|r| r.label()))
                .push_bind(&c.record_json);
        });

        qb.build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("insert recommended_candidates failed")?;
    }

    tx.commit().await.context("commit transaction failed")?;

    let unbuyable = inserts.iter().filter(|c| c.unbuyable.is_some()).count();
    tracing::info!(
        report_date = %report.report_date,
        %report_id,
        sectors = report.sectors.len(),
        candidates = inserts.len(),
        unbuyable,
        "report saved"
    );
    Ok(report_id)
}

pub async fn fetch_report(
    pool: &sqlx::PgPool,
    report_date: Option<NaiveDate>,
) -> anyhow::Result<Option<StoredReport>> {
    let Some(header) = fetch_header(pool, report_date).await? else {
        return Ok(None);
    };

    let sector_rows = sqlx::query_as::<_, (String, String, f64, i32, i32, Value, Value, Value)>(
        "SELECT sector_code, sector_name, change_pct, up_count, down_count, emotion, quality, history \
         FROM report_sectors \
         WHERE report_id = $1 \
         ORDER BY position ASC",
    )
    .bind(header.report_id)
    .fetch_all(pool)
    .await
    .context("select report_sectors failed")?;

    let candidate_rows =
        sqlx::query_as::<_, (Uuid, String, i32, Option<String>, bool, Option<String>, Value)>(
            "SELECT id, sector_code, rank, role, is_buyable, unbuyable_reason, record \
             FROM recommended_candidates \
             WHERE report_id = $1 \
             ORDER BY sector_code, rank ASC",
        )
        .bind(header.report_id)
        .fetch_all(pool)
        .await
        .context("select recommended_candidates failed")?;

    let mut sectors = Vec::with_capacity(sector_rows.len());
    for (code, name, change_pct, up_count, down_count, emotion, quality, history) in sector_rows {
        let assessment = SectorAssessment {
            emotion: serde_json::from_value(emotion)
                .with_context(|| format!("invalid emotion json for sector {code}"))?,
            quality: serde_json::from_value(quality)
                .with_context(|| format!("invalid quality json for sector {code}"))?,
        };
        let history: SectorHistory = serde_json::from_value(history)
            .with_context(|| format!("invalid history json for sector {code}"))?;

        let mut candidates = Vec::new();
        for (candidate_id, sector_code, rank, role, is_buyable, unbuyable_reason, record) in
            &candidate_rows
        {
            if *sector_code != code {
                continue;
            }
            let record: CandidateRecord = serde_json::from_value(record.clone())
                .with_context(|| format!("invalid candidate record json (id={candidate_id})"))?;
            candidates.push(StoredCandidate {
                candidate_id: *candidate_id,
                rank: *rank,
                role: role.clone(),
                is_buyable: *is_buyable,
                unbuyable_reason: unbuyable_reason.clone(),
                record,
            });
        }

        sectors.push(StoredSector {
            code,
            name,
            change_pct,
            up_count,
            down_count,
            assessment,
            history,
            candidates,
        });
    }

    Ok(Some(StoredReport {
        report_id: header.report_id,
        report_date: header.report_date,
        generated_at: header.generated_at,
        market_change: header.market_change,
        sectors,
    }))
}

async fn fetch_header(
    pool: &sqlx::PgPool,
    report_date: Option<NaiveDate>,
) -> anyhow::Result<Option<ReportHeader>> {
    type HeaderRow = (Uuid, NaiveDate, DateTime<Utc>, f64, i32, i32);

    let row = match report_date {
        Some(d) => {
            sqlx::query_as::<_, HeaderRow>(
                "SELECT id, report_date, generated_at, market_change, sectors_count, candidates_count \
                 FROM reports \
                 WHERE report_date = $1",
            )
            .bind(d)
            .fetch_optional(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, HeaderRow>(
                "SELECT id, report_date, generated_at, market_change, sectors_count, candidates_count \
                 FROM reports \
                 ORDER BY report_date DESC \
                 LIMIT 1",
            )
            .fetch_optional(pool)
            .await?
        }
    };

    Ok(row.map(
        |(report_id, report_date, generated_at, market_change, sectors_count, candidates_count)| {
            ReportHeader {
                report_id,
                report_date,
                generated_at,
                market_change,
                sectors_count,
                candidates_count,
            }
        },
    ))
}

pub async fn list_recent_reports(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<Vec<ReportHeader>> {
    let rows = sqlx::query_as::<_, (Uuid, NaiveDate, DateTime<Utc>, f64, i32, i32)>(
        "SELECT id, report_date, generated_at, market_change, sectors_count, candidates_count \
         FROM reports \
         ORDER BY report_date DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select reports failed")?;

    Ok(rows
        .into_iter()
        .map(
            |(report_id, report_date, generated_at, market_change, sectors_count, candidates_count)| {
                ReportHeader {
                    report_id,
                    report_date,
                    generated_at,
                    market_change,
                    sectors_count,
                    candidates_count,
                }
            },
        )
        .collect())
}

const CANDIDATE_META_COLUMNS: &str = "rc.id AS candidate_id, r.report_date, rc.sector_name AS sector, \
     rc.code, rc.name, rc.role, rc.score, rc.volume_level, rc.strength, rc.is_weak_to_strong, \
     rc.is_leading_mover, rc.recommend_price, rc.change_pct, rc.open_change, rc.is_buyable, \
     rc.unbuyable_reason";

#[derive(sqlx::FromRow)]
struct CandidateMetaRow {
    candidate_id: Uuid,
    report_date: NaiveDate,
    sector: String,
    code: String,
    name: String,
    role: Option<String>,
    score: i32,
    volume_level: String,
    strength: String,
    is_weak_to_strong: bool,
    is_leading_mover: bool,
    recommend_price: f64,
    change_pct: f64,
    open_change: f64,
    is_buyable: bool,
    unbuyable_reason: Option<String>,
}

impl From<CandidateMetaRow> for CandidateMeta {
    fn from(r: CandidateMetaRow) -> Self {
        CandidateMeta {
            candidate_id: r.candidate_id,
            report_date: r.report_date,
            sector: r.sector,
            code: r.code,
            name: r.name,
            role: r.role,
            score: r.score,
            volume_level: r.volume_level,
            strength: r.strength,
            is_weak_to_strong: r.is_weak_to_strong,
            is_leading_mover: r.is_leading_mover,
            recommend_price: r.recommend_price,
            change_pct: r.change_pct,
            open_change: r.open_change,
            is_buyable: r.is_buyable,
            unbuyable_reason: r.unbuyable_reason,
        }
    }
}

#[derive(sqlx::FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    candidate: CandidateMetaRow,
    days_held: Option<i32>,
    return_pct: Option<f64>,
}

/// Candidates reported on or after `since`, newest report first.
pub async fn fetch_candidates_since(
    pool: &sqlx::PgPool,
    since: NaiveDate,
    only_buyable: bool,
) -> anyhow::Result<Vec<CandidateMeta>> {
    let sql = format!(
        "SELECT {CANDIDATE_META_COLUMNS} \
         FROM recommended_candidates rc \
         JOIN reports r ON rc.report_id = r.id \
         WHERE r.report_date >= $1 AND ($2 = FALSE OR rc.is_buyable) \
         ORDER BY r.report_date DESC, rc.sector_code, rc.rank"
    );
    let rows = sqlx::query_as::<_, CandidateMetaRow>(&sql)
        .bind(since)
        .bind(only_buyable)
        .fetch_all(pool)
        .await
        .context("select tracking candidates failed")?;
    Ok(rows.into_iter().map(CandidateMeta::from).collect())
}

/// Unbuyable candidates reported on or after `since`, newest first.
pub async fn fetch_unbuyable_since(
    pool: &sqlx::PgPool,
    since: NaiveDate,
) -> anyhow::Result<Vec<CandidateMeta>> {
    let sql = format!(
        "SELECT {CANDIDATE_META_COLUMNS} \
         FROM recommended_candidates rc \
         JOIN reports r ON rc.report_id = r.id \
         WHERE r.report_date >= $1 AND NOT rc.is_buyable \
         ORDER BY r.report_date DESC, rc.sector_code, rc.rank"
    );
    let rows = sqlx::query_as::<_, CandidateMetaRow>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await
        .context("select unbuyable candidates failed")?;
    Ok(rows.into_iter().map(CandidateMeta::from).collect())
}

/// Candidates left-joined with their observations, for the performance summary.
pub async fn fetch_performance_rows(
    pool: &sqlx::PgPool,
    since: NaiveDate,
    include_unbuyable: bool,
) -> anyhow::Result<Vec<PerformanceRow>> {
    let sql = format!(
        "SELECT {CANDIDATE_META_COLUMNS}, p.days_held, p.return_pct \
         FROM recommended_candidates rc \
         JOIN reports r ON rc.report_id = r.id \
         LEFT JOIN performance p ON p.candidate_id = rc.id \
         WHERE r.report_date >= $1 AND ($2 OR rc.is_buyable) \
         ORDER BY r.report_date, rc.sector_code, rc.rank, p.days_held"
    );
    let rows = sqlx::query_as::<_, JoinedRow>(&sql)
        .bind(since)
        .bind(include_unbuyable)
        .fetch_all(pool)
        .await
        .context("select performance rows failed")?;

    Ok(rows
        .into_iter()
        .map(|row| PerformanceRow {
            observation: match (row.days_held, row.return_pct) {
                (Some(days_held), Some(return_pct)) => Some(Observation {
                    days_held,
                    return_pct,
                }),
                _ => None,
            },
            candidate: row.candidate.into(),
        })
        .collect())
}

/// Most recent recommendations of one instrument.
pub async fn fetch_candidate_history(
    pool: &sqlx::PgPool,
    code: &str,
    limit: i64,
) -> anyhow::Result<Vec<CandidateMeta>> {
    let sql = format!(
        "SELECT {CANDIDATE_META_COLUMNS} \
         FROM recommended_candidates rc \
         JOIN reports r ON rc.report_id = r.id \
         WHERE rc.code = $1 \
         ORDER BY r.report_date DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, CandidateMetaRow>(&sql)
        .bind(code)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("select candidate history failed")?;
    Ok(rows.into_iter().map(CandidateMeta::from).collect())
}
