use crate::domain::market::SectorDailyRow;
use crate::ingest::types::HotSector;
use anyhow::Context;
use chrono::NaiveDate;

pub async fn upsert_sector_daily(
    pool: &sqlx::PgPool,
    trade_date: NaiveDate,
    sectors: &[HotSector],
) -> anyhow::Result<u64> {
    if sectors.is_empty() {
        return Ok(0);
    }

    let chunk_size: usize = std::env::var("SECTOR_DAILY_UPSERT_BATCH")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(200);
    anyhow::ensure!(chunk_size >= 1, "SECTOR_DAILY_UPSERT_BATCH must be >= 1");

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let mut affected: u64 = 0;
    for (batch_idx, chunk) in sectors.chunks(chunk_size).enumerate() {
        let t0 = std::time::Instant::now();
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO sector_daily (sector_code, trade_date, sector_name, change_pct, net_inflow, up_count, down_count) ",
        );
        qb.push_values(chunk, |mut b, s| {
            b.push_bind(s.sector.code.trim())
                .push_bind(trade_date)
                .push_bind(s.sector.name.trim())
                .push_bind(s.sector.change_pct)
                .push_bind(s.net_inflow)
                .push_bind(s.sector.up_count as i32)
                .push_bind(s.sector.down_count as i32);
        });
        qb.push(
            " ON CONFLICT (sector_code, trade_date) DO UPDATE \
               SET sector_name = EXCLUDED.sector_name, change_pct = EXCLUDED.change_pct, \
                   net_inflow = EXCLUDED.net_inflow, up_count = EXCLUDED.up_count, \
                   down_count = EXCLUDED.down_count, updated_at = now()",
        );

        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("batch upsert sector_daily failed")?;
        affected += res.rows_affected();

        tracing::debug!(
            %trade_date,
            batch_idx = batch_idx + 1,
            batch_size = chunk.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "sector_daily batch upsert"
        );
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(affected)
}

/// Latest `limit` stored days of a sector up to and including `until`, oldest first.
pub async fn fetch_sector_history(
    pool: &sqlx::PgPool,
    sector_code: &str,
    until: NaiveDate,
    limit: i64,
) -> anyhow::Result<Vec<SectorDailyRow>> {
    let rows = sqlx::query_as::<_, (NaiveDate, f64, f64)>(
        "SELECT trade_date, change_pct, net_inflow \
         FROM sector_daily \
         WHERE sector_code = $1 AND trade_date <= $2 \
         ORDER BY trade_date DESC \
         LIMIT $3",
    )
    .bind(sector_code)
    .bind(until)
    .bind(limit)
    .fetch_all(pool)
    .await
    .with_context(|| format!("select sector_daily failed (sector={sector_code})"))?;

    let mut out: Vec<SectorDailyRow> = rows
        .into_iter()
        .map(|(trade_date, change_pct, net_inflow)| SectorDailyRow {
            trade_date,
            change_pct,
            net_inflow,
        })
        .collect();
    out.reverse();
    Ok(out)
}
