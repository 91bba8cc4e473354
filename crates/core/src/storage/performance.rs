use crate::domain::performance::PerformanceRecord;
use anyhow::Context;

/// Idempotent per `(candidate_id, track_date)`; a re-run overwrites the price and return.
pub async fn upsert_performance(
    pool: &sqlx::PgPool,
    records: &[PerformanceRecord],
) -> anyhow::Result<u64> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let t0 = std::time::Instant::now();
    let mut qb = sqlx::QueryBuilder::new(
        "INSERT INTO performance (candidate_id, track_date, days_held, current_price, return_pct, is_trading_day) ",
    );
    qb.push_values(records, |mut b, r| {
        b.push_bind(r.candidate_id)
            .push_bind(r.track_date)
            .push_bind(r.days_held)
            .push_bind(r.current_price)
            .push_bind(r.return_pct)
            .push_bind(r.is_trading_day);
    });
    qb.push(
        " ON CONFLICT (candidate_id, track_date) DO UPDATE \
           SET days_held = EXCLUDED.days_held, current_price = EXCLUDED.current_price, \
               return_pct = EXCLUDED.return_pct, is_trading_day = EXCLUDED.is_trading_day",
    );

    let res = qb
        .build()
        .persistent(false)
        .execute(&mut *tx)
        .await
        .context("batch upsert performance failed")?;

    tx.commit().await.context("commit transaction failed")?;

    tracing::debug!(
        rows = records.len(),
        elapsed_ms = t0.elapsed().as_millis(),
        "performance upsert"
    );
    Ok(res.rows_affected())
}
