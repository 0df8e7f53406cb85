use anyhow::Result;

use trackhealth_core::health::DashboardMetrics;
use trackhealth_core::window::DateWindow;

use crate::queries::{safe_pct, window_bounds};
use crate::DuckDbBackend;

/// Dashboard-wide dedup totals for one window.
///
/// A `SELECT DISTINCT` CTE collapses duplicate deliveries first, then all
/// counts are distinct-by-occurrence-key. Zero rows is a valid result:
/// every count is 0, the error rate is exactly 0.0, and the date bounds
/// are absent.
pub async fn dashboard_metrics_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
) -> Result<DashboardMetrics> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut stmt = conn.prepare(
        r#"
        WITH deduplicated AS (
            SELECT DISTINCT occurrence_key, has_missing_params, user_pseudo_id, date
            FROM occurrences
            WHERE date BETWEEN ?1 AND ?2
        )
        SELECT
            COUNT(DISTINCT occurrence_key) AS total_events,
            COUNT(DISTINCT CASE WHEN NOT has_missing_params THEN occurrence_key END) AS good_events,
            COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) AS error_events,
            COUNT(DISTINCT user_pseudo_id) AS unique_users,
            CAST(MIN(date) AS VARCHAR) AS min_date,
            CAST(MAX(date) AS VARCHAR) AS max_date
        FROM deduplicated
        "#,
    )?;

    let row = stmt.query_row(duckdb::params![start, end], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let (total_events, good_events, error_events, unique_users, min_date, max_date) = row;
    Ok(DashboardMetrics {
        total_events,
        good_events,
        error_events,
        unique_users,
        error_rate: safe_pct(error_events, total_events),
        min_date,
        max_date,
    })
}
