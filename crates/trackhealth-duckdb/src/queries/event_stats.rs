use anyhow::Result;

use trackhealth_core::health::EventStatRow;
use trackhealth_core::window::DateWindow;

use crate::queries::{safe_pct, window_bounds};
use crate::DuckDbBackend;

/// Per-observed-event-name rollup: distinct hits, distinct error hits,
/// error percentage. Ordered by volume descending, limited to `limit`.
pub async fn event_stats_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    limit: i64,
) -> Result<Vec<EventStatRow>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut stmt = conn.prepare(
        r#"
        WITH deduplicated AS (
            SELECT DISTINCT occurrence_key, event_name, has_missing_params
            FROM occurrences
            WHERE date BETWEEN ?1 AND ?2
        )
        SELECT
            event_name,
            COUNT(DISTINCT occurrence_key) AS hits,
            COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) AS hits_with_errors
        FROM deduplicated
        GROUP BY event_name
        ORDER BY hits DESC
        LIMIT ?3
        "#,
    )?;

    let rows = stmt.query_map(duckdb::params![start, end, limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut stats = Vec::new();
    for row in rows {
        let (event_name, hits, hits_with_errors) = row?;
        stats.push(EventStatRow {
            event_name,
            hits,
            hits_with_errors,
            error_percentage: safe_pct(hits_with_errors, hits),
        });
    }
    Ok(stats)
}
