use anyhow::Result;

use trackhealth_core::health::PageHealthRow;
use trackhealth_core::window::DateWindow;

use crate::queries::{safe_pct, window_bounds};
use crate::DuckDbBackend;

/// Worst-offender page locations: distinct hits and errors per page,
/// ranked by error percentage. The `HAVING` clause keeps pages with zero
/// error occurrences out of the view entirely.
pub async fn page_stats_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    limit: i64,
) -> Result<Vec<PageHealthRow>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut stmt = conn.prepare(
        r#"
        WITH deduplicated AS (
            SELECT DISTINCT occurrence_key, page_location, has_missing_params
            FROM occurrences
            WHERE date BETWEEN ?1 AND ?2
              AND page_location IS NOT NULL
        )
        SELECT
            page_location,
            COUNT(DISTINCT occurrence_key) AS hits,
            COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) AS errors
        FROM deduplicated
        GROUP BY page_location
        HAVING COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) > 0
        ORDER BY CAST(COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) AS DOUBLE)
                 / COUNT(DISTINCT occurrence_key) DESC
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
        let (page_location, hits, errors) = row?;
        stats.push(PageHealthRow {
            page_location,
            hits,
            errors,
            error_percentage: safe_pct(errors, hits),
        });
    }
    Ok(stats)
}
