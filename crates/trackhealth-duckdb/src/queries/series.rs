use std::collections::{BTreeMap, HashMap};

use anyhow::Result;

use trackhealth_core::anomaly::DailyCount;
use trackhealth_core::health::DailyHealthPoint;
use trackhealth_core::window::DateWindow;

use crate::queries::{safe_pct, window_bounds};
use crate::DuckDbBackend;

/// Daily health chart series, zero-filled: exactly one point per calendar
/// day in the window, days with no occurrences reported as zeros.
pub async fn daily_health_series_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    event_filter: Option<&str>,
) -> Result<Vec<DailyHealthPoint>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut filter_sql = String::new();
    let mut filter_params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    filter_params.push(Box::new(start));
    filter_params.push(Box::new(end));
    if let Some(event) = event_filter {
        filter_sql.push_str(" AND expected_event_name = ?3");
        filter_params.push(Box::new(event.to_string()));
    }

    let sql = format!(
        r#"
        WITH deduplicated AS (
            SELECT DISTINCT occurrence_key, date, has_missing_params
            FROM occurrences
            WHERE date BETWEEN ?1 AND ?2
              {filter_sql}
        )
        SELECT
            CAST(date AS VARCHAR) AS day,
            COUNT(DISTINCT occurrence_key) AS total_events,
            COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) AS with_missing
        FROM deduplicated
        GROUP BY day
        ORDER BY day
        "#
    );

    let param_refs: Vec<&dyn duckdb::types::ToSql> =
        filter_params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut by_day: HashMap<String, (i64, i64)> = HashMap::new();
    for row in rows {
        let (day, total, with_missing) = row?;
        by_day.insert(day, (total, with_missing));
    }

    Ok(window
        .days()
        .map(|date| {
            let key = date.format("%Y-%m-%d").to_string();
            let (total, with_missing) = by_day.get(&key).copied().unwrap_or((0, 0));
            DailyHealthPoint {
                date: key,
                total_events: total,
                events_with_missing_params: with_missing,
                pct_events_with_missing_params: safe_pct(with_missing, total),
            }
        })
        .collect())
}

/// Dense daily occurrence-count series per observed event name.
///
/// Every event name seen in the window gets exactly one point per
/// calendar day, zero-filled, so the anomaly scorer never sees gaps.
/// `BTreeMap` keeps event names in a stable order for deterministic
/// downstream output.
pub async fn daily_counts_by_event_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
) -> Result<BTreeMap<String, Vec<DailyCount>>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut stmt = conn.prepare(
        r#"
        WITH deduplicated AS (
            SELECT DISTINCT occurrence_key, event_name, date
            FROM occurrences
            WHERE date BETWEEN ?1 AND ?2
        )
        SELECT
            event_name,
            CAST(date AS VARCHAR) AS day,
            COUNT(DISTINCT occurrence_key) AS events_count
        FROM deduplicated
        GROUP BY event_name, day
        ORDER BY event_name, day
        "#,
    )?;

    let rows = stmt.query_map(duckdb::params![start, end], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut counts: HashMap<String, HashMap<String, i64>> = HashMap::new();
    for row in rows {
        let (event_name, day, count) = row?;
        counts.entry(event_name).or_default().insert(day, count);
    }

    let mut series = BTreeMap::new();
    for (event_name, by_day) in counts {
        let dense: Vec<DailyCount> = window
            .days()
            .map(|date| {
                let key = date.format("%Y-%m-%d").to_string();
                DailyCount {
                    count: by_day.get(&key).copied().unwrap_or(0),
                    date: key,
                }
            })
            .collect();
        series.insert(event_name, dense);
    }
    Ok(series)
}
