//! The realtime snapshot: raw feed plus the health panels computed over
//! the morning/afternoon realtime window. All sub-queries share one
//! window derived from a single captured instant.

use anyhow::Result;
use chrono::NaiveDateTime;

use trackhealth_core::health::{RealtimeEventRow, RealtimeSnapshot};
use trackhealth_core::occurrence::ParamCategory;
use trackhealth_core::window::{realtime_window, DateWindow};

use crate::backend::parse_name_list;
use crate::queries::{event_stats, pages, params, window_bounds};
use crate::DuckDbBackend;

/// Most recent occurrences kept in the raw feed.
const RECENT_EVENTS_LIMIT: i64 = 500;

/// Raw occurrence feed for the realtime window, newest first.
pub async fn recent_events_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
) -> Result<Vec<RealtimeEventRow>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut stmt = conn.prepare(
        r#"
        SELECT DISTINCT
            occurrence_key,
            expected_event_name,
            event_name,
            strftime(event_timestamp, '%Y-%m-%dT%H:%M:%S') AS ts,
            CAST(EXTRACT(hour FROM event_timestamp) AS BIGINT) AS hour,
            page_location,
            has_missing_params,
            missing_event_params,
            missing_user_params,
            missing_item_params,
            missing_ecommerce_params
        FROM occurrences
        WHERE date BETWEEN ?1 AND ?2
        ORDER BY ts DESC
        LIMIT ?3
        "#,
    )?;

    let rows = stmt.query_map(duckdb::params![start, end, RECENT_EVENTS_LIMIT], |row| {
        Ok(RealtimeEventRow {
            occurrence_key: row.get(0)?,
            expected_event_name: row.get(1)?,
            event_name: row.get(2)?,
            event_timestamp: row.get(3)?,
            hour: row.get(4)?,
            page_location: row.get(5)?,
            has_missing_params: row.get(6)?,
            missing_event_params: parse_name_list(row.get(7)?),
            missing_user_params: parse_name_list(row.get(8)?),
            missing_item_params: parse_name_list(row.get(9)?),
            missing_ecommerce_params: parse_name_list(row.get(10)?),
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Compose the realtime snapshot. The six sub-queries are independent
/// reads over the same window; issue them concurrently and join.
/// `panel_top_n` (from `Config.realtime_top_n`) bounds every health panel.
pub async fn get_realtime_snapshot_inner(
    db: &DuckDbBackend,
    now_local: NaiveDateTime,
    panel_top_n: usize,
) -> Result<RealtimeSnapshot> {
    let window = realtime_window(now_local);

    let (events, event_stats, page_stats, event_params, user_params, item_params) = tokio::try_join!(
        recent_events_inner(db, &window),
        event_stats::event_stats_inner(db, &window, panel_top_n as i64),
        pages::page_stats_inner(db, &window, panel_top_n as i64),
        params::missing_param_panel_inner(db, &window, ParamCategory::Event, panel_top_n),
        params::missing_param_panel_inner(db, &window, ParamCategory::User, panel_top_n),
        params::missing_param_panel_inner(db, &window, ParamCategory::Item, panel_top_n),
    )?;

    let (start, end) = window_bounds(&window);
    Ok(RealtimeSnapshot {
        window: [start, end],
        events,
        event_stats,
        page_stats,
        event_params,
        user_params,
        item_params,
    })
}
