//! The tracking-plan view: four independent sub-queries composed into one
//! response. Sub-queries are issued concurrently and joined; any failure
//! fails the whole view — there is no partial-result merging.

use anyhow::Result;

use trackhealth_core::health::{
    OccurrenceDetailRow, PageRequest, Pagination, TrackingPlanRow, TrackingPlanStats,
    TrackingPlanView, TrackingStatus,
};
use trackhealth_core::window::DateWindow;

use crate::backend::parse_name_list;
use crate::queries::{safe_pct, series, window_bounds};
use crate::DuckDbBackend;

/// Per-expected-event-name rollup.
///
/// Sort policy (in SQL, matching the view contract): error-rate >= 10%
/// bucket first, then > 0%, then clean; within each bucket, total volume
/// descending.
pub async fn rollup_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    event_filter: Option<&str>,
) -> Result<Vec<TrackingPlanRow>> {
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
            SELECT DISTINCT
                occurrence_key,
                expected_event_name,
                date,
                has_missing_params,
                is_missing_in_source
            FROM occurrences
            WHERE date BETWEEN ?1 AND ?2
              {filter_sql}
        )
        SELECT
            expected_event_name,
            COUNT(DISTINCT occurrence_key) AS total_events,
            COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) AS events_with_errors,
            COUNT(DISTINCT CASE WHEN is_missing_in_source THEN occurrence_key END) AS missing_in_source,
            CAST(MIN(date) AS VARCHAR) AS first_date,
            CAST(MAX(date) AS VARCHAR) AS last_date,
            CAST(MIN(CASE WHEN has_missing_params THEN date END) AS VARCHAR) AS first_error_date,
            CAST(MAX(CASE WHEN has_missing_params THEN date END) AS VARCHAR) AS last_error_date
        FROM deduplicated
        GROUP BY expected_event_name
        ORDER BY
            CASE
                WHEN COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) * 100.0
                     / COUNT(DISTINCT occurrence_key) >= 10 THEN 1
                WHEN COUNT(DISTINCT CASE WHEN has_missing_params THEN occurrence_key END) > 0 THEN 2
                ELSE 3
            END,
            total_events DESC
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
            row.get::<_, i64>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut plan = Vec::new();
    for row in rows {
        let (
            expected_event_name,
            total_events,
            events_with_errors,
            missing_in_source,
            first_date,
            last_date,
            first_error_date,
            last_error_date,
        ) = row?;
        let error_percentage = safe_pct(events_with_errors, total_events);
        plan.push(TrackingPlanRow {
            expected_event_name,
            total_events,
            events_with_errors,
            missing_in_source,
            error_percentage,
            first_date,
            last_date,
            first_error_date,
            last_error_date,
            status: TrackingStatus::from_percentage(error_percentage),
        });
    }
    Ok(plan)
}

/// Distinct count of error occurrences matching the window and filter.
/// Drives pagination — the detail query below is LIMIT/OFFSET bounded and
/// cannot supply a total.
pub async fn total_errors_count_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    event_filter: Option<&str>,
) -> Result<i64> {
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
        "SELECT COUNT(DISTINCT occurrence_key) FROM occurrences \
         WHERE date BETWEEN ?1 AND ?2 {filter_sql} AND has_missing_params"
    );
    let param_refs: Vec<&dyn duckdb::types::ToSql> =
        filter_params.iter().map(|p| p.as_ref()).collect();
    let total: i64 = conn
        .prepare(&sql)?
        .query_row(param_refs.as_slice(), |row| row.get(0))?;
    Ok(total)
}

/// One page of detail rows: error rows before clean rows, then newest
/// first. Deduplicated with `SELECT DISTINCT` like every other read.
pub async fn detail_page_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    event_filter: Option<&str>,
    page: &PageRequest,
) -> Result<Vec<OccurrenceDetailRow>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);

    let mut filter_sql = String::new();
    let mut filter_params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    filter_params.push(Box::new(start));
    filter_params.push(Box::new(end));
    let mut param_idx = 3;
    if let Some(event) = event_filter {
        filter_sql.push_str(&format!(" AND expected_event_name = ?{param_idx}"));
        filter_params.push(Box::new(event.to_string()));
        param_idx += 1;
    }
    let limit_idx = param_idx;
    let offset_idx = param_idx + 1;
    filter_params.push(Box::new(i64::from(page.page_size)));
    filter_params.push(Box::new(page.offset()));

    // occurrence_key stays in the projection: distinct occurrences can
    // share every attribute value, and collapsing them would desync the
    // detail page from the distinct-key pagination count.
    let sql = format!(
        r#"
        SELECT DISTINCT
            occurrence_key,
            CAST(date AS VARCHAR) AS date,
            strftime(event_timestamp, '%Y-%m-%dT%H:%M:%S') AS event_timestamp,
            expected_event_name,
            event_name,
            device_category,
            device_os,
            device_browser,
            page_location,
            session_id,
            has_missing_params,
            missing_event_params,
            missing_user_params,
            missing_item_params,
            missing_ecommerce_params
        FROM occurrences
        WHERE date BETWEEN ?1 AND ?2
          {filter_sql}
        ORDER BY
            CASE WHEN has_missing_params THEN 0 ELSE 1 END,
            event_timestamp DESC
        LIMIT ?{limit_idx} OFFSET ?{offset_idx}
        "#
    );

    let param_refs: Vec<&dyn duckdb::types::ToSql> =
        filter_params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(OccurrenceDetailRow {
            occurrence_key: row.get(0)?,
            date: row.get(1)?,
            event_timestamp: row.get(2)?,
            expected_event_name: row.get(3)?,
            event_name: row.get(4)?,
            device_category: row.get(5)?,
            device_os: row.get(6)?,
            device_browser: row.get(7)?,
            page_location: row.get(8)?,
            session_id: row.get(9)?,
            has_missing_params: row.get(10)?,
            missing_event_params: parse_name_list(row.get(11)?),
            missing_user_params: parse_name_list(row.get(12)?),
            missing_item_params: parse_name_list(row.get(13)?),
            missing_ecommerce_params: parse_name_list(row.get(14)?),
        })
    })?;

    let mut details = Vec::new();
    for row in rows {
        details.push(row?);
    }
    Ok(details)
}

/// Compose the full tracking-plan view.
///
/// The four sub-queries share the same window and filter and have no
/// ordering dependency, so they are issued concurrently and joined.
/// Derived totals come from the already-fetched rollup rather than a
/// fifth query.
pub async fn get_tracking_plan_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    event_filter: Option<&str>,
    page: &PageRequest,
) -> Result<TrackingPlanView> {
    let (tracking_plan, chart_data, total_errors_count, events_detail) = tokio::try_join!(
        rollup_inner(db, window, event_filter),
        series::daily_health_series_inner(db, window, event_filter),
        total_errors_count_inner(db, window, event_filter),
        detail_page_inner(db, window, event_filter, page),
    )?;

    let total_events: i64 = tracking_plan.iter().map(|r| r.total_events).sum();
    let total_errors: i64 = tracking_plan.iter().map(|r| r.events_with_errors).sum();
    let stats = TrackingPlanStats {
        total_events,
        total_errors,
        error_rate: safe_pct(total_errors, total_events),
        events_with_errors: tracking_plan
            .iter()
            .filter(|r| r.events_with_errors > 0)
            .count(),
        total_event_types: tracking_plan.len(),
        total_errors_count,
    };

    Ok(TrackingPlanView {
        tracking_plan,
        chart_data,
        events_detail,
        stats,
        pagination: Pagination::new(page, total_errors_count),
    })
}
