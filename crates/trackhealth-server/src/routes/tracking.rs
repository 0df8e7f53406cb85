use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use trackhealth_core::health::{HealthBackend, PageRequest};
use trackhealth_core::window::DEFAULT_HISTORY_DAYS;

use crate::{
    cache::TrackingPlanKey,
    error::AppError,
    routes::{resolve_window, RangeQuery},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TrackingQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Scopes every sub-query (rollup, chart, detail, count) to one
    /// expected event name. Empty string means no filter.
    pub event: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// `GET /api/tracking` — the full tracking-plan view: rollup, zero-filled
/// chart series, paginated error detail, and derived totals.
pub async fn get_tracking_plan(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrackingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = chrono::Utc::now().with_timezone(&state.tz).date_naive();
    let range = RangeQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let window = resolve_window(&range, today, DEFAULT_HISTORY_DAYS)?;

    let event = query.event.filter(|e| !e.is_empty());
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(state.config.default_page_size),
    )?;

    let key = TrackingPlanKey {
        start: window.start,
        end: window.end,
        event: event.clone(),
        page: page.page,
        page_size: page.page_size,
    };
    let db = Arc::clone(&state.db);
    let view = state
        .tracking_cache
        .read_through(key, move || async move {
            db.get_tracking_plan(&window, event.as_deref(), &page).await
        })
        .await?;

    Ok(Json(json!({ "data": view })))
}
