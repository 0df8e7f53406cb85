use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use trackhealth_core::health::HealthBackend;
use trackhealth_core::window::DEFAULT_HISTORY_DAYS;

use crate::{
    cache::RangeKey,
    error::AppError,
    routes::{resolve_window, RangeQuery},
    state::AppState,
};

/// `GET /api/dashboard` — dedup metrics, per-event stats, and the
/// missing-parameter breakdown for a date window (default: last 30 days).
///
/// Served stale-while-revalidate: a cached window returns immediately and
/// refreshes in the background.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = chrono::Utc::now().with_timezone(&state.tz).date_naive();
    let window = resolve_window(&query, today, DEFAULT_HISTORY_DAYS)?;

    let key = RangeKey {
        start: window.start,
        end: window.end,
    };
    let db = Arc::clone(&state.db);
    let top_n = state.config.param_top_n;
    let view = state
        .dashboard_cache
        .read_through(key, move || async move {
            db.get_dashboard_metrics(&window, top_n).await
        })
        .await?;

    Ok(Json(json!({ "data": view })))
}
