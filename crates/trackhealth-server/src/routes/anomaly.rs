use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use trackhealth_core::health::HealthBackend;
use trackhealth_core::window::DEFAULT_ANOMALY_DAYS;

use crate::{
    cache::RangeKey,
    error::AppError,
    routes::{resolve_window, RangeQuery},
    state::AppState,
};

/// `GET /api/anomaly` — per-event daily volumes scored with the modified
/// z-score over the window (default: last 7 days). Scores are computed
/// fresh on each cache miss, never persisted.
pub async fn get_anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = chrono::Utc::now().with_timezone(&state.tz).date_naive();
    let window = resolve_window(&query, today, DEFAULT_ANOMALY_DAYS)?;

    let key = RangeKey {
        start: window.start,
        end: window.end,
    };
    let db = Arc::clone(&state.db);
    let threshold = state.config.anomaly_threshold;
    let records = state
        .anomaly_cache
        .read_through(key, move || async move {
            db.get_event_anomalies(&window, threshold).await
        })
        .await?;

    Ok(Json(json!({ "data": records })))
}
