use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use trackhealth_core::health::HealthBackend;

use crate::{error::AppError, state::AppState};

/// `GET /api/realtime` — raw recent occurrences plus health panels over
/// the realtime window (mornings span yesterday+today, afternoons today
/// only, evaluated in the configured timezone).
///
/// Never cached: the whole point is a live read.
pub async fn get_realtime(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    // One clock read; every boundary downstream derives from it.
    let now_local = chrono::Utc::now().with_timezone(&state.tz).naive_local();
    let snapshot = state
        .db
        .get_realtime_snapshot(now_local, state.config.realtime_top_n)
        .await?;

    Ok(Json(json!({ "data": snapshot })))
}
