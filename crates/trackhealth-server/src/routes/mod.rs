pub mod anomaly;
pub mod dashboard;
pub mod health;
pub mod realtime;
pub mod tracking;

use chrono::NaiveDate;
use serde::Deserialize;

use trackhealth_core::window::DateWindow;

use crate::error::AppError;

/// Query parameters shared by the range-scoped endpoints.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("{field} must be YYYY-MM-DD, got {raw:?}")))
}

/// Resolve optional `start_date`/`end_date` against a captured "today".
///
/// The endpoints are all-or-nothing: a lone endpoint is rejected rather
/// than silently paired with a default.
pub(crate) fn resolve_window(
    query: &RangeQuery,
    today: NaiveDate,
    default_days: i64,
) -> Result<DateWindow, AppError> {
    let explicit = match (query.start_date.as_deref(), query.end_date.as_deref()) {
        (Some(s), Some(e)) => Some((parse_date("start_date", s)?, parse_date("end_date", e)?)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "start_date and end_date must be provided together".to_string(),
            ))
        }
    };
    Ok(DateWindow::resolve(explicit, today, default_days)?)
}
