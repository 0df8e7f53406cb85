//! Health-backend abstraction and the view types it returns.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::anomaly::AnomalyStatus;
use crate::error::HealthError;
use crate::occurrence::{Occurrence, ParamCategory};
use crate::window::DateWindow;

/// A validated 1-based pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, HealthError> {
        if page < 1 {
            return Err(HealthError::InvalidPagination(
                "page must be >= 1".to_string(),
            ));
        }
        if page_size < 1 {
            return Err(HealthError::InvalidPagination(
                "page_size must be >= 1".to_string(),
            ));
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

/// Pagination metadata derived from a separate total-count query, never
/// from the length of the returned detail page (which is LIMIT/OFFSET
/// bounded).
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, total_items: i64) -> Self {
        let page_size = i64::from(request.page_size);
        let total_pages = ((total_items + page_size - 1) / page_size).max(1);
        Self {
            current_page: request.page,
            page_size: request.page_size,
            total_items,
            total_pages,
            has_next_page: i64::from(request.page) < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

/// Dashboard-wide dedup totals.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub total_events: i64,
    pub good_events: i64,
    pub error_events: i64,
    pub unique_users: i64,
    /// `error_events / total_events * 100`; exactly 0.0 when no data.
    pub error_rate: f64,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
}

/// Per-observed-event-name dedup rollup.
#[derive(Debug, Clone, Serialize)]
pub struct EventStatRow {
    pub event_name: String,
    pub hits: i64,
    pub hits_with_errors: i64,
    pub error_percentage: f64,
}

/// Severity bucket for a missing parameter, by missing percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStatus {
    Critical,
    Attention,
    Warning,
    Good,
}

impl ParamStatus {
    /// Thresholds: critical >= 50%, attention >= 10%, warning > 0%.
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 50.0 {
            ParamStatus::Critical
        } else if pct >= 10.0 {
            ParamStatus::Attention
        } else if pct > 0.0 {
            ParamStatus::Warning
        } else {
            ParamStatus::Good
        }
    }
}

/// One (parameter name, category) pair in the dashboard breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterAnalysisRow {
    pub param_name: String,
    pub param_type: ParamCategory,
    /// Distinct occurrences missing this parameter.
    pub events_with_missing_param: i64,
    /// Distinct occurrences in the window (the percentage denominator).
    pub total_events: i64,
    pub missing_percentage: f64,
    pub status: ParamStatus,
}

/// One row of a per-category realtime parameter panel.
#[derive(Debug, Clone, Serialize)]
pub struct MissingParamRow {
    pub param_name: String,
    pub missing_count: i64,
    pub missing_percentage: f64,
}

/// Page locations ranked by error share. Pages with zero error
/// occurrences never appear.
#[derive(Debug, Clone, Serialize)]
pub struct PageHealthRow {
    pub page_location: String,
    pub hits: i64,
    pub errors: i64,
    pub error_percentage: f64,
}

/// One day of the health chart series. Dense: one point per calendar day
/// in the window, zero-filled.
#[derive(Debug, Clone, Serialize)]
pub struct DailyHealthPoint {
    pub date: String,
    pub total_events: i64,
    pub events_with_missing_params: i64,
    pub pct_events_with_missing_params: f64,
}

/// The composed dashboard view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub metrics: DashboardMetrics,
    pub event_stats: Vec<EventStatRow>,
    pub parameters_analysis: Vec<ParameterAnalysisRow>,
}

/// One (event type, day) anomaly score. Computed fresh per query, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRecord {
    pub analyzed_at: String,
    pub event_date: String,
    pub event_name: String,
    pub events_count: i64,
    pub median_value: f64,
    pub mad_value: f64,
    pub mad_score: f64,
    pub status: AnomalyStatus,
}

/// One raw occurrence in the realtime feed.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeEventRow {
    pub occurrence_key: String,
    pub expected_event_name: String,
    pub event_name: String,
    pub event_timestamp: String,
    pub hour: i64,
    pub page_location: Option<String>,
    pub has_missing_params: bool,
    pub missing_event_params: Vec<String>,
    pub missing_user_params: Vec<String>,
    pub missing_item_params: Vec<String>,
    pub missing_ecommerce_params: Vec<String>,
}

/// The composed realtime view: raw feed plus the health panels the
/// realtime window supports.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeSnapshot {
    /// `[start, end]` of the realtime window, `%Y-%m-%d`.
    pub window: [String; 2],
    pub events: Vec<RealtimeEventRow>,
    pub event_stats: Vec<EventStatRow>,
    pub page_stats: Vec<PageHealthRow>,
    pub event_params: Vec<MissingParamRow>,
    pub user_params: Vec<MissingParamRow>,
    pub item_params: Vec<MissingParamRow>,
}

/// Tracking-plan row status by error percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackingStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

impl TrackingStatus {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 10.0 {
            TrackingStatus::Error
        } else if pct > 0.0 {
            TrackingStatus::Warning
        } else {
            TrackingStatus::Ok
        }
    }
}

/// Per-expected-event-name rollup of the tracking plan.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingPlanRow {
    pub expected_event_name: String,
    pub total_events: i64,
    pub events_with_errors: i64,
    pub missing_in_source: i64,
    pub error_percentage: f64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub first_error_date: Option<String>,
    pub last_error_date: Option<String>,
    pub status: TrackingStatus,
}

/// One paginated detail row.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceDetailRow {
    pub occurrence_key: String,
    pub date: String,
    pub event_timestamp: String,
    pub expected_event_name: String,
    pub event_name: String,
    pub device_category: Option<String>,
    pub device_os: Option<String>,
    pub device_browser: Option<String>,
    pub page_location: Option<String>,
    pub session_id: Option<String>,
    pub has_missing_params: bool,
    pub missing_event_params: Vec<String>,
    pub missing_user_params: Vec<String>,
    pub missing_item_params: Vec<String>,
    pub missing_ecommerce_params: Vec<String>,
}

/// Derived totals, computed from the already-fetched rollup rather than
/// an extra query.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingPlanStats {
    pub total_events: i64,
    pub total_errors: i64,
    pub error_rate: f64,
    pub events_with_errors: usize,
    pub total_event_types: usize,
    pub total_errors_count: i64,
}

/// The composed tracking-plan view. Owned by the request that produced
/// it; immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingPlanView {
    pub tracking_plan: Vec<TrackingPlanRow>,
    pub chart_data: Vec<DailyHealthPoint>,
    pub events_detail: Vec<OccurrenceDetailRow>,
    pub stats: TrackingPlanStats,
    pub pagination: Pagination,
}

/// The warehouse-backed health query surface.
///
/// All aggregate operations count distinct occurrence keys; zero matching
/// rows is a valid result yielding zero-valued metrics, not an error.
#[async_trait::async_trait]
pub trait HealthBackend: Send + Sync + 'static {
    async fn insert_occurrences(&self, rows: &[Occurrence]) -> Result<(), HealthError>;

    async fn get_dashboard_metrics(
        &self,
        window: &DateWindow,
        param_top_n: usize,
    ) -> Result<DashboardView, HealthError>;

    async fn get_event_anomalies(
        &self,
        window: &DateWindow,
        threshold: f64,
    ) -> Result<Vec<AnomalyRecord>, HealthError>;

    /// `now_local` is the request instant already localized to the
    /// configured timezone; the realtime window derives from it alone.
    /// `panel_top_n` bounds each health panel in the snapshot.
    async fn get_realtime_snapshot(
        &self,
        now_local: NaiveDateTime,
        panel_top_n: usize,
    ) -> Result<RealtimeSnapshot, HealthError>;

    async fn get_tracking_plan(
        &self,
        window: &DateWindow,
        event_filter: Option<&str>,
        page: &PageRequest,
    ) -> Result<TrackingPlanView, HealthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_scenario_page_3_of_25() {
        let req = PageRequest::new(3, 10).unwrap();
        let p = Pagination::new(&req, 25);
        assert_eq!(p.total_pages, 3);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);
        assert_eq!(p.total_items, 25);
    }

    #[test]
    fn pagination_empty_result_still_has_one_page() {
        let req = PageRequest::new(1, 10).unwrap();
        let p = Pagination::new(&req, 0);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next_page);
        assert!(!p.has_prev_page);
    }

    #[test]
    fn page_request_rejects_zero() {
        assert!(matches!(
            PageRequest::new(0, 10),
            Err(HealthError::InvalidPagination(_))
        ));
        assert!(matches!(
            PageRequest::new(1, 0),
            Err(HealthError::InvalidPagination(_))
        ));
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageRequest::new(1, 10).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 10).unwrap().offset(), 20);
    }

    #[test]
    fn tracking_status_buckets() {
        assert_eq!(TrackingStatus::from_percentage(0.0), TrackingStatus::Ok);
        assert_eq!(TrackingStatus::from_percentage(5.0), TrackingStatus::Warning);
        assert_eq!(TrackingStatus::from_percentage(10.0), TrackingStatus::Error);
    }

    #[test]
    fn param_status_buckets() {
        assert_eq!(ParamStatus::from_percentage(75.0), ParamStatus::Critical);
        assert_eq!(ParamStatus::from_percentage(10.0), ParamStatus::Attention);
        assert_eq!(ParamStatus::from_percentage(0.5), ParamStatus::Warning);
        assert_eq!(ParamStatus::from_percentage(0.0), ParamStatus::Good);
    }
}
