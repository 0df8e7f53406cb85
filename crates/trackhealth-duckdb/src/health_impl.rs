use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use trackhealth_core::anomaly::score_series;
use trackhealth_core::error::HealthError;
use trackhealth_core::health::{
    AnomalyRecord, DashboardView, HealthBackend, PageRequest, RealtimeSnapshot, TrackingPlanView,
};
use trackhealth_core::occurrence::Occurrence;
use trackhealth_core::window::DateWindow;

use crate::DuckDbBackend;

/// Dashboard per-event rollup size.
const EVENT_STATS_LIMIT: i64 = 50;

#[async_trait]
impl HealthBackend for DuckDbBackend {
    async fn insert_occurrences(&self, rows: &[Occurrence]) -> Result<(), HealthError> {
        DuckDbBackend::insert_occurrences(self, rows)
            .await
            .map_err(HealthError::from)
    }

    async fn get_dashboard_metrics(
        &self,
        window: &DateWindow,
        param_top_n: usize,
    ) -> Result<DashboardView, HealthError> {
        // Three independent reads over one window, joined all-or-nothing.
        let (metrics, event_stats, parameters_analysis) = tokio::try_join!(
            crate::queries::metrics::dashboard_metrics_inner(self, window),
            crate::queries::event_stats::event_stats_inner(self, window, EVENT_STATS_LIMIT),
            crate::queries::params::parameter_analysis_inner(self, window, param_top_n),
        )?;
        Ok(DashboardView {
            metrics,
            event_stats,
            parameters_analysis,
        })
    }

    async fn get_event_anomalies(
        &self,
        window: &DateWindow,
        threshold: f64,
    ) -> Result<Vec<AnomalyRecord>, HealthError> {
        let series = crate::queries::series::daily_counts_by_event_inner(self, window).await?;
        let analyzed_at = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();

        // Each event type is scored over its own series only — one type's
        // counts never influence another's classification.
        let mut records = Vec::new();
        for (event_name, daily) in series {
            for day in score_series(&daily, threshold) {
                records.push(AnomalyRecord {
                    analyzed_at: analyzed_at.clone(),
                    event_date: day.date,
                    event_name: event_name.clone(),
                    events_count: day.count,
                    median_value: day.median,
                    mad_value: day.mad,
                    mad_score: day.mad_score,
                    status: day.status,
                });
            }
        }

        records.sort_by(|a, b| {
            b.event_date
                .cmp(&a.event_date)
                .then_with(|| a.event_name.cmp(&b.event_name))
        });
        Ok(records)
    }

    async fn get_realtime_snapshot(
        &self,
        now_local: NaiveDateTime,
        panel_top_n: usize,
    ) -> Result<RealtimeSnapshot, HealthError> {
        crate::queries::realtime::get_realtime_snapshot_inner(self, now_local, panel_top_n)
            .await
            .map_err(HealthError::from)
    }

    async fn get_tracking_plan(
        &self,
        window: &DateWindow,
        event_filter: Option<&str>,
        page: &PageRequest,
    ) -> Result<TrackingPlanView, HealthError> {
        crate::queries::tracking_plan::get_tracking_plan_inner(self, window, event_filter, page)
            .await
            .map_err(HealthError::from)
    }
}
