use std::sync::Arc;

use chrono_tz::Tz;

use trackhealth_core::config::Config;
use trackhealth_core::health::{AnomalyRecord, DashboardView, TrackingPlanView};
use trackhealth_duckdb::DuckDbBackend;

use crate::cache::{RangeKey, SwrCache, TrackingPlanKey};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// All fields are cheap to clone — heavy resources live behind `Arc`.
pub struct AppState {
    /// The DuckDB backend. Internally `Arc<tokio::sync::Mutex<Connection>>`,
    /// so already async-safe and cheap to share.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment
    /// variables.
    pub config: Arc<Config>,

    /// The realtime-window timezone, parsed once from `config.timezone`.
    pub tz: Tz,

    /// Stale-while-revalidate caches, one per composed view. Keys are the
    /// semantic query parameters; values are whole response objects.
    pub dashboard_cache: SwrCache<RangeKey, DashboardView>,
    pub anomaly_cache: SwrCache<RangeKey, Vec<AnomalyRecord>>,
    pub tracking_cache: SwrCache<TrackingPlanKey, TrackingPlanView>,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> anyhow::Result<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid TRACKHEALTH_TIMEZONE: {e}"))?;
        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            tz,
            dashboard_cache: SwrCache::new("dashboard"),
            anomaly_cache: SwrCache::new("anomaly"),
            tracking_cache: SwrCache::new("tracking"),
        })
    }
}
