use std::sync::Arc;

use anyhow::Result;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use trackhealth_core::occurrence::Occurrence;

use crate::schema::init_sql;

/// A DuckDB backend for trackhealth.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent
/// writes cause contention. We wrap the connection in `Arc<Mutex<_>>` so
/// the async runtime serialises access while the struct stays cheap to
/// clone and share across Axum handlers.
///
/// Memory and thread limits are enforced by [`init_sql`] at open time.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
    /// read from `Config.duckdb_memory_limit` at the call site.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for unit tests only — data is discarded when the struct is
    /// dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a batch of occurrence rows in a single transaction.
    ///
    /// The `(occurrence_key, date)` primary key plus `ON CONFLICT DO
    /// NOTHING` makes redelivered batches idempotent: a duplicate delivery
    /// of the same occurrence never creates a second row.
    ///
    /// Returns immediately (no-op) if `rows` is empty.
    pub async fn insert_occurrences(&self, rows: &[Occurrence]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;

        // One transaction for the whole batch: atomicity and one fsync.
        let tx = conn.transaction()?;

        for row in rows {
            tx.execute(
                r#"INSERT INTO occurrences (
                    occurrence_key, date, event_timestamp,
                    expected_event_name, event_name,
                    user_pseudo_id, session_id,
                    device_category, device_os, device_browser,
                    page_location,
                    is_missing_in_source,
                    is_event_param_missing, is_user_param_missing,
                    is_item_param_missing, is_ecommerce_param_missing,
                    has_missing_params,
                    missing_event_params, missing_user_params,
                    missing_item_params, missing_ecommerce_params
                ) VALUES (
                    ?1,  ?2,  ?3,
                    ?4,  ?5,
                    ?6,  ?7,
                    ?8,  ?9,  ?10,
                    ?11,
                    ?12,
                    ?13, ?14,
                    ?15, ?16,
                    ?17,
                    ?18, ?19,
                    ?20, ?21
                ) ON CONFLICT (occurrence_key, date) DO NOTHING"#,
                duckdb::params![
                    row.occurrence_key,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.event_timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                    row.expected_event_name,
                    row.event_name,
                    row.user_pseudo_id,
                    row.session_id,
                    row.device_category,
                    row.device_os,
                    row.device_browser,
                    row.page_location,
                    row.is_missing_in_source,
                    row.is_event_param_missing,
                    row.is_user_param_missing,
                    row.is_item_param_missing,
                    row.is_ecommerce_param_missing,
                    row.has_missing_params,
                    serde_json::to_string(&row.missing_event_params)?,
                    serde_json::to_string(&row.missing_user_params)?,
                    serde_json::to_string(&row.missing_item_params)?,
                    serde_json::to_string(&row.missing_ecommerce_params)?,
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!("Inserted {} occurrences into DuckDB", rows.len());
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Returns an error if the connection
    /// is unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }
}

/// Parse a JSON string array column (`missing_*_params`) back into names.
///
/// NULL or unparseable values degrade to an empty list rather than failing
/// the whole query.
pub(crate) fn parse_name_list(raw: Option<String>) -> Vec<String> {
    raw.as_deref()
        .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}
