/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `TRACKHEALTH_DUCKDB_MEMORY`, default `"1GB"`). An explicit limit is
/// always set — the DuckDB default (80% of system RAM) is not acceptable
/// for a server process. `SET threads = 2` bounds the background thread
/// pool for single-writer embedded use.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- OCCURRENCES
-- ===========================================
-- One row per delivered tracking-event occurrence. The warehouse feed may
-- redeliver an occurrence; the primary key on (occurrence_key, date)
-- collapses exact re-deliveries at insert time, and every aggregate still
-- counts DISTINCT occurrence_key so duplicates can never inflate a metric.
--
-- The missing_*_params columns hold JSON string arrays of parameter names
-- (same convention as serialized event payloads elsewhere: VARCHAR column,
-- serde_json at the boundary).
CREATE TABLE IF NOT EXISTS occurrences (
    occurrence_key              VARCHAR NOT NULL,
    date                        DATE NOT NULL,
    event_timestamp             TIMESTAMP NOT NULL,
    expected_event_name         VARCHAR NOT NULL,
    event_name                  VARCHAR NOT NULL,
    user_pseudo_id              VARCHAR NOT NULL,
    session_id                  VARCHAR,
    device_category             VARCHAR,
    device_os                   VARCHAR,
    device_browser              VARCHAR,
    page_location               VARCHAR,
    is_missing_in_source        BOOLEAN NOT NULL DEFAULT FALSE,
    is_event_param_missing      BOOLEAN NOT NULL DEFAULT FALSE,
    is_user_param_missing       BOOLEAN NOT NULL DEFAULT FALSE,
    is_item_param_missing       BOOLEAN NOT NULL DEFAULT FALSE,
    is_ecommerce_param_missing  BOOLEAN NOT NULL DEFAULT FALSE,
    has_missing_params          BOOLEAN NOT NULL DEFAULT FALSE,
    missing_event_params        VARCHAR,
    missing_user_params         VARCHAR,
    missing_item_params         VARCHAR,
    missing_ecommerce_params    VARCHAR,
    PRIMARY KEY (occurrence_key, date)
);
CREATE INDEX IF NOT EXISTS idx_occurrences_date     ON occurrences(date);
CREATE INDEX IF NOT EXISTS idx_occurrences_expected ON occurrences(expected_event_name);
CREATE INDEX IF NOT EXISTS idx_occurrences_name     ON occurrences(event_name);
"#
    )
}
