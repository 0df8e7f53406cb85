use thiserror::Error;

/// Failure kinds for health queries.
///
/// Parameter problems (`InvalidRange`, `InvalidPagination`) are raised
/// before any warehouse query is issued; `Upstream` wraps warehouse
/// failures. A query that returns zero rows is never an error — it yields
/// zero-valued metrics.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}
