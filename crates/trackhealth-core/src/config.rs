#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    /// IANA timezone the realtime window rule is evaluated in.
    pub timezone: String,
    /// Modified z-score threshold for the anomaly classifier.
    pub anomaly_threshold: f64,
    /// Top-N limit for the dashboard missing-parameter breakdown.
    pub param_top_n: usize,
    /// Rows per realtime health panel (event stats, page stats, params).
    pub realtime_top_n: usize,
    pub default_page_size: u32,
}

/// Read an env var, falling back to `default` only when it is unset.
/// A present-but-unparseable value is a startup error, never a silent
/// fallback.
fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| format!("invalid {name}: {e}"))
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: parse_env("TRACKHEALTH_PORT", "4000")?,
            data_dir: std::env::var("TRACKHEALTH_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("TRACKHEALTH_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            timezone: std::env::var("TRACKHEALTH_TIMEZONE")
                .unwrap_or_else(|_| "Europe/Paris".to_string()),
            anomaly_threshold: parse_env("TRACKHEALTH_ANOMALY_THRESHOLD", "3.5")?,
            param_top_n: parse_env("TRACKHEALTH_PARAM_TOP_N", "5")?,
            realtime_top_n: parse_env("TRACKHEALTH_REALTIME_TOP_N", "10")?,
            default_page_size: parse_env("TRACKHEALTH_DEFAULT_PAGE_SIZE", "10")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-global, so every scenario lives in one test.
    #[test]
    fn unparseable_numeric_vars_fail_startup() {
        std::env::set_var("TRACKHEALTH_PARAM_TOP_N", "five");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("TRACKHEALTH_PARAM_TOP_N"));
        std::env::remove_var("TRACKHEALTH_PARAM_TOP_N");

        std::env::set_var("TRACKHEALTH_DEFAULT_PAGE_SIZE", "lots");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("TRACKHEALTH_DEFAULT_PAGE_SIZE"));
        std::env::remove_var("TRACKHEALTH_DEFAULT_PAGE_SIZE");

        let cfg = Config::from_env().expect("defaults");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.param_top_n, 5);
        assert_eq!(cfg.realtime_top_n, 10);
        assert_eq!(cfg.default_page_size, 10);
    }
}
