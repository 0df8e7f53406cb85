pub mod event_stats;
pub mod metrics;
pub mod pages;
pub mod params;
pub mod realtime;
pub mod series;
pub mod tracking_plan;

use trackhealth_core::window::DateWindow;

/// Render a window's endpoints as `%Y-%m-%d` bind values. Both endpoints
/// are inclusive; the SQL side always uses `date BETWEEN ?a AND ?b`.
pub(crate) fn window_bounds(window: &DateWindow) -> (String, String) {
    (
        window.start.format("%Y-%m-%d").to_string(),
        window.end.format("%Y-%m-%d").to_string(),
    )
}

/// Percentage with a zero-safe denominator: exactly 0.0 when `total == 0`.
pub(crate) fn safe_pct(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::safe_pct;

    #[test]
    fn safe_pct_zero_denominator() {
        assert_eq!(safe_pct(5, 0), 0.0);
    }

    #[test]
    fn safe_pct_half() {
        assert_eq!(safe_pct(50, 100), 50.0);
    }
}
