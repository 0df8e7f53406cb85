//! Robust anomaly scoring over daily event-count series.
//!
//! Uses the Median Absolute Deviation (MAD) and the modified z-score
//! (0.6745 × deviation / MAD). The scorer is pure and stateless: it is
//! recomputed from scratch on every request, one series per event type.

use serde::Serialize;

/// Scale factor that puts MAD-based deviations in standard-deviation
/// equivalent units under normality.
pub const MODIFIED_Z_SCALE: f64 = 0.6745;

/// Default classification threshold for the modified z-score.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyStatus {
    Normal,
    Anomaly,
}

/// One day's input to the scorer.
#[derive(Debug, Clone)]
pub struct DailyCount {
    /// `%Y-%m-%d` calendar date.
    pub date: String,
    pub count: i64,
}

/// One day's score, derived from the full window.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDay {
    pub date: String,
    pub count: i64,
    pub median: f64,
    pub mad: f64,
    /// Modified z-score; 0.0 when MAD is zero (the score is undefined
    /// there — classification falls back to "any deviation is anomalous").
    pub mad_score: f64,
    pub status: AnomalyStatus,
}

/// Median of a slice. Returns 0.0 for an empty slice.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Score every day of one event type's daily series.
///
/// A day is `Anomaly` when |modified z| exceeds `threshold`. When the
/// window's MAD is zero (a constant series), any day that deviates from
/// the median at all is anomalous regardless of the undefined z
/// denominator.
pub fn score_series(series: &[DailyCount], threshold: f64) -> Vec<ScoredDay> {
    let counts: Vec<f64> = series.iter().map(|p| p.count as f64).collect();
    let med = median(&counts);
    let deviations: Vec<f64> = counts.iter().map(|v| (v - med).abs()).collect();
    let mad = median(&deviations);

    series
        .iter()
        .map(|point| {
            let value = point.count as f64;
            let (score, status) = if mad == 0.0 {
                let status = if value != med {
                    AnomalyStatus::Anomaly
                } else {
                    AnomalyStatus::Normal
                };
                (0.0, status)
            } else {
                let score = MODIFIED_Z_SCALE * (value - med) / mad;
                let status = if score.abs() > threshold {
                    AnomalyStatus::Anomaly
                } else {
                    AnomalyStatus::Normal
                };
                (score, status)
            };
            ScoredDay {
                date: point.date.clone(),
                count: point.count,
                median: med,
                mad,
                mad_score: score,
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(counts: &[i64]) -> Vec<DailyCount> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| DailyCount {
                date: format!("2025-06-{:02}", i + 1),
                count,
            })
            .collect()
    }

    #[test]
    fn purchase_outlier_scenario() {
        // Window 2025-06-01..2025-06-07, counts [10,11,9,10,50,10,11]:
        // median 10, MAD 1, day 5 scores 0.6745 * 40 = 26.98.
        let scored = score_series(&series(&[10, 11, 9, 10, 50, 10, 11]), 3.5);
        assert_eq!(scored.len(), 7);
        let day5 = &scored[4];
        assert_eq!(day5.median, 10.0);
        assert_eq!(day5.mad, 1.0);
        assert!((day5.mad_score - 26.98).abs() < 1e-9);
        assert_eq!(day5.status, AnomalyStatus::Anomaly);
        for (i, day) in scored.iter().enumerate() {
            if i != 4 {
                assert_eq!(day.status, AnomalyStatus::Normal, "day {}", i + 1);
            }
        }
    }

    #[test]
    fn constant_series_is_all_normal() {
        let scored = score_series(&series(&[7, 7, 7, 7, 7]), 3.5);
        for day in &scored {
            assert_eq!(day.mad, 0.0);
            assert_eq!(day.status, AnomalyStatus::Normal);
        }
    }

    #[test]
    fn zero_mad_flags_any_deviation() {
        // MAD stays 0 (majority constant) but the deviating day must be
        // flagged even though the z-score is undefined.
        let scored = score_series(&series(&[5, 5, 5, 5, 6]), 3.5);
        assert_eq!(scored[4].mad, 0.0);
        assert_eq!(scored[4].mad_score, 0.0);
        assert_eq!(scored[4].status, AnomalyStatus::Anomaly);
        assert_eq!(scored[0].status, AnomalyStatus::Normal);
    }

    #[test]
    fn even_length_median_averages_middle_pair() {
        let scored = score_series(&series(&[1, 2, 3, 4]), 3.5);
        assert_eq!(scored[0].median, 2.5);
    }

    #[test]
    fn empty_series_scores_nothing() {
        assert!(score_series(&[], 3.5).is_empty());
    }
}
