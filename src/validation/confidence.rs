use crate::profile::FrameProfile;
use serde::{Deserialize, Serialize};

const SIGNED_CHECK_COLUMNS: [&str; 4] = ["revenue", "quantity", "amount", "orders"];
const EXPECTED_NAME_TOKENS: [&str; 6] = ["revenue", "orders", "count", "total", "sum", "avg"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub data_quality: f64,
    pub completeness: f64,
    pub consistency: f64,
    pub overall: f64,
}

impl ConfidenceScores {
    /// Scores for a result that could not be checked at all.
    pub fn zero() -> Self {
        Self {
            data_quality: 0.0,
            completeness: 0.0,
            consistency: 0.0,
            overall: 0.0,
        }
    }
}

/// Grades a result on a 0..1 scale, weighted 0.4 quality, 0.3 completeness
/// and 0.3 consistency.
#[derive(Debug, Default, Clone)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, profile: &FrameProfile) -> ConfidenceScores {
        if profile.is_empty() {
            return ConfidenceScores {
                data_quality: 0.5,
                completeness: 0.0,
                consistency: 1.0,
                overall: 0.3,
            };
        }

        let data_quality = self.score_data_quality(profile);
        let completeness = self.score_completeness(profile);
        let consistency = self.score_consistency(profile);

        ConfidenceScores {
            data_quality,
            completeness,
            consistency,
            overall: data_quality * 0.4 + completeness * 0.3 + consistency * 0.3,
        }
    }

    fn score_data_quality(&self, profile: &FrameProfile) -> f64 {
        let mut score = 1.0 - profile.null_ratio() * 0.5;

        for column in profile.numeric_columns() {
            if SIGNED_CHECK_COLUMNS.contains(&column.name.as_str()) && column.negative_count() > 0 {
                score -= 0.1;
            }

            // Values more than five standard deviations from the mean
            if column.non_null_count() > 10 {
                if let (Some(mean), Some(std)) = (column.mean(), column.std()) {
                    if std > 0.0 {
                        let extreme = column.count_outside(mean - 5.0 * std, mean + 5.0 * std);
                        score -= 0.05 * extreme.min(5) as f64;
                    }
                }
            }
        }

        score.clamp(0.0, 1.0)
    }

    fn score_completeness(&self, profile: &FrameProfile) -> f64 {
        let non_null_ratio = 1.0 - profile.null_ratio();

        let names: Vec<String> = profile.columns.iter().map(|c| c.name.to_lowercase()).collect();
        let matched = EXPECTED_NAME_TOKENS
            .iter()
            .filter(|token| names.iter().any(|n| n.contains(*token)))
            .count();
        let bonus = (matched as f64 * 0.1).min(0.2);

        (non_null_ratio + bonus).min(1.0)
    }

    fn score_consistency(&self, profile: &FrameProfile) -> f64 {
        let mut score: f64 = 1.0;

        for column in profile.numeric_columns() {
            if let (Some(min), Some(max)) = (column.min(), column.max()) {
                if min > 0.0 && max > 0.0 && max / min > 10_000.0 {
                    score -= 0.1;
                }
            }
        }

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn score(df: &DataFrame) -> ConfidenceScores {
        ConfidenceScorer::new().score(&FrameProfile::from_frame(df).unwrap())
    }

    #[test]
    fn test_empty_frame_scores() {
        let df = df! ["revenue" => Vec::<f64>::new()].unwrap();
        assert_eq!(
            score(&df),
            ConfidenceScores { data_quality: 0.5, completeness: 0.0, consistency: 1.0, overall: 0.3 }
        );
    }

    #[test]
    fn test_clean_aggregate_is_fully_confident() {
        let df = df! [
            "state" => ["MAHARASHTRA", "KARNATAKA"],
            "total_revenue" => [1500.0, 900.0],
        ]
        .unwrap();

        let scores = score(&df);
        assert_eq!(scores.data_quality, 1.0);
        assert_eq!(scores.completeness, 1.0);
        assert_eq!(scores.consistency, 1.0);
        assert!((scores.overall - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nulls_and_negatives_lower_quality() {
        let df = df! [
            "revenue" => [Some(-10.0), Some(20.0), None, Some(40.0)],
        ]
        .unwrap();

        let scores = score(&df);
        // 1 - 0.25 * 0.5 - 0.1
        assert!((scores.data_quality - 0.775).abs() < 1e-9);
        // 0.75 non-null plus the "revenue" name bonus
        assert!((scores.completeness - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_wide_range_lowers_consistency() {
        let df = df! [
            "amount" => [0.5, 10_000.0],
            "qty" => [1.0, 2.0],
        ]
        .unwrap();

        let scores = score(&df);
        assert!((scores.consistency - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_values_penalized() {
        let mut values = vec![10.0; 30];
        values.push(10_000.0);
        let df = df! ["qty" => values].unwrap();

        let scores = score(&df);
        assert!((scores.data_quality - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_value_penalty_is_capped() {
        let mut values = vec![10.0; 992];
        values.extend([10_000.0; 8]);
        let df = df! ["qty" => values].unwrap();

        // Eight extreme values, penalty capped at five
        let scores = score(&df);
        assert!((scores.data_quality - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_name_bonus_is_capped() {
        let df = df! [
            "revenue_total_sum_avg" => [Some(1.0), None, Some(2.0), Some(3.0)],
        ]
        .unwrap();

        // 0.75 non-null plus four matched tokens, bonus capped at 0.2
        let scores = score(&df);
        assert!((scores.completeness - 0.95).abs() < 1e-9);
    }
}
