use crate::profile::FrameProfile;
use serde::{Deserialize, Serialize};

/// Columns that make a result meaningful without any numeric column.
const CATEGORICAL_COLUMNS: [&str; 7] = ["region", "category", "product", "month", "quarter", "state", "status"];

/// Numeric columns that should never go negative.
const NON_NEGATIVE_COLUMNS: [&str; 6] = ["revenue", "quantity", "unit_price", "amount", "orders", "count"];

/// Subset of `NON_NEGATIVE_COLUMNS` where a negative value fails the result.
const STRICT_NON_NEGATIVE_COLUMNS: [&str; 3] = ["revenue", "quantity", "amount"];

const SUSPICIOUS_NAME_PATTERNS: [&str; 4] = ["drop", "delete", ";--", "exec"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRules {
    pub min_rows: usize,
    pub max_rows: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_rows: 0,
            max_rows: 1_000_000,
        }
    }
}

/// Outcome of the rule checks. Issues fail the result, warnings don't.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub confidence: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub data_quality_score: f64,
    pub completeness_score: f64,
    pub consistency_score: f64,
}

/// Run every check against a profiled result, in a fixed order.
pub fn validate_profile(profile: &FrameProfile, rules: &ValidationRules) -> ValidationResult {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let row_count = profile.row_count;

    // Row count bounds
    if row_count > rules.max_rows {
        issues.push(format!("Too many rows: {}", row_count));
    }
    if row_count == 0 {
        warnings.push("Query returned no results - this might be expected".to_string());
    }

    // Column types
    if profile.numeric_columns().next().is_none()
        && !CATEGORICAL_COLUMNS.iter().any(|c| profile.has_column(c))
    {
        warnings.push("No numeric columns found in result".to_string());
    }

    // Nulls
    let total_nulls = profile.total_nulls();
    if total_nulls > 0 {
        let null_pct = profile.null_ratio() * 100.0;
        if null_pct > 50.0 {
            issues.push(format!("High null ratio: {:.1}%", null_pct));
        } else if null_pct > 10.0 {
            let null_cols: Vec<String> = profile
                .columns
                .iter()
                .filter(|c| c.null_count > 0)
                .map(|c| format!("'{}'", c.name))
                .collect();
            warnings.push(format!("Null values in columns: [{}]", null_cols.join(", ")));
        }
    }

    // Negative values
    for column in profile.numeric_columns() {
        let lower = column.name.to_lowercase();
        if !NON_NEGATIVE_COLUMNS.contains(&lower.as_str()) {
            continue;
        }
        let negatives = column.negative_count();
        if negatives > 0 {
            let message = format!("Negative values in {}: {}", column.name, negatives);
            if STRICT_NON_NEGATIVE_COLUMNS.contains(&lower.as_str()) {
                issues.push(message);
            } else {
                warnings.push(message);
            }
        }
    }

    // Duplicates
    if row_count > 0 && profile.duplicate_rows > 0 {
        let dup_pct = profile.duplicate_rows as f64 / row_count as f64 * 100.0;
        if dup_pct > 50.0 {
            warnings.push(format!("High duplicate ratio: {:.1}%", dup_pct));
        }
    }

    // IQR outliers
    for column in profile.numeric_columns() {
        if column.non_null_count() <= 10 {
            continue;
        }
        let (Some(q1), Some(q3)) = (column.quantile(0.25), column.quantile(0.75)) else {
            continue;
        };
        let iqr = q3 - q1;
        if iqr <= 0.0 {
            continue;
        }
        let (lower, upper) = (q1 - 3.0 * iqr, q3 + 3.0 * iqr);
        let outliers = column.count_outside(lower, upper);
        if outliers as f64 > row_count as f64 * 0.1 {
            warnings.push(format!("Many outliers detected in {}", column.name));
        }
    }

    // Injection-looking column names
    for column in &profile.columns {
        let lower = column.name.to_lowercase();
        if SUSPICIOUS_NAME_PATTERNS.iter().any(|p| lower.contains(p)) {
            issues.push(format!("Suspicious column name detected: {}", column.name));
        }
    }

    let data_quality_score = 1.0 - issues.len() as f64 * 0.2 - warnings.len() as f64 * 0.05;
    let completeness_score = 1.0 - total_nulls as f64 / profile.cell_count().max(1) as f64;
    let consistency_score = if issues.is_empty() { 1.0 } else { 0.5 };

    ValidationResult {
        passed: issues.is_empty(),
        confidence: data_quality_score.max(0.0),
        issues,
        warnings,
        data_quality_score: data_quality_score.max(0.0),
        completeness_score: completeness_score.max(0.0),
        consistency_score,
    }
}
