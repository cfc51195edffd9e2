//! Frame profiling
//!
//! A `FrameProfile` is a snapshot of a result frame: per-column null counts,
//! the non-null values of numeric columns and the duplicate row count.
//! Validation, confidence scoring and response formatting all work off this
//! snapshot rather than poking at the `DataFrame` directly.

use crate::error::Result;
use polars::prelude::*;

#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub is_numeric: bool,
    /// Nulls plus NaNs for float columns.
    pub null_count: usize,
    /// Non-null, non-NaN values as f64. Empty for non-numeric columns.
    pub values: Float64Chunked,
}

impl ColumnProfile {
    pub fn non_null_count(&self) -> usize {
        self.values.len()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.min()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.max()
    }

    pub fn sum(&self) -> f64 {
        self.values.sum().unwrap_or(0.0)
    }

    pub fn mean(&self) -> Option<f64> {
        self.values.mean()
    }

    /// Sample standard deviation (ddof = 1).
    pub fn std(&self) -> Option<f64> {
        self.values.std(1)
    }

    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.values
            .quantile(q, QuantileInterpolOptions::Linear)
            .ok()
            .flatten()
    }

    pub fn negative_count(&self) -> usize {
        self.values.lt(0.0).sum().unwrap_or(0) as usize
    }

    /// Values strictly below `lower` or strictly above `upper`.
    pub fn count_outside(&self, lower: f64, upper: f64) -> usize {
        (self.values.lt(lower) | self.values.gt(upper)).sum().unwrap_or(0) as usize
    }
}

#[derive(Debug, Clone)]
pub struct FrameProfile {
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
    /// Rows equal to an earlier row. The first occurrence is not counted.
    pub duplicate_rows: usize,
}

impl FrameProfile {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let row_count = df.height();
        let mut columns = Vec::with_capacity(df.width());

        for series in df.get_columns() {
            let is_numeric = series.dtype().is_numeric();
            let values = if is_numeric {
                let casted = series.cast(&DataType::Float64)?;
                let mask = casted.is_not_nan()?;
                casted.f64()?.filter(&mask)?
            } else {
                Float64Chunked::full_null(series.name(), 0)
            };
            let null_count = if is_numeric {
                series.len() - values.len()
            } else {
                series.null_count()
            };

            columns.push(ColumnProfile {
                name: series.name().to_string(),
                dtype: series.dtype().to_string(),
                is_numeric,
                null_count,
                values,
            });
        }

        let duplicate_rows = count_duplicate_rows(df)?;

        Ok(Self {
            row_count,
            columns,
            duplicate_rows,
        })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> usize {
        self.row_count * self.columns.len()
    }

    /// True when the frame has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.columns.is_empty()
    }

    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| c.null_count).sum()
    }

    /// Fraction of null cells, 0.0 for an empty frame.
    pub fn null_ratio(&self) -> f64 {
        let cells = self.cell_count();
        if cells == 0 {
            0.0
        } else {
            self.total_nulls() as f64 / cells as f64
        }
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnProfile> {
        self.columns.iter().filter(|c| c.is_numeric)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Render count/mean/std/min/quartiles/max for every numeric column.
    pub fn describe(&self) -> String {
        let numeric: Vec<&ColumnProfile> = self.numeric_columns().collect();
        if numeric.is_empty() {
            return String::new();
        }

        let stats: [(&str, fn(&ColumnProfile) -> Option<f64>); 8] = [
            ("count", |c| Some(c.non_null_count() as f64)),
            ("mean", |c| c.mean()),
            ("std", |c| c.std()),
            ("min", |c| c.min()),
            ("25%", |c| c.quantile(0.25)),
            ("50%", |c| c.quantile(0.5)),
            ("75%", |c| c.quantile(0.75)),
            ("max", |c| c.max()),
        ];

        let cells: Vec<Vec<String>> = stats
            .iter()
            .map(|(_, f)| {
                numeric
                    .iter()
                    .map(|c| f(c).map(|v| format!("{:.2}", v)).unwrap_or_else(|| "NaN".to_string()))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = numeric
            .iter()
            .enumerate()
            .map(|(i, c)| cells.iter().map(|row| row[i].len()).max().unwrap_or(0).max(c.name.len()))
            .collect();

        let mut out = String::new();
        out.push_str(&format!("{:<6}", ""));
        for (c, w) in numeric.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", c.name, width = w));
        }
        out.push('\n');
        for ((label, _), row) in stats.iter().zip(&cells) {
            out.push_str(&format!("{:<6}", label));
            for (cell, w) in row.iter().zip(&widths) {
                out.push_str(&format!("  {:>width$}", cell, width = w));
            }
            out.push('\n');
        }
        out
    }
}

/// NaN and null compare equal here, so floats are normalized to null first.
fn count_duplicate_rows(df: &DataFrame) -> Result<usize> {
    if df.height() < 2 || df.width() == 0 {
        return Ok(0);
    }

    let normalized = df
        .get_columns()
        .iter()
        .map(nan_to_null)
        .collect::<Result<Vec<_>>>()?;

    let distinct = DataFrame::new(normalized)?
        .lazy()
        .unique(None, UniqueKeepStrategy::First)
        .collect()?
        .height();

    Ok(df.height() - distinct)
}

fn nan_to_null(series: &Series) -> Result<Series> {
    if !series.dtype().is_float() {
        return Ok(series.clone());
    }
    let casted = series.cast(&DataType::Float64)?;
    let mask = casted.is_nan()?;
    Ok(casted.f64()?.set(&mask, None)?.into_series())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> ColumnProfile {
        let df = df! ["v" => values].unwrap();
        FrameProfile::from_frame(&df).unwrap().columns.remove(0)
    }

    #[test]
    fn test_quantile_interpolates() {
        let c = column(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(c.quantile(0.0), Some(1.0));
        assert_eq!(c.quantile(1.0), Some(4.0));
        assert!((c.quantile(0.25).unwrap() - 1.75).abs() < 1e-9);
        assert!((c.quantile(0.5).unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(column(&[]).quantile(0.5), None);
    }

    #[test]
    fn test_sample_std() {
        let c = column(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((c.std().unwrap() - 2.138089935).abs() < 1e-6);
        assert_eq!(c.mean(), Some(5.0));
        assert_eq!(c.sum(), 40.0);
        assert_eq!(c.count_outside(3.0, 6.0), 3);
    }

    #[test]
    fn test_profile_counts_nulls_and_duplicates() {
        let df = df! [
            "state" => [Some("KA"), Some("KA"), None, Some("MH")],
            "revenue" => [Some(10.0), Some(10.0), Some(f64::NAN), None],
        ]
        .unwrap();

        let profile = FrameProfile::from_frame(&df).unwrap();
        assert_eq!(profile.row_count, 4);
        assert_eq!(profile.column_count(), 2);
        assert_eq!(profile.duplicate_rows, 1);

        let state = &profile.columns[0];
        assert!(!state.is_numeric);
        assert_eq!(state.null_count, 1);

        let revenue = &profile.columns[1];
        assert!(revenue.is_numeric);
        assert_eq!(revenue.null_count, 2);
        assert_eq!(revenue.non_null_count(), 2);
        assert_eq!(revenue.min(), Some(10.0));
        assert_eq!(profile.total_nulls(), 3);
        assert!((profile.null_ratio() - 3.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_nan_and_null_rows_are_duplicates() {
        let df = df! ["amount" => [Some(f64::NAN), None]].unwrap();
        let profile = FrameProfile::from_frame(&df).unwrap();
        assert_eq!(profile.duplicate_rows, 1);
        assert_eq!(profile.columns[0].null_count, 2);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let df = df! [
            "state" => ["GOA", "GOA", "GOA", "KERALA"],
            "orders" => [1i64, 1, 1, 1],
        ]
        .unwrap();
        assert_eq!(FrameProfile::from_frame(&df).unwrap().duplicate_rows, 2);
    }

    #[test]
    fn test_describe_lists_numeric_columns_only() {
        let df = df! [
            "category" => ["a", "b", "c"],
            "amount" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let text = FrameProfile::from_frame(&df).unwrap().describe();
        assert!(text.contains("amount"));
        assert!(!text.contains("category"));
        assert!(text.contains("mean"));
        assert!(text.contains("2.00"));
        assert!(text.contains("75%"));
    }
}
