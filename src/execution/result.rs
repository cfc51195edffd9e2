//! Query Result - the extraction stage's view of an executed query

use crate::error::{InsightsError, Result};
use crate::profile::FrameProfile;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Rows kept as JSON records on the result.
pub const MAX_RECORD_ROWS: usize = 100;
const SUMMARY_NUMERIC_COLUMNS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,

    pub sql: String,

    /// Full result frame (not serialized)
    #[serde(skip)]
    pub data: Option<DataFrame>,

    /// First `MAX_RECORD_ROWS` rows as JSON records
    pub records: Vec<serde_json::Value>,

    pub row_count: usize,

    pub columns: Vec<String>,

    pub execution_time_ms: u64,

    /// Short human-readable description of the result shape
    pub summary: String,

    pub warnings: Vec<String>,
}

impl QueryResult {
    pub fn success(sql: &str, data: DataFrame, execution_time_ms: u64) -> Result<Self> {
        let columns: Vec<String> = data.get_column_names().iter().map(|s| s.to_string()).collect();
        let row_count = data.height();

        let records = if row_count <= MAX_RECORD_ROWS {
            dataframe_to_records(&data)?
        } else {
            dataframe_to_records(&data.head(Some(MAX_RECORD_ROWS)))?
        };

        let summary = summarize(&FrameProfile::from_frame(&data)?);

        Ok(Self {
            success: true,
            sql: sql.to_string(),
            data: Some(data),
            records,
            row_count,
            columns,
            execution_time_ms,
            summary,
            warnings: Vec::new(),
        })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// One-paragraph description used in logs and the CLI.
pub fn summarize(profile: &FrameProfile) -> String {
    if profile.is_empty() {
        return "No data found.".to_string();
    }

    let mut summary = format!(
        "Retrieved {} records with {} columns.\n",
        profile.row_count,
        profile.column_count()
    );

    let numeric: Vec<_> = profile.numeric_columns().take(SUMMARY_NUMERIC_COLUMNS).collect();
    if !numeric.is_empty() {
        summary.push_str("Numeric summaries:\n");
        for column in numeric {
            summary.push_str(&format!(
                "  - {}: min={}, max={}, mean={}\n",
                column.name,
                fmt_stat(column.min()),
                fmt_stat(column.max()),
                fmt_stat(column.mean()),
            ));
        }
    }

    summary
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "nan".to_string())
}

fn dataframe_to_records(df: &DataFrame) -> Result<Vec<serde_json::Value>> {
    let mut rows = Vec::with_capacity(df.height());

    for row_idx in 0..df.height() {
        let mut row = serde_json::Map::new();
        for series in df.get_columns() {
            row.insert(series.name().to_string(), series_to_json_value(series, row_idx)?);
        }
        rows.push(serde_json::Value::Object(row));
    }

    Ok(rows)
}

fn series_to_json_value(series: &Series, row_idx: usize) -> Result<serde_json::Value> {
    let any_val = series
        .get(row_idx)
        .map_err(|e| InsightsError::Execution(format!("Failed to get value: {}", e)))?;

    let float = |f: f64| {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    };

    Ok(match any_val {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::Boolean(b) => serde_json::Value::Bool(b),
        AnyValue::String(s) => serde_json::Value::String(s.to_string()),
        AnyValue::StringOwned(s) => serde_json::Value::String(s.to_string()),
        AnyValue::Int8(i) => i.into(),
        AnyValue::Int16(i) => i.into(),
        AnyValue::Int32(i) => i.into(),
        AnyValue::Int64(i) => i.into(),
        AnyValue::UInt8(u) => u.into(),
        AnyValue::UInt16(u) => u.into(),
        AnyValue::UInt32(u) => u.into(),
        AnyValue::UInt64(u) => u.into(),
        AnyValue::Float32(f) => float(f as f64),
        AnyValue::Float64(f) => float(f),
        other => serde_json::Value::String(other.to_string()),
    })
}
