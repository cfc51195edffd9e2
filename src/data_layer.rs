//! Data Layer
//!
//! Loads the sales CSV into an in-memory Polars table and runs SQL against
//! it through the Polars SQL engine.

use crate::error::{InsightsError, Result};
use crate::profile::FrameProfile;
use lazy_static::lazy_static;
use polars::prelude::*;
use polars::sql::SQLContext;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

lazy_static! {
    static ref SCIENTIFIC_NOTATION: Regex = Regex::new(r"^-?\d+\.?\d*[Ee][+-]?\d+$").unwrap();
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref CAMEL_BOUNDARY: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

const SAMPLE_VALUES: usize = 3;
const SAMPLE_SCAN_ROWS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericColumnStats {
    pub name: String,
    pub sum: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub null_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub table_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub numeric_columns: Vec<NumericColumnStats>,
}

/// In-process analytical table plus a SQL front end.
pub struct DataLayer {
    table_name: String,
    frame: DataFrame,
}

impl DataLayer {
    /// Load a CSV file into memory under `table_name`.
    pub fn load_csv(path: impl AsRef<Path>, table_name: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InsightsError::Data(format!("File not found: {}", path.display())));
        }

        info!("Loading data from {}", path.display());
        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .with_ignore_errors(true)
            .with_missing_is_null(true)
            .with_truncate_ragged_lines(true)
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| InsightsError::Data(format!("Failed to load CSV {}: {}", path.display(), e)))?;

        let frame = normalize_column_names(frame)?;
        let frame = convert_scientific_notation_columns(frame)?;

        info!("Loaded {} records into table '{}'", frame.height(), table_name);
        Ok(Self::from_frame(frame, table_name))
    }

    pub fn from_frame(frame: DataFrame, table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            frame,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Execute SQL against the loaded table.
    pub fn execute_query(&self, sql: &str) -> Result<DataFrame> {
        debug!("Executing SQL: {}", sql);
        let mut ctx = SQLContext::new();
        ctx.register(&self.table_name, self.frame.clone().lazy());

        ctx.execute(sql)
            .and_then(|lf| lf.collect())
            .map_err(|e| InsightsError::Execution(format!("Query failed: {}", e)))
    }

    /// Describe the table for an SQL-writing model.
    pub fn schema_context(&self) -> Result<String> {
        let mut out = format!(
            "Table: {} ({} rows)\nColumns:\n",
            self.table_name,
            self.frame.height()
        );

        for series in self.frame.get_columns() {
            out.push_str(&format!("- {} ({})", series.name(), series.dtype()));
            if matches!(series.dtype(), DataType::String) {
                let samples = sample_values(series)?;
                if !samples.is_empty() {
                    out.push_str(&format!(" e.g. {}", samples.join(", ")));
                }
            }
            out.push('\n');
        }

        Ok(out)
    }

    pub fn summary_stats(&self) -> Result<SummaryStats> {
        let profile = FrameProfile::from_frame(&self.frame)?;
        let numeric_columns = profile
            .numeric_columns()
            .map(|c| NumericColumnStats {
                name: c.name.clone(),
                sum: c.sum(),
                mean: c.mean(),
                min: c.min(),
                max: c.max(),
                null_count: c.null_count,
            })
            .collect();

        Ok(SummaryStats {
            table_name: self.table_name.clone(),
            row_count: profile.row_count,
            column_count: profile.column_count(),
            numeric_columns,
        })
    }
}

fn sample_values(series: &Series) -> Result<Vec<String>> {
    let mut samples: Vec<String> = Vec::new();
    for value in series.str()?.into_iter().take(SAMPLE_SCAN_ROWS).flatten() {
        if !samples.iter().any(|s| s == value) {
            samples.push(value.to_string());
            if samples.len() == SAMPLE_VALUES {
                break;
            }
        }
    }
    Ok(samples)
}

/// `Order ID` -> `order_id`, `shipState` -> `ship_state`.
pub fn to_snake_case(name: &str) -> String {
    let split = CAMEL_BOUNDARY.replace_all(name.trim(), "${1}_${2}").to_lowercase();
    NON_ALNUM.replace_all(&split, "_").trim_matches('_').to_string()
}

fn normalize_column_names(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for name in names {
        let normalized = to_snake_case(&name);
        if !normalized.is_empty() && normalized != name {
            df.rename(&name, &normalized)?;
        }
    }
    Ok(df)
}

/// Cast string columns that hold scientific-notation numbers to Float64.
/// A column is only cast when every non-null value parses; mixed columns
/// such as SKUs stay strings.
fn convert_scientific_notation_columns(df: DataFrame) -> Result<DataFrame> {
    let column_names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut result = df;

    for col_name in &column_names {
        let series = result.column(col_name)?;
        if !matches!(series.dtype(), DataType::String) {
            continue;
        }
        let has_scientific = series
            .str()?
            .into_iter()
            .flatten()
            .any(|v| SCIENTIFIC_NOTATION.is_match(v.trim()));
        if !has_scientific {
            continue;
        }

        match series.strict_cast(&DataType::Float64) {
            Ok(casted) => {
                debug!("Converting scientific notation column {}", col_name);
                result.with_column(casted)?;
            }
            Err(e) => debug!("Keeping {} as text: {}", col_name, e),
        }
    }

    Ok(result)
}
