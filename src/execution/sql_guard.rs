//! Read-only SQL guard
//!
//! Model-generated SQL is parsed before it reaches the data layer. Only a
//! single query statement (`SELECT` / `WITH ... SELECT`) is accepted.

use crate::error::{InsightsError, Result};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

pub fn ensure_read_only(sql: &str) -> Result<()> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(InsightsError::UnsafeQuery("Empty SQL query".to_string()));
    }

    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, trimmed)
        .map_err(|e| InsightsError::UnsafeQuery(format!("Could not parse SQL: {}", e)))?;

    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [] => Err(InsightsError::UnsafeQuery("Empty SQL query".to_string())),
        [_] => Err(InsightsError::UnsafeQuery(
            "Only read-only SELECT queries are allowed".to_string(),
        )),
        _ => Err(InsightsError::UnsafeQuery(format!(
            "Expected a single statement, found {}",
            statements.len()
        ))),
    }
}
