use crate::agents::{Agent, AgentState};
use crate::data_layer::DataLayer;
use crate::error::Result;
use crate::execution::QueryResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs the resolved SQL against the data layer.
pub struct DataExtractionAgent {
    data: Arc<DataLayer>,
}

impl DataExtractionAgent {
    pub fn new(data: Arc<DataLayer>) -> Self {
        Self { data }
    }

    pub fn extract(&self, sql: &str) -> Result<QueryResult> {
        info!("Executing SQL: {}", sql);
        let start = Instant::now();
        let df = self.data.execute_query(sql)?;
        QueryResult::success(sql, df, start.elapsed().as_millis() as u64)
    }
}

#[async_trait]
impl Agent for DataExtractionAgent {
    fn name(&self) -> &'static str {
        "data_extraction"
    }

    async fn run(&self, state: &mut AgentState) {
        let Some(intent) = state.query_intent.as_ref() else {
            state.query_result = None;
            // Keep the resolution failure if there is one.
            if state.error.is_none() {
                state.error = Some("No query intent provided".to_string());
            }
            return;
        };

        match self.extract(&intent.sql_query) {
            Ok(result) => {
                info!(
                    "Query executed successfully. Retrieved {} rows in {}ms",
                    result.row_count, result.execution_time_ms
                );
                state.query_result = Some(result);
                state.error = None;
            }
            Err(e) => {
                let msg = format!("Data extraction error: {}", e);
                error!("{}", msg);
                state.query_result = None;
                state.error = Some(msg);
            }
        }
    }
}
