//! Agent Orchestrator
//!
//! Runs resolve → extract → validate → respond on one shared state and
//! records every processed question in the query log.

use crate::agents::{Agent, AgentState, DataExtractionAgent, QueryResolutionAgent, ResponseAgent, ValidationAgent};
use crate::config::Settings;
use crate::data_layer::DataLayer;
use crate::error::Result;
use crate::llm::{get_llm, ChatModel};
use crate::observability::{QueryLogEntry, QueryLogger};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Temperature for answer writing; SQL generation uses the configured one.
pub const RESPONSE_TEMPERATURE: f64 = 0.3;

pub struct AgentOrchestrator {
    query_agent: QueryResolutionAgent,
    extraction_agent: DataExtractionAgent,
    validation_agent: ValidationAgent,
    response_agent: ResponseAgent,
    logger: QueryLogger,
}

impl AgentOrchestrator {
    /// Build the pipeline with models chosen from `settings`.
    pub fn new(settings: &Settings, data: Arc<DataLayer>) -> Result<Self> {
        let query_llm = get_llm(settings, None, None)?;
        let response_llm = get_llm(settings, Some(RESPONSE_TEMPERATURE), None)?;
        Ok(Self::with_models(settings, data, query_llm, response_llm))
    }

    pub fn with_models(
        settings: &Settings,
        data: Arc<DataLayer>,
        query_llm: Arc<dyn ChatModel>,
        response_llm: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            query_agent: QueryResolutionAgent::new(query_llm, data.clone()),
            extraction_agent: DataExtractionAgent::new(data),
            validation_agent: ValidationAgent::new(),
            response_agent: ResponseAgent::new(response_llm, settings.max_context_length),
            logger: QueryLogger::from_settings(settings),
        }
    }

    fn stages(&self) -> [&dyn Agent; 4] {
        [
            &self.query_agent,
            &self.extraction_agent,
            &self.validation_agent,
            &self.response_agent,
        ]
    }

    /// Run the full pipeline and return the final state.
    pub async fn process_query_with_details(&self, question: &str) -> AgentState {
        info!("Processing question: {}", question);
        let start = Instant::now();
        let mut state = AgentState::new(question);

        for agent in self.stages() {
            debug!("Running {} agent", agent.name());
            agent.run(&mut state).await;
        }

        self.record(&state, start.elapsed().as_millis() as u64);
        state
    }

    /// Run the full pipeline and return only the answer text.
    pub async fn process_query(&self, question: &str) -> String {
        self.process_query_with_details(question).await.final_answer
    }

    pub fn logger(&self) -> &QueryLogger {
        &self.logger
    }

    fn record(&self, state: &AgentState, elapsed_ms: u64) {
        let mut entry = QueryLogEntry::new(state.question.clone());
        entry.sql_generated = state.sql().map(str::to_string);
        entry.intent_type = state.query_intent.as_ref().map(|i| i.intent_type.clone());
        entry.rows_returned = state.query_result.as_ref().map(|r| r.row_count);
        entry.confidence = state.overall_confidence();
        entry.validation_passed = state.validation_passed;
        entry.error_message = state.error.clone();
        entry.execution_time_ms = elapsed_ms;

        if let Err(e) = self.logger.log_query(entry) {
            warn!("Failed to write query log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use polars::prelude::*;

    fn orchestrator() -> AgentOrchestrator {
        let df = df! [
            "state" => ["MAHARASHTRA", "KARNATAKA", "MAHARASHTRA", "GOA"],
            "category" => ["Set", "Kurta", "Kurta", "Set"],
            "amount" => [500.0, 300.0, 700.0, 150.0],
            "revenue" => [500.0, 300.0, 700.0, 150.0],
            "is_cancelled" => [false, true, false, false],
        ]
        .unwrap();

        let settings = Settings {
            llm_provider: LlmProvider::Mock,
            ..Settings::default()
        };
        AgentOrchestrator::new(&settings, Arc::new(DataLayer::from_frame(df, "sales"))).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_top_states() {
        let orchestrator = orchestrator();
        let state = orchestrator
            .process_query_with_details("Which are the top 5 states by revenue?")
            .await;

        assert!(state.error.is_none(), "{:?}", state.error);
        assert!(state.validation_passed);
        assert_eq!(state.query_result.as_ref().unwrap().row_count, 3);
        assert!(state.final_answer.contains("MAHARASHTRA"));
        assert!(state.overall_confidence().unwrap() > 0.5);
    }

    #[tokio::test]
    async fn test_pipeline_logs_each_question() {
        let orchestrator = orchestrator();
        orchestrator.process_query("What were our total sales?").await;
        orchestrator.process_query("What is our cancellation rate?").await;

        let recent = orchestrator.logger().recent(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].question, "What is our cancellation rate?");
        assert_eq!(recent[1].rows_returned, Some(1));
        assert!(recent[1].sql_generated.as_deref().unwrap().contains("SUM(revenue)"));
    }
}
