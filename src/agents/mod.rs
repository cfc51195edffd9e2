//! Agent pipeline
//!
//! Four stages share one [`AgentState`]: query resolution writes the intent,
//! extraction writes the result, validation writes the verdict and scores,
//! and the response stage writes the final answer. Stages never fail outward;
//! a failure is recorded in `state.error` and later stages degrade.

pub mod extraction;
pub mod orchestrator;
pub mod query;
pub mod response;
pub mod validation;

use crate::execution::QueryResult;
use crate::validation::ConfidenceScores;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use extraction::DataExtractionAgent;
pub use orchestrator::AgentOrchestrator;
pub use query::QueryResolutionAgent;
pub use response::ResponseAgent;
pub use validation::ValidationAgent;

/// What the model understood the question to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    #[serde(default = "unknown_intent")]
    pub intent_type: String,

    /// Free-form entities (metric, dimension, filters, limit).
    #[serde(default)]
    pub entities: serde_json::Value,

    pub sql_query: String,

    #[serde(default)]
    pub explanation: String,
}

fn unknown_intent() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub question: String,
    pub query_intent: Option<QueryIntent>,
    pub query_result: Option<QueryResult>,
    pub validation_passed: bool,
    pub confidence_scores: Option<ConfidenceScores>,
    pub validation_warnings: Vec<String>,
    pub final_answer: String,
    pub error: Option<String>,
}

impl AgentState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn sql(&self) -> Option<&str> {
        self.query_intent.as_ref().map(|i| i.sql_query.as_str())
    }

    pub fn overall_confidence(&self) -> Option<f64> {
        self.confidence_scores.map(|s| s.overall)
    }
}

/// One pipeline stage.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &mut AgentState);
}
