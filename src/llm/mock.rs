//! Offline chat model
//!
//! Answers SQL-generation prompts with canned intents keyed on words in the
//! question, and answer prompts by echoing the data section back. Lets the
//! whole pipeline run without network access or API keys.

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel, Role};
use async_trait::async_trait;

/// Marker the query agent puts before the user's question.
pub const QUESTION_MARKER: &str = "Question:";
/// Marker the response agent puts before the serialized result.
pub const DATA_MARKER: &str = "Data Retrieved:";
/// Marker the response agent puts after the serialized result.
pub const INSTRUCTION_MARKER: &str = "Please provide";

const TOTAL_SALES: &str = r#"{
  "intent_type": "aggregation",
  "entities": {"metric": "revenue", "aggregation": "sum"},
  "sql_query": "SELECT SUM(revenue) AS total_revenue, COUNT(*) AS total_orders FROM sales",
  "explanation": "Calculate total revenue and order count from all orders"
}"#;

const TOP_STATES: &str = r#"{
  "intent_type": "aggregation",
  "entities": {"dimension": "state", "metric": "revenue", "limit": 5},
  "sql_query": "SELECT state, SUM(revenue) AS total_revenue, COUNT(*) AS orders FROM sales WHERE state IS NOT NULL GROUP BY state ORDER BY total_revenue DESC LIMIT 5",
  "explanation": "Find top 5 states by total revenue"
}"#;

const BY_CATEGORY: &str = r#"{
  "intent_type": "aggregation",
  "entities": {"dimension": "category", "metric": "revenue"},
  "sql_query": "SELECT category, SUM(revenue) AS total_revenue, COUNT(*) AS orders FROM sales WHERE category IS NOT NULL GROUP BY category ORDER BY total_revenue DESC",
  "explanation": "Analyze revenue by product category"
}"#;

const CANCELLATIONS: &str = r#"{
  "intent_type": "aggregation",
  "entities": {"metric": "cancellation_rate"},
  "sql_query": "SELECT SUM(CASE WHEN is_cancelled THEN 1 ELSE 0 END) * 100.0 / COUNT(*) AS cancellation_rate, SUM(CASE WHEN is_cancelled THEN 1 ELSE 0 END) AS cancelled_orders, COUNT(*) AS total_orders FROM sales",
  "explanation": "Calculate order cancellation rate"
}"#;

const OVERALL_SUMMARY: &str = r#"{
  "intent_type": "summary",
  "entities": {},
  "sql_query": "SELECT COUNT(*) AS total_orders, SUM(revenue) AS total_revenue, AVG(amount) AS avg_order_value FROM sales",
  "explanation": "Provide overall sales summary"
}"#;

#[derive(Debug, Default, Clone)]
pub struct MockLlm;

impl MockLlm {
    pub fn new() -> Self {
        Self
    }

    /// Canned intent JSON for a question.
    pub fn intent_for(question: &str) -> &'static str {
        let q = question.to_lowercase();
        if q.contains("total sales") || q.contains("total revenue") {
            TOTAL_SALES
        } else if q.contains("top") && q.contains("state") {
            TOP_STATES
        } else if q.contains("categor") {
            BY_CATEGORY
        } else if q.contains("cancel") {
            CANCELLATIONS
        } else {
            OVERALL_SUMMARY
        }
    }
}

#[async_trait]
impl ChatModel for MockLlm {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if let Some(idx) = prompt.find(DATA_MARKER) {
            let data = &prompt[idx + DATA_MARKER.len()..];
            let data = data.split(INSTRUCTION_MARKER).next().unwrap_or(data).trim();
            return Ok(format!("Here is what the data shows:\n\n{}", data));
        }

        let question = prompt
            .rfind(QUESTION_MARKER)
            .map(|idx| prompt[idx + QUESTION_MARKER.len()..].lines().next().unwrap_or("").trim())
            .unwrap_or(prompt);

        Ok(Self::intent_for(question).to_string())
    }
}
