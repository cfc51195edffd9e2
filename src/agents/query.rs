use crate::agents::{Agent, AgentState, QueryIntent};
use crate::data_layer::DataLayer;
use crate::error::{InsightsError, Result};
use crate::execution::ensure_read_only;
use crate::llm::prompt::{create_prompt_template, extract_json_object};
use crate::llm::{ChatMessage, ChatModel};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

const SQL_INSTRUCTIONS: &str = r#"You translate business questions about retail sales into SQL.

Database schema:
{schema}

Rules:
1. Only query the table `{table}`.
2. Write a single read-only SELECT statement. Never modify data.
3. Use clear aliases for aggregates (total_revenue, total_orders, avg_order_value).
4. Filter out NULLs in GROUP BY dimensions.
5. Add ORDER BY and LIMIT for ranking questions.

Respond with only a JSON object of this shape:
{
  "intent_type": "aggregation | filter | comparison | trend | summary",
  "entities": {"metric": "...", "dimension": "...", "filters": {}, "limit": 10},
  "sql_query": "SELECT ...",
  "explanation": "One sentence on what the query computes"
}"#;

/// Turns a question into a [`QueryIntent`] with a read-only SQL query.
pub struct QueryResolutionAgent {
    llm: Arc<dyn ChatModel>,
    data: Arc<DataLayer>,
}

impl QueryResolutionAgent {
    pub fn new(llm: Arc<dyn ChatModel>, data: Arc<DataLayer>) -> Self {
        Self { llm, data }
    }

    fn build_messages(&self, question: &str) -> Result<Vec<ChatMessage>> {
        let instructions = SQL_INSTRUCTIONS
            .replace("{schema}", self.data.schema_context()?.trim_end())
            .replace("{table}", self.data.table_name());

        Ok(vec![
            ChatMessage::system(create_prompt_template("SQL Query Expert", &instructions)),
            ChatMessage::user(format!("Question: {}", question)),
        ])
    }

    pub async fn resolve(&self, question: &str) -> Result<QueryIntent> {
        let messages = self.build_messages(question)?;
        let reply = self.llm.invoke(&messages).await?;
        let intent = parse_intent(&reply)?;
        ensure_read_only(&intent.sql_query)?;
        Ok(intent)
    }
}

/// Pull the intent JSON out of a model reply and tidy the SQL.
pub fn parse_intent(reply: &str) -> Result<QueryIntent> {
    let json = extract_json_object(reply)?;
    let mut intent: QueryIntent = serde_json::from_str(json)
        .map_err(|e| InsightsError::Parse(format!("Invalid intent JSON: {}", e)))?;

    intent.sql_query = intent.sql_query.trim().trim_end_matches(';').trim_end().to_string();
    if intent.sql_query.is_empty() {
        return Err(InsightsError::Parse("Model returned an empty sql_query".to_string()));
    }

    Ok(intent)
}

#[async_trait]
impl Agent for QueryResolutionAgent {
    fn name(&self) -> &'static str {
        "query_resolution"
    }

    async fn run(&self, state: &mut AgentState) {
        match self.resolve(&state.question).await {
            Ok(intent) => {
                info!("Resolved {} intent: {}", intent.intent_type, intent.sql_query);
                state.query_intent = Some(intent);
                state.error = None;
            }
            Err(e) => {
                let msg = format!("Query resolution error: {}", e);
                error!("{}", msg);
                state.query_intent = None;
                state.error = Some(msg);
            }
        }
    }
}
