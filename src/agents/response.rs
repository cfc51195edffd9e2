use crate::agents::{Agent, AgentState};
use crate::error::Result;
use crate::llm::prompt::{create_prompt_template, truncate_chars};
use crate::llm::{ChatMessage, ChatModel};
use crate::profile::FrameProfile;
use async_trait::async_trait;
use polars::prelude::*;
use std::sync::Arc;
use tracing::{error, info};

/// Columns worth showing the model when a result is wide.
const IMPORTANT_COLUMNS: [&str; 16] = [
    "order_id",
    "date",
    "category",
    "product",
    "qty",
    "amount",
    "status",
    "fulfilled_by",
    "ship_city",
    "ship_state",
    "size",
    "total",
    "sales",
    "revenue",
    "quantity",
    "price",
];

const MAX_LISTED_COLUMNS: usize = 15;
const MAX_TABLE_COLUMNS: usize = 10;
const FULL_TABLE_ROWS: usize = 10;
const SAMPLE_ROWS: usize = 5;
const TRUNCATION_MARKER: &str = "\n... (truncated)";

const RESPONSE_INSTRUCTIONS: &str = "You provide clear, insightful answers to business questions about retail sales data.

Your responses should:
1. Directly answer the user's question
2. Highlight key insights and trends
3. Use specific numbers and percentages
4. Be concise but comprehensive
5. Provide context and business implications when relevant
6. Format data clearly (use bullet points, tables, or structured text)

If the data shows trends, explain what they mean for the business.
If comparing values, clearly state the differences and their significance.";

/// Writes the final natural-language answer.
pub struct ResponseAgent {
    llm: Arc<dyn ChatModel>,
    max_context_length: usize,
}

impl ResponseAgent {
    pub fn new(llm: Arc<dyn ChatModel>, max_context_length: usize) -> Self {
        Self {
            llm,
            max_context_length,
        }
    }

    async fn generate(&self, question: &str, explanation: &str, df: Option<&DataFrame>) -> Result<String> {
        let data_summary = match df {
            Some(df) => format_results(df, self.max_context_length)?,
            None => "No data found matching the query criteria.".to_string(),
        };

        let messages = vec![
            ChatMessage::system(create_prompt_template(
                "Retail Analytics Response Specialist",
                RESPONSE_INSTRUCTIONS,
            )),
            ChatMessage::user(format!(
                "Original Question: {}\n\nQuery Explanation: {}\n\nData Retrieved:\n{}\n\nPlease provide a clear, business-focused answer to the original question based on this data.\n",
                question, explanation, data_summary
            )),
        ];

        self.llm.invoke(&messages).await
    }
}

#[async_trait]
impl Agent for ResponseAgent {
    fn name(&self) -> &'static str {
        "response"
    }

    async fn run(&self, state: &mut AgentState) {
        if !state.validation_passed {
            let reason = state.error.as_deref().unwrap_or("Unknown error");
            state.final_answer = format!("I encountered an issue processing your query: {}", reason);
            return;
        }

        let (Some(result), Some(intent)) = (state.query_result.as_ref(), state.query_intent.as_ref()) else {
            state.final_answer = "I couldn't process your query. Please try rephrasing your question.".to_string();
            return;
        };

        let answer = self
            .generate(&state.question, &intent.explanation, result.data.as_ref())
            .await;

        state.final_answer = match answer {
            Ok(answer) => {
                info!("Response generated successfully");
                answer
            }
            Err(e) => {
                let msg = format!("Response generation error: {}", e);
                error!("{}", msg);
                format!("I encountered an error generating the response: {}", msg)
            }
        };
    }
}

/// Serialize a result for the answer prompt, bounded to `max_chars`.
pub fn format_results(df: &DataFrame, max_chars: usize) -> Result<String> {
    if df.height() == 0 || df.width() == 0 {
        return Ok("No data found matching the query criteria.".to_string());
    }

    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut shown: Vec<&str> = IMPORTANT_COLUMNS
        .iter()
        .copied()
        .filter(|c| names.iter().any(|n| n == c))
        .collect();
    if shown.is_empty() {
        shown = names.iter().take(MAX_TABLE_COLUMNS).map(String::as_str).collect();
    }
    shown.truncate(MAX_TABLE_COLUMNS);

    let mut out = format!("Results: {} records, {} columns\n", df.height(), df.width());
    out.push_str("Columns: ");
    out.push_str(&names.iter().take(MAX_LISTED_COLUMNS).cloned().collect::<Vec<_>>().join(", "));
    if names.len() > MAX_LISTED_COLUMNS {
        out.push_str(&format!("... (+{} more)", names.len() - MAX_LISTED_COLUMNS));
    }
    out.push_str("\n\n");

    if df.height() <= FULL_TABLE_ROWS {
        out.push_str(&render_table(df, &shown, df.height())?);
    } else {
        let stats = FrameProfile::from_frame(df)?.describe();
        if !stats.is_empty() {
            out.push_str("Summary Statistics:\n");
            out.push_str(&stats);
            out.push('\n');
        }
        out.push_str(&format!("Sample Data (first {} rows):\n", SAMPLE_ROWS));
        out.push_str(&render_table(df, &shown, SAMPLE_ROWS)?);
        out.push_str(&format!("\n\n(Showing {} of {} total records)", SAMPLE_ROWS, df.height()));
    }

    // The marker counts against the bound.
    if out.chars().count() > max_chars {
        let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
        let mut cut = truncate_chars(&out, keep).to_string();
        cut.push_str(TRUNCATION_MARKER);
        return Ok(cut);
    }
    Ok(out)
}

/// Right-aligned plain text table of the first `rows` rows.
fn render_table(df: &DataFrame, columns: &[&str], rows: usize) -> Result<String> {
    let rows = rows.min(df.height());
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(columns.len());

    for name in columns {
        let series = df.column(name)?;
        let mut column = Vec::with_capacity(rows + 1);
        column.push(name.to_string());
        for idx in 0..rows {
            column.push(display_value(&series.get(idx)?));
        }
        cells.push(column);
    }

    let widths: Vec<usize> = cells
        .iter()
        .map(|c| c.iter().map(|v| v.chars().count()).max().unwrap_or(0))
        .collect();

    let lines: Vec<String> = (0..=rows)
        .map(|row| {
            cells
                .iter()
                .zip(&widths)
                .map(|(column, w)| format!("{:>width$}", column[row], width = w))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect();

    Ok(lines.join("\n"))
}

fn display_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(f) => format_float(*f),
        AnyValue::Float32(f) => format_float(*f as f64),
        other => other.to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{:.2}", f)
    }
}
