use async_trait::async_trait;
use polars::prelude::*;
use retail_insights::agents::AgentOrchestrator;
use retail_insights::config::{LlmProvider, Settings};
use retail_insights::data_layer::DataLayer;
use retail_insights::llm::{ChatMessage, ChatModel, MockLlm};
use retail_insights::observability::QueryLogEntry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("retail_insights_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a small orders export with the header style of a raw sales report.
fn create_sales_csv(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut orders = df! [
        "Order ID" => ["171-001", "171-002", "171-003", "171-004", "171-005", "171-006"],
        "Status" => ["Shipped", "Shipped", "Cancelled", "Shipped", "Pending", "Shipped"],
        "Category" => ["Set", "Kurta", "Set", "Saree", "Kurta", "Set"],
        "Qty" => [1i64, 2, 0, 1, 1, 3],
        "Amount" => [1200.0, 800.0, 650.0, 2100.0, 400.0, 3000.0],
        "Revenue" => [1200.0, 800.0, 0.0, 2100.0, 400.0, 3000.0],
        "Ship State" => ["MAHARASHTRA", "KARNATAKA", "GOA", "MAHARASHTRA", "KERALA", "KARNATAKA"],
        "is_cancelled" => [false, false, true, false, false, false],
    ]?;

    let path = dir.join("sales.csv");
    let mut file = fs::File::create(&path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut orders)?;
    Ok(path)
}

fn mock_settings(dir: &Path, data_path: PathBuf) -> Settings {
    Settings {
        llm_provider: LlmProvider::Mock,
        data_path,
        query_log_path: Some(dir.join("queries.jsonl")),
        ..Settings::default()
    }
}

/// Always answers the SQL prompt with the same query.
struct FixedSqlModel(&'static str);

#[async_trait]
impl ChatModel for FixedSqlModel {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn model(&self) -> &str {
        "fixed"
    }

    async fn invoke(&self, _messages: &[ChatMessage]) -> retail_insights::Result<String> {
        Ok(format!(
            "{{\"intent_type\": \"filter\", \"entities\": {{}}, \"sql_query\": \"{}\", \"explanation\": \"fixed\"}}",
            self.0
        ))
    }
}

#[test]
fn test_load_csv_normalizes_headers() {
    let dir = temp_dir();
    let path = create_sales_csv(&dir).unwrap();

    let data = DataLayer::load_csv(&path, "sales").unwrap();
    assert_eq!(data.row_count(), 6);
    assert_eq!(
        data.columns(),
        vec!["order_id", "status", "category", "qty", "amount", "revenue", "ship_state", "is_cancelled"]
    );

    let df = data
        .execute_query("SELECT ship_state, SUM(revenue) AS total_revenue FROM sales GROUP BY ship_state ORDER BY total_revenue DESC")
        .unwrap();
    assert_eq!(df.height(), 4);
    assert_eq!(df.column("ship_state").unwrap().str().unwrap().get(0), Some("KARNATAKA"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_load_csv_missing_file() {
    let err = DataLayer::load_csv("/definitely/not/here.csv", "sales").err().unwrap();
    assert!(err.to_string().contains("File not found"));
}

#[test]
fn test_scientific_notation_strings_become_numbers() {
    let dir = temp_dir();
    let path = dir.join("sci.csv");
    fs::write(&path, "sku,units\nA,1.5E+3\nB,2e2\nC,7E0\n").unwrap();

    let data = DataLayer::load_csv(&path, "sales").unwrap();
    let units = data.frame().column("units").unwrap();
    assert_eq!(units.dtype(), &DataType::Float64);
    assert_eq!(units.f64().unwrap().get(0), Some(1500.0));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_mixed_text_column_keeps_its_values() {
    let dir = temp_dir();
    let path = dir.join("skus.csv");
    fs::write(&path, "sku,units\n2E5,1\nKURTA-XL,2\nSET-M,3\n").unwrap();

    let data = DataLayer::load_csv(&path, "sales").unwrap();
    let sku = data.frame().column("sku").unwrap();
    assert_eq!(sku.dtype(), &DataType::String);
    assert_eq!(sku.null_count(), 0);

    let df = data.execute_query("SELECT units FROM sales WHERE sku = 'KURTA-XL'").unwrap();
    assert_eq!(df.height(), 1);

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_demo_questions_end_to_end() {
    let dir = temp_dir();
    let path = create_sales_csv(&dir).unwrap();
    let settings = mock_settings(&dir, path.clone());
    let data = Arc::new(DataLayer::load_csv(&path, "sales").unwrap());
    let orchestrator = AgentOrchestrator::new(&settings, data).unwrap();

    let state = orchestrator.process_query_with_details("What were our total sales?").await;
    assert!(state.validation_passed, "{:?}", state.error);
    assert_eq!(state.query_intent.as_ref().unwrap().intent_type, "aggregation");
    let result = state.query_result.as_ref().unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.records[0]["total_revenue"], 7500.0);
    assert!(state.final_answer.contains("7500"));

    let state = orchestrator.process_query_with_details("Show me revenue by product category").await;
    assert!(state.validation_passed, "{:?}", state.error);
    assert_eq!(state.query_result.as_ref().unwrap().row_count, 3);
    assert!(state.overall_confidence().unwrap() > 0.9);

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_bad_sql_surfaces_extraction_error() {
    let dir = temp_dir();
    let path = create_sales_csv(&dir).unwrap();
    let settings = mock_settings(&dir, path.clone());
    let data = Arc::new(DataLayer::load_csv(&path, "sales").unwrap());

    let orchestrator = AgentOrchestrator::with_models(
        &settings,
        data,
        Arc::new(FixedSqlModel("SELECT region FROM sales")),
        Arc::new(MockLlm::new()),
    );
    let state = orchestrator.process_query_with_details("Which region performed best?").await;

    assert!(!state.validation_passed);
    assert!(state.query_result.is_none());
    assert!(state
        .final_answer
        .starts_with("I encountered an issue processing your query: Data extraction error:"));

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_negative_revenue_fails_validation() {
    let dir = temp_dir();
    let path = create_sales_csv(&dir).unwrap();
    let settings = mock_settings(&dir, path.clone());
    let data = Arc::new(DataLayer::load_csv(&path, "sales").unwrap());

    let orchestrator = AgentOrchestrator::with_models(
        &settings,
        data,
        Arc::new(FixedSqlModel("SELECT order_id, revenue - 1000 AS revenue FROM sales")),
        Arc::new(MockLlm::new()),
    );
    let state = orchestrator.process_query_with_details("Revenue net of fees?").await;

    assert!(!state.validation_passed);
    assert_eq!(
        state.final_answer,
        "I encountered an issue processing your query: Validation failed: Negative values in revenue: 3"
    );
    assert!(state.confidence_scores.unwrap().overall < 1.0);

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_write_statement_never_reaches_data() {
    let dir = temp_dir();
    let path = create_sales_csv(&dir).unwrap();
    let settings = mock_settings(&dir, path.clone());
    let data = Arc::new(DataLayer::load_csv(&path, "sales").unwrap());

    let orchestrator = AgentOrchestrator::with_models(
        &settings,
        data.clone(),
        Arc::new(FixedSqlModel("DROP TABLE sales")),
        Arc::new(MockLlm::new()),
    );
    let state = orchestrator.process_query_with_details("Clean up the table").await;

    assert!(state.query_intent.is_none());
    assert!(state
        .final_answer
        .contains("Query resolution error: Unsafe query: Only read-only SELECT queries are allowed"));
    assert_eq!(data.row_count(), 6);

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_query_log_written_as_json_lines() {
    let dir = temp_dir();
    let path = create_sales_csv(&dir).unwrap();
    let settings = mock_settings(&dir, path.clone());
    let data = Arc::new(DataLayer::load_csv(&path, "sales").unwrap());
    let orchestrator = AgentOrchestrator::new(&settings, data).unwrap();

    orchestrator.process_query("What were our total sales?").await;
    orchestrator.process_query("What is our cancellation rate?").await;

    let contents = fs::read_to_string(dir.join("queries.jsonl")).unwrap();
    let entries: Vec<QueryLogEntry> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].question, "What were our total sales?");
    assert!(entries[0].validation_passed);
    assert_eq!(entries[0].rows_returned, Some(1));
    assert_ne!(entries[0].query_id, entries[1].query_id);

    let _ = fs::remove_dir_all(dir);
}
