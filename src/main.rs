use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retail_insights::agents::{AgentOrchestrator, AgentState};
use retail_insights::config::{LlmProvider, Settings};
use retail_insights::data_layer::DataLayer;
use retail_insights::observability::init_tracing;
use retail_insights::sample_data;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const DEMO_QUESTIONS: [&str; 4] = [
    "What were our total sales?",
    "Which are the top 5 states by revenue?",
    "Show me revenue by product category",
    "What is our cancellation rate?",
];

#[derive(Parser)]
#[command(name = "retail-insights")]
#[command(about = "Ask questions about retail sales data in plain language")]
#[command(version)]
struct Args {
    /// Sales CSV to load (overrides DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Table name used in generated SQL (overrides TABLE_NAME)
    #[arg(long, global = true)]
    table: Option<String>,

    /// LLM provider: openai, google, openrouter, groq or mock (overrides LLM_PROVIDER)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question
    Ask {
        question: String,

        /// Print the whole pipeline state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run SQL directly against the loaded table
    Sql { query: String },
    /// Show the table schema given to the model
    Schema,
    /// Show row counts and numeric column statistics
    Stats,
    /// Interactive question loop
    Chat,
    /// Offline walk-through with the mock model
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let mut settings = Settings::from_env()?;
    if let Some(data) = args.data {
        settings.data_path = data;
    }
    if let Some(table) = args.table {
        settings.table_name = table;
    }
    if let Some(provider) = args.provider {
        settings.llm_provider = provider.parse()?;
    }

    init_tracing(&settings);

    match args.command {
        Commands::Ask { question, json } => {
            let orchestrator = AgentOrchestrator::new(&settings, load_data(&settings)?)?;
            let state = orchestrator.process_query_with_details(&question).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_state(&state);
            }
        }
        Commands::Sql { query } => {
            let data = load_data(&settings)?;
            let df = data.execute_query(&query)?;
            println!("{}", df);
        }
        Commands::Schema => {
            let data = load_data(&settings)?;
            println!("{}", data.schema_context()?);
        }
        Commands::Stats => {
            let data = load_data(&settings)?;
            let stats = data.summary_stats()?;
            println!("Table: {}", stats.table_name);
            println!("Rows: {}", stats.row_count);
            println!("Columns: {}", stats.column_count);
            for column in &stats.numeric_columns {
                println!(
                    "  - {}: sum={:.2}, mean={}, min={}, max={}, nulls={}",
                    column.name,
                    column.sum,
                    fmt_opt(column.mean),
                    fmt_opt(column.min),
                    fmt_opt(column.max),
                    column.null_count
                );
            }
        }
        Commands::Chat => {
            let orchestrator = AgentOrchestrator::new(&settings, load_data(&settings)?)?;
            chat(&orchestrator).await?;
        }
        Commands::Demo => {
            settings.llm_provider = LlmProvider::Mock;
            let data = if settings.data_path.exists() {
                load_data(&settings)?
            } else {
                warn!(
                    "{} not found, using {} generated orders",
                    settings.data_path.display(),
                    sample_data::DEFAULT_ROWS
                );
                let df = sample_data::generate(sample_data::DEFAULT_ROWS, sample_data::DEFAULT_SEED)?;
                Arc::new(DataLayer::from_frame(df, &settings.table_name))
            };

            let orchestrator = AgentOrchestrator::new(&settings, data)?;
            for (i, question) in DEMO_QUESTIONS.iter().enumerate() {
                println!("\n=== Question {}/{}: {} ===", i + 1, DEMO_QUESTIONS.len(), question);
                let state = orchestrator.process_query_with_details(question).await;
                print_state(&state);
            }
            println!(
                "\nSuccess rate: {:.0}%",
                orchestrator.logger().success_rate() * 100.0
            );
        }
    }

    Ok(())
}

fn load_data(settings: &Settings) -> Result<Arc<DataLayer>> {
    let data = DataLayer::load_csv(&settings.data_path, &settings.table_name).with_context(|| {
        format!(
            "Could not load {}. Run generate-sample-data or pass --data",
            settings.data_path.display()
        )
    })?;
    info!("Loaded {} rows into table {}", data.row_count(), data.table_name());
    Ok(Arc::new(data))
}

async fn chat(orchestrator: &AgentOrchestrator) -> Result<()> {
    println!("Ask a question about your sales data (type 'exit' to quit).");
    let stdin = io::stdin();

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let state = orchestrator.process_query_with_details(question).await;
        print_state(&state);
    }

    Ok(())
}

fn print_state(state: &AgentState) {
    println!("\n{}", state.final_answer);
    if let Some(sql) = state.sql() {
        println!("\nSQL: {}", sql);
    }
    if let Some(scores) = state.confidence_scores {
        println!(
            "Confidence: {:.1}% (quality {:.2}, completeness {:.2}, consistency {:.2})",
            scores.overall * 100.0,
            scores.data_quality,
            scores.completeness,
            scores.consistency
        );
    }
    for warning in &state.validation_warnings {
        println!("Warning: {}", warning);
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".to_string())
}
