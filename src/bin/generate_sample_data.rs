use anyhow::Result;
use clap::Parser;
use retail_insights::sample_data::{generate, write_csv, DEFAULT_ROWS, DEFAULT_SEED};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "generate-sample-data")]
#[command(about = "Write a synthetic retail sales CSV")]
struct Args {
    /// Output file
    #[arg(short, long, default_value = "data/sales_data.csv")]
    output: PathBuf,

    /// Number of orders
    #[arg(short, long, default_value_t = DEFAULT_ROWS)]
    rows: usize,

    /// RNG seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut df = generate(args.rows, args.seed)?;
    write_csv(&mut df, &args.output)?;

    println!("✅ Created {} ({} orders)", args.output.display(), df.height());
    Ok(())
}
