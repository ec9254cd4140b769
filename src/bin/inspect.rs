use anyhow::{Context, Result};
use clap::Parser;
use skillcoach::config::DatabaseArgs;
use skillcoach::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(
    name = "skillcoach-inspect",
    about = "Print record count, embedding size, and the first stored chunks"
)]
struct InspectCli {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Number of records to list
    #[arg(long, default_value_t = 5)]
    limit: usize,

    /// Print the listing as JSON lines instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = InspectCli::parse();
    let store = cli.database.connect().await?;
    let dims = store.require_table()?;
    let total = store.count().await?;
    let records = store.sample(cli.limit).await?;

    println!("table:      {}", store.table().qualified());
    println!("records:    {total}");
    println!("dimensions: {dims}");
    if records.is_empty() {
        println!("no records stored; run skillcoach-ingest first.");
        return Ok(());
    }
    for record in &records {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string(record).context("failed to encode record")?
            );
        } else {
            println!(
                "{:>6}  {:<32}  {:<40}  #{}",
                record.id, record.title, record.source, record.sequence_index
            );
        }
    }
    Ok(())
}
