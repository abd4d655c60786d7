use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cu_metrics::api::IbanknetClient;
use cu_metrics::collector::Collector;
use cu_metrics::models::Config;

/// Scrape NCUA call reports and derive per-institution marketing metrics.
#[derive(Debug, Parser)]
#[command(name = "cu-metrics", version)]
struct Cli {
    /// Output path for the JSON metric table
    #[arg(long)]
    output: Option<String>,

    /// Maximum number of institutions processed concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Only process the first N institutions
    #[arg(long)]
    limit: Option<usize>,

    /// Override the report source base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cu_metrics=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrent_institutions = concurrency;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    config.institution_limit = cli.limit;

    let client = IbanknetClient::new(&config).context("failed to build the report client")?;
    let collector = Collector::new(Arc::new(client), config.clone());

    let today = chrono::Utc::now().date_naive();
    let report = collector.run(today).await?;

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&config.output_path, json)
        .with_context(|| format!("failed to write {}", config.output_path))?;
    info!(
        "wrote {} institution records to {}",
        report.institutions.len(),
        config.output_path
    );

    Ok(())
}
