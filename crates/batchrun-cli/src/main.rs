//! BatchRun CLI - Command line interface for the BatchRun dispatcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use batchrun_client::HttpClient;
use batchrun_core::{BatchRequest, BatchResult, ItemError, OutcomeStatus, RequestDescriptor};
use batchrun_dispatcher::{Dispatcher, DispatcherConfig, HttpExecutor};

/// BatchRun CLI - Bounded-concurrency batch dispatcher
#[derive(Parser)]
#[command(name = "batchrun")]
#[command(about = "CLI for the BatchRun dispatcher", long_about = None)]
struct Cli {
    /// Dispatcher server address
    #[arg(short, long, default_value = "http://[::1]:50052")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch file to a running dispatcher
    Submit {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Run a batch file in-process, without a server
    Run {
        #[command(flatten)]
        batch: BatchArgs,

        /// Per-item timeout in milliseconds
        #[arg(long)]
        item_timeout_ms: Option<u64>,

        /// Request timeout of the outbound HTTP client, in seconds
        #[arg(long, default_value = "30")]
        http_timeout_secs: u64,
    },

    /// Check dispatcher health
    Health,

    /// Print dispatcher metrics
    Metrics,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// JSON file holding a batch request or a bare array of items
    #[arg(short, long)]
    file: PathBuf,

    /// Override the batch concurrency limit
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Override the batch deadline, in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Print the raw JSON result instead of a table
    #[arg(long)]
    json: bool,
}

/// Accepted shapes of a batch file.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Items(Vec<RequestDescriptor>),
    Request(BatchRequest),
}

impl BatchArgs {
    fn load(&self) -> Result<BatchRequest, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(&self.file)
            .map_err(|e| format!("Failed to read '{}': {}", self.file.display(), e))?;
        let mut request = parse_batch_file(&contents, &self.file)?;

        if let Some(limit) = self.concurrency {
            request.concurrency_limit = Some(limit);
        }
        if let Some(deadline_ms) = self.deadline_ms {
            request.deadline_ms = Some(deadline_ms);
        }
        Ok(request)
    }
}

fn parse_batch_file(contents: &str, path: &Path) -> Result<BatchRequest, String> {
    let file: BatchFile = serde_json::from_str(contents)
        .map_err(|e| format!("Invalid batch file '{}': {}", path.display(), e))?;
    Ok(match file {
        BatchFile::Items(items) => BatchRequest::new(items),
        BatchFile::Request(request) => request,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("batchrun=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit { batch } => {
            submit(&cli.addr, batch).await?;
        }
        Commands::Run {
            batch,
            item_timeout_ms,
            http_timeout_secs,
        } => {
            run_local(batch, item_timeout_ms, http_timeout_secs).await?;
        }
        Commands::Health => {
            health(&cli.addr).await?;
        }
        Commands::Metrics => {
            metrics(&cli.addr).await?;
        }
    }

    Ok(())
}

async fn submit(addr: &str, batch: BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let request = batch.load()?;
    let client = HttpClient::new(addr);

    let result = client.submit_batch(&request).await?;
    output(&result, batch.json)
}

async fn run_local(
    batch: BatchArgs,
    item_timeout_ms: Option<u64>,
    http_timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = batch.load()?;

    let config = DispatcherConfig {
        item_timeout: item_timeout_ms.map(Duration::from_millis),
        http_timeout: Duration::from_secs(http_timeout_secs),
        ..DispatcherConfig::default()
    };
    let executor = HttpExecutor::new(config.http_timeout)?;
    let dispatcher = Dispatcher::new(&config, Arc::new(executor));

    // Ctrl-C stops admitting items; running items still finish.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining items");
            on_signal.cancel();
        }
    });

    let result = dispatcher.dispatch_with_cancel(request, cancel).await?;
    output(&result, batch.json)
}

async fn health(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new(addr);
    if client.health().await? {
        println!("Dispatcher at {} is healthy", addr);
        Ok(())
    } else {
        Err(format!("Dispatcher at {} is unhealthy", addr).into())
    }
}

async fn metrics(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new(addr);
    print!("{}", client.metrics().await?);
    Ok(())
}

fn output(result: &BatchResult, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_result(result);
    }
    Ok(())
}

fn print_result(result: &BatchResult) {
    println!("Batch {}:", result.batch_id);
    println!(
        "  Items:      {} ({} succeeded, {} failed, {} cancelled)",
        result.total(),
        result.succeeded_count,
        result.failed_count,
        result.cancelled_count
    );
    println!("  Elapsed:    {} ms", result.elapsed_ms);

    if result.outcomes.is_empty() {
        return;
    }

    println!();
    println!("{:<6}  {:<10}  {:>10}  {}", "INDEX", "STATUS", "DURATION", "DETAIL");
    println!("{}", "-".repeat(80));

    for outcome in &result.outcomes {
        let duration = outcome
            .duration_ms
            .map(|ms| format!("{ms} ms"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6}  {:<10}  {:>10}  {}",
            outcome.index,
            status_name(outcome.status),
            duration,
            detail(outcome.error_detail.as_ref(), outcome.payload.as_ref())
        );
    }
}

fn status_name(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Success => "SUCCESS",
        OutcomeStatus::Error => "ERROR",
        OutcomeStatus::Cancelled => "CANCELLED",
    }
}

fn detail(error: Option<&ItemError>, payload: Option<&serde_json::Value>) -> String {
    let text = match (error, payload) {
        (Some(error), _) => error.to_string(),
        (None, Some(payload)) => payload.to_string(),
        (None, None) => String::new(),
    };
    truncate(&text, 48)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    }
}
