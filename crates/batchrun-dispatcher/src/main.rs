//! BatchRun dispatcher server.
//!
//! Accepts batches over HTTP and fans each item out to its target endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use batchrun_dispatcher::http::create_router;
use batchrun_dispatcher::{AppState, Dispatcher, DispatcherConfig, HttpExecutor};

/// BatchRun dispatcher server.
#[derive(Parser, Debug)]
#[command(name = "batchrun-server", about = "BatchRun bounded-concurrency dispatcher")]
struct Args {
    /// HTTP server address
    #[arg(long, default_value = "[::1]:50052")]
    bind_addr: String,

    /// Concurrency used when a batch does not request one
    #[arg(long, default_value = "10")]
    default_concurrency: usize,

    /// Highest concurrency a batch may request
    #[arg(long, default_value = "64")]
    max_concurrency: usize,

    /// Maximum number of items per batch
    #[arg(long, default_value = "1000")]
    max_items: usize,

    /// Per-item timeout in milliseconds (unset means no scheduler timeout)
    #[arg(long)]
    item_timeout_ms: Option<u64>,

    /// Request timeout of the outbound HTTP client, in seconds
    #[arg(long, default_value = "30")]
    http_timeout_secs: u64,
}

impl From<Args> for DispatcherConfig {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: args.bind_addr,
            default_concurrency: args.default_concurrency,
            max_concurrency: args.max_concurrency,
            max_items: args.max_items,
            item_timeout: args.item_timeout_ms.map(Duration::from_millis),
            http_timeout: Duration::from_secs(args.http_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("batchrun=info".parse()?))
        .with_target(true)
        .init();

    let config = DispatcherConfig::from(args);
    let addr: SocketAddr = config.bind_addr.parse()?;

    let executor = HttpExecutor::new(config.http_timeout)?;
    let dispatcher = Dispatcher::new(&config, Arc::new(executor));
    let state = AppState::new(dispatcher);
    let router = create_router(state);

    info!(
        addr = %addr,
        default_concurrency = config.default_concurrency,
        max_concurrency = config.max_concurrency,
        max_items = config.max_items,
        "Starting BatchRun dispatcher"
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("BatchRun dispatcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
