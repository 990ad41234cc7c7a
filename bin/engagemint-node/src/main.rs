//! engagemint worker binary
//!
//! One process run is one worker invocation, mirroring the external
//! scheduler's model: read the trigger event payload, run the minting round
//! against persistent storage, and print the resulting call data as JSON for
//! the submitting layer. A day is driven by invoking this binary once per
//! on-chain trigger until the finish call appears.

mod config;

use anyhow::{bail, Result};
use clap::Parser;
use config::NodeConfig;
use engagemint_archive::HttpArchive;
use engagemint_chain::MintingEvent;
use engagemint_social::{DirectoryConnector, HttpDirectoryClient, HttpSocialApi};
use engagemint_storage::FileStore;
use engagemint_types::MintingDay;
use engagemint_worker::{InvocationOutcome, MintingWorker, WorkerMetrics};
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "engagemint-node")]
#[command(about = "Social-engagement batch-minting worker", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Path to the trigger event payload (JSON)
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// Synthesize a day-start trigger for this timestamp instead of reading
    /// an event file
    #[arg(long)]
    day: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::load(&cli.config)?;
    config.validate()?;

    let payload = match (&cli.event, cli.day) {
        (Some(path), _) => std::fs::read(path)?,
        (None, Some(timestamp)) => serde_json::to_vec(&MintingEvent {
            minting_day_timestamp: MintingDay::new(timestamp),
            batches: Vec::new(),
        })?,
        (None, None) => bail!("either --event or --day is required"),
    };

    info!(
        platform = %config.platform,
        config = %cli.config,
        "starting minting worker invocation"
    );

    let store = Arc::new(FileStore::new(config.storage_root.clone())?);
    let api = Arc::new(HttpSocialApi::new(config.social_config())?);
    let directory_client = Arc::new(HttpDirectoryClient::new(config.directory_config())?);
    let directory = DirectoryConnector::new(directory_client.clone(), directory_client);
    let sink = Arc::new(HttpArchive::new(config.archive_config())?);

    let registry = Registry::new();
    let metrics = Arc::new(WorkerMetrics::new(&registry)?);
    let worker = MintingWorker::new(config.worker_config(), store, api, directory, sink)?
        .with_metrics(metrics);
    let outcome = worker.handle_event(&payload).await;

    match &outcome {
        InvocationOutcome::Execute { calls } => {
            info!(calls = calls.len(), "invocation produced calls");
        }
        InvocationOutcome::NotExecutable { reason } => {
            warn!(reason = %reason, "invocation not executable");
        }
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
