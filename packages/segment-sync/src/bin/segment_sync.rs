//! Run one segment sync and exit.
//!
//! Meant to be invoked by an external scheduler (cron, systemd timer, ...).
//! Exits non-zero when configuration is invalid, the membership fetch fails,
//! or the snapshot cannot be saved. Individual event failures are logged but
//! do not fail the run.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use segment_sync::klaviyo::client_from_config;
use segment_sync::{run_once, Config, FileSnapshotStore, Reconciler, RunOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "segment-sync")]
#[command(about = "Emit Joined/Left Segment events for Klaviyo segment membership changes")]
struct Cli {
    /// JSON config file (API_KEY, SEGMENT_ID, SEGMENT_NAME, CACHE_FILE).
    /// Configuration is read from the environment when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log the membership changes without sending events or saving the snapshot
    #[arg(long)]
    dry_run: bool,

    /// Profiles per page (1-100)
    #[arg(long)]
    page_size: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,segment_sync=debug,klaviyo_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Segment sync failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };
    let config = match cli.page_size {
        Some(page_size) => config.with_page_size(page_size)?,
        None => config,
    };
    tracing::info!(
        segment_id = %config.segment.segment_id,
        segment = %config.segment.segment_name,
        cache_file = %config.cache_file.display(),
        page_size = config.page_size,
        "Configuration loaded"
    );

    let client = Arc::new(client_from_config(&config).context("Failed to create Klaviyo client")?);
    let reconciler = Reconciler::new(client.clone(), FileSnapshotStore::new(&config.cache_file));

    let options = RunOptions {
        page_size: config.page_size,
        dry_run: cli.dry_run,
    };

    let report = run_once(&client, &reconciler, &config.segment, options).await?;

    if report.failure_count() > 0 {
        tracing::warn!(
            failed = report.failure_count(),
            "Some events were not delivered; they will not be retried"
        );
    }

    Ok(())
}
