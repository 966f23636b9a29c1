//! HEYEN Immobilien → CSV + Airtable 同期 CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tower::Service;
use tracing_subscriber::EnvFilter;

use immo_sync::{AppConfig, SyncRequest, SyncService};

#[derive(Parser)]
#[command(name = "immo-sync")]
#[command(about = "Scrape HEYEN Immobilien listings, export CSV and sync to Airtable")]
struct Cli {
    /// CSV output path (default: OUTPUT_CSV or heyen_immobilien.csv)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Only scrape and export, never contact Airtable
    #[arg(long)]
    no_sync: bool,

    /// Compute and log the sync plan without applying it
    #[arg(long)]
    dry_run: bool,

    /// Delete invalid rows from the table after syncing
    #[arg(long)]
    cleanup: bool,

    /// Re-render listing pages with headless Chrome when HTTP finds no links
    #[arg(long)]
    browser_fallback: bool,

    /// Maximum number of detail pages to scrape
    #[arg(long)]
    limit: Option<usize>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ログ設定（RUST_LOG が優先）
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = AppConfig::from_env();
    let mut service = SyncService::from_config(config).context("failed to initialise")?;

    let mut request = SyncRequest::new()
        .with_no_sync(cli.no_sync)
        .with_dry_run(cli.dry_run)
        .with_cleanup(cli.cleanup)
        .with_browser_fallback(cli.browser_fallback)
        .with_limit(cli.limit);
    if let Some(path) = cli.output {
        request = request.with_output(path);
    }

    let report = service.call(request).await.context("sync run failed")?;

    println!("=== HEYEN Immobilien ===");
    println!(
        "Objekte: {} (Kaufen: {}, Mieten: {}), Bilder: {}, Fehler: {}",
        report.extracted,
        report.buy,
        report.rent,
        report.images,
        report.failures.len()
    );
    if let Some(path) = &report.csv_path {
        println!("CSV: {}", path.display());
    }
    if let Some(plan) = &report.plan {
        println!(
            "Plan (dry run): +{} ~{} -{} (Duplikate: {}, ungültig: {})",
            plan.create, plan.update, plan.delete, plan.redundant, plan.invalid
        );
    }
    if let Some(sync) = &report.sync {
        println!(
            "Airtable: +{} ~{} -{} (Duplikate: {}, bereinigt: {})",
            sync.created, sync.updated, sync.deleted, sync.pruned, sync.cleaned
        );
    }

    Ok(())
}
