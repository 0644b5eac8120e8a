//! Vacancy-Harvest main entry point
//!
//! This is the command-line interface for the Vacancy-Harvest job-listing
//! harvester.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use vacancy_harvest::config::{load_config_with_hash, resolve_seed_urls, Config};
use vacancy_harvest::crawler::harvest;
use vacancy_harvest::output::{
    generate_markdown_summary, load_statistics, print_statistics, FanoutSink, JsonLinesSink,
    RecordSink, SqliteSink,
};
use vacancy_harvest::storage::{open_storage, Storage};

/// Vacancy-Harvest: a bounded job-listing harvester
///
/// Vacancy-Harvest crawls hh.ru search results, follows vacancy pages (or
/// reads the listing cards directly), and stores structured job records
/// until the target count or the page budget is reached.
#[derive(Parser, Debug)]
#[command(name = "vacancy-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded job-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the number of records to save
    #[arg(long, value_name = "N")]
    target: Option<i64>,

    /// Override the number of listing pages visited per seed
    #[arg(long, value_name = "N")]
    max_pages: Option<i64>,

    /// Harvest listing cards instead of visiting vacancy pages
    #[arg(long)]
    cards_only: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("vacancy_harvest=info,warn"),
            1 => EnvFilter::new("vacancy_harvest=debug,info"),
            2 => EnvFilter::new("vacancy_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides, clamping counts to at least 1
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(target) = cli.target {
        config.crawler.target = target.max(1) as usize;
    }
    if let Some(pages) = cli.max_pages {
        config.crawler.page_budget = pages.max(1) as usize;
    }
    if cli.cards_only {
        config.crawler.collect_details = false;
    }
}

/// Handles the --dry-run mode: validates config and shows the seeds
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Vacancy-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Target: {}", config.crawler.target);
    println!("  Page budget per seed: {}", config.crawler.page_budget);
    println!(
        "  Mode: {}",
        if config.crawler.collect_details {
            "vacancy pages"
        } else {
            "listing cards"
        }
    );
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nPoliteness:");
    println!(
        "  Listing: {} req/min, {}-{}ms delay",
        config.politeness.listing_requests_per_minute,
        config.politeness.listing_delay_ms[0],
        config.politeness.listing_delay_ms[1]
    );
    println!(
        "  Vacancy: {} req/min, {}-{}ms delay",
        config.politeness.detail_requests_per_minute,
        config.politeness.detail_delay_ms[0],
        config.politeness.detail_delay_ms[1]
    );

    println!("\nSessions:");
    println!("  Pool size: {}", config.sessions.pool_size);
    println!("  Max usage: {}", config.sessions.max_usage);
    println!("  TTL: {}s", config.sessions.ttl_secs);
    println!(
        "  Proxy: {}",
        if config.proxy.is_some() {
            "configured"
        } else {
            "none"
        }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(path) = &config.output.jsonl_path {
        println!("  JSON Lines: {}", path);
    }
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }

    let seeds = resolve_seed_urls(config)?;
    println!("\nSeed URLs ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str) -> Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open {}", config.output.database_path))?;
    let run_id = storage.create_run(
        config_hash,
        config.crawler.target.max(1),
        config.crawler.collect_details,
    )?;
    tracing::info!("Starting run {}", run_id);

    let storage: Arc<Mutex<dyn Storage + Send>> = Arc::new(Mutex::new(storage));
    let mut sinks: Vec<Arc<dyn RecordSink>> = Vec::new();
    sinks.push(Arc::new(SqliteSink::new(storage.clone(), run_id)));

    if let Some(path) = &config.output.jsonl_path {
        let jsonl = JsonLinesSink::create(Path::new(path))
            .with_context(|| format!("Failed to open {}", path))?;
        sinks.push(Arc::new(jsonl));
    }

    let summary_path = config.output.summary_path.clone();

    let report = match harvest(config, Arc::new(FanoutSink::new(sinks))).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            mark_failed(&storage, run_id);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report.summary)?);

    if let Some(path) = summary_path {
        generate_markdown_summary(&report.summary, &report.stats, Path::new(&path))?;
        tracing::info!("Summary written to {}", path);
    }

    Ok(())
}

fn mark_failed(storage: &Arc<Mutex<dyn Storage + Send>>, run_id: i64) {
    use vacancy_harvest::storage::RunStatus;

    let mut storage = storage.lock().unwrap_or_else(|e| e.into_inner());
    if let Err(e) = storage.update_run_status(run_id, RunStatus::Failed) {
        tracing::warn!("Could not mark run {} as failed: {}", run_id, e);
    }
}
