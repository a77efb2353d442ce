//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest document harvester.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::crawler::{Coordinator, HttpFetcher};
use sumi_harvest::output::{
    load_statistics, print_run_report, print_statistics, write_markdown_summary,
};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: A bounded, polite document harvester
///
/// Sumi-Harvest follows links breadth-first from a set of seeds and stores a budget-limited
/// corpus of documents, while respecting per-source concurrency limits, a depth limit and a
/// domain allow-list.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, polite document harvester", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the manifest and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Depth limit: {}", config.crawler.depth_limit);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Global concurrency: {}", config.crawler.global_concurrency);
    println!(
        "  Per-source concurrency: {}",
        config.crawler.per_source_concurrency
    );
    if let Some(max_fetches) = config.crawler.max_fetches {
        println!("  Max fetches: {}", max_fetches);
    }
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nScope:");
    println!("  Seeds ({}):", config.scope.seeds.len());
    for seed in &config.scope.seeds {
        println!("    * {}", seed);
    }
    if config.scope.allowed_domains.is_empty() {
        println!("  Allowed domains: any");
    } else {
        println!("  Allowed domains: {}", config.scope.allowed_domains.join(", "));
    }
    for prefix in &config.scope.excluded_path_prefixes {
        println!("  Excluded path prefix: {}", prefix);
    }

    println!("\nExtraction:");
    println!("  Title selector: {}", config.extract.title);
    println!("  Link selector: {}", config.extract.links);
    println!("  Key source: {:?}", config.extract.key_source);
    for (name, selector) in &config.extract.fields {
        println!("  Field '{}': {}", name, selector);
    }

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);
    if let Some(path) = &config.output.manifest_path {
        println!("  Manifest: {}", path);
    }
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }
    println!("  On collision: {:?}", config.output.on_collision);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.scope.seeds.len()
    );
}

/// Handles the --stats mode: shows statistics from the manifest
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(manifest_path) = &config.output.manifest_path else {
        return Err("no manifest-path configured in [output]".into());
    };

    println!("Manifest: {}\n", manifest_path);
    let stats = load_statistics(Path::new(manifest_path))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Seeds: {}, depth limit: {}, page budget: {}",
        config.scope.seeds.len(),
        config.crawler.depth_limit,
        config.crawler.max_pages
    );

    let summary_path = config.output.summary_path.clone();
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)?;
    let coordinator = Coordinator::new(config, Arc::new(fetcher))?.with_config_hash(config_hash);

    let handle = coordinator.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, draining in-flight fetches");
            handle.cancel();
        }
    });

    let report = match coordinator.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_run_report(&report);

    if let Some(path) = summary_path {
        write_markdown_summary(&report, Path::new(&path))?;
        println!("\n✓ Summary written to: {}", path);
    }

    Ok(())
}
