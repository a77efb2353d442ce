//! Statistics printing
//!
//! This module prints the report of a finished run and the aggregate statistics stored in the
//! document manifest.

use crate::crawler::RunReport;
use crate::manifest::{ManifestStats, SqliteManifest};
use crate::output::OutputResult;
use std::path::Path;

/// Loads aggregate statistics from a manifest database
///
/// # Arguments
///
/// * `manifest_path` - Path to the SQLite manifest
///
/// # Returns
///
/// * `Ok(ManifestStats)` - Successfully loaded statistics
/// * `Err(OutputError)` - The manifest could not be opened or queried
pub fn load_statistics(manifest_path: &Path) -> OutputResult<ManifestStats> {
    let manifest = SqliteManifest::new(manifest_path)?;
    Ok(manifest.stats()?)
}

/// Prints manifest statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ManifestStats) {
    println!("=== Manifest Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Documents stored: {}", stats.total_documents);
    println!("  Bytes stored: {}", stats.total_bytes);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run ({}):", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status.to_db_string());
            println!("  Config hash: {}", run.config_hash);
            println!("  Pages stored: {}", run.pages_stored);
            println!("  Fetches dispatched: {}", run.fetches_dispatched);
            println!("  Fetch failures: {}", run.fetch_failures);
        }
        None => println!("No runs recorded yet"),
    }
}

/// Prints the report of a finished run to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Crawl Report ===\n");

    println!("Overview:");
    println!("  Pages stored: {}", report.pages_stored);
    println!("  Fetches dispatched: {}", report.fetches_dispatched);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Documents skipped: {}", report.skipped_total());
    println!("  Rejected by budget: {}", report.budget_rejected);
    println!("  Final phase: {}", report.final_phase);
    println!("  Elapsed: {:.1}s", report.elapsed_ms as f64 / 1000.0);
    if report.cancelled {
        println!("  Cancelled ({} pending entries abandoned)", report.abandoned);
    }
    println!();

    if !report.failures_by_kind.is_empty() {
        println!("Fetch Failures:");
        for (kind, count) in &report.failures_by_kind {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if !report.skipped.is_empty() {
        println!("Skipped Documents:");
        for (reason, count) in &report.skipped {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    println!("Links:");
    println!("  Filtered: {}", report.links_filtered);
    println!("  Duplicates: {}", report.duplicates);
    println!("  Beyond depth limit: {}", report.depth_rejected);
    println!("  Redirects dropped: {}", report.redirects_dropped);
    println!();

    println!("Store:");
    println!("  Key collisions: {}", report.collisions);
    println!("  Disambiguated: {}", report.disambiguated);
    println!("  Discarded: {}", report.discarded);
    println!("  Write errors: {}", report.store_errors);
    println!("  Page slots used: {}", report.budget_slots_used());
    if report.manifest_errors > 0 {
        println!("  Manifest errors: {}", report.manifest_errors);
    }
}
