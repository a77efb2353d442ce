//! Markdown summary generation
//!
//! This module renders the report of a finished run as a human-readable markdown document.

use crate::crawler::RunReport;
use crate::output::OutputResult;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run
///
/// # Arguments
///
/// * `report` - The report of the finished run
/// * `output_path` - Path where the markdown file should be written; missing parents are created
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn write_markdown_summary(report: &RunReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_summary(report: &RunReport) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Harvest Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Final Phase**: {}\n", report.final_phase));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed_ms as f64 / 1000.0
    ));
    if report.cancelled {
        md.push_str(&format!(
            "- **Cancelled**: yes ({} pending entries abandoned)\n",
            report.abandoned
        ));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Counter | Count |\n");
    md.push_str("|---------|-------|\n");
    for (label, value) in [
        ("Pages Stored", report.pages_stored),
        ("Fetches Dispatched", report.fetches_dispatched),
        ("Fetch Failures", report.fetch_failures),
        ("Documents Skipped", report.skipped_total()),
        ("Rejected by Budget", report.budget_rejected),
        ("Links Filtered", report.links_filtered),
        ("Duplicate Links", report.duplicates),
        ("Beyond Depth Limit", report.depth_rejected),
        ("Redirects Dropped", report.redirects_dropped),
    ] {
        md.push_str(&format!("| {} | {} |\n", label, value));
    }
    md.push('\n');

    if report.collisions > 0 || report.store_errors > 0 || report.manifest_errors > 0 {
        md.push_str("## Store\n\n");
        md.push_str(&format!("- **Key Collisions**: {}\n", report.collisions));
        md.push_str(&format!("- **Disambiguated**: {}\n", report.disambiguated));
        md.push_str(&format!("- **Discarded**: {}\n", report.discarded));
        md.push_str(&format!("- **Write Errors**: {}\n", report.store_errors));
        md.push_str(&format!(
            "- **Manifest Errors**: {}\n\n",
            report.manifest_errors
        ));
    }

    if !report.failures_by_kind.is_empty() {
        md.push_str("## Fetch Failures\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &report.failures_by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !report.skipped.is_empty() {
        md.push_str("## Skipped Documents\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        for (reason, count) in &report.skipped {
            md.push_str(&format!("| {} | {} |\n", reason, count));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CrawlPhase;
    use tempfile::TempDir;

    fn create_test_report() -> RunReport {
        let mut report = RunReport {
            pages_stored: 40,
            fetches_dispatched: 57,
            elapsed_ms: 12_500,
            final_phase: CrawlPhase::Terminated,
            ..Default::default()
        };
        report.record_failure("status");
        report.record_skip("missing_title");
        report
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_report());

        assert!(markdown.contains("# Sumi-Harvest Crawl Summary"));
        assert!(markdown.contains("- **Final Phase**: terminated"));
        assert!(markdown.contains("| Pages Stored | 40 |"));
        assert!(markdown.contains("| Fetches Dispatched | 57 |"));
        assert!(markdown.contains("| status | 1 |"));
        assert!(markdown.contains("| missing_title | 1 |"));
    }

    #[test]
    fn test_store_section_only_with_anomalies() {
        let mut report = create_test_report();
        assert!(!format_markdown_summary(&report).contains("## Store"));

        report.collisions = 2;
        report.disambiguated = 2;
        let markdown = format_markdown_summary(&report);
        assert!(markdown.contains("## Store"));
        assert!(markdown.contains("- **Key Collisions**: 2"));
    }

    #[test]
    fn test_cancelled_run_is_flagged() {
        let mut report = create_test_report();
        report.cancelled = true;
        report.abandoned = 7;

        assert!(format_markdown_summary(&report).contains("7 pending entries abandoned"));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("summary.md");

        write_markdown_summary(&create_test_report(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Sumi-Harvest Crawl Summary"));
    }
}
