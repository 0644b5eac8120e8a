//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a finished
//! harvest run.

use crate::output::traits::{CrawlStats, OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of a run to `output_path`
pub fn generate_markdown_summary(
    summary: &RunSummary,
    stats: &CrawlStats,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary, stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary, stats: &CrawlStats) -> String {
    let mut md = String::new();

    md.push_str("# Vacancy-Harvest Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Finished**: {}\n", summary.timestamp.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
        summary.duration_seconds,
        summary.duration_seconds / 60.0
    ));
    md.push_str(&format!(
        "- **Mode**: {}\n",
        if summary.collect_details {
            "detail pages"
        } else {
            "listing cards"
        }
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if summary.success { "completed" } else { "failed" }
    ));
    md.push_str(&format!("- **Message**: {}\n\n", summary.message));

    md.push_str("## Results\n\n");
    md.push_str(&format!(
        "- **Saved**: {} of {} ({:.1}%)\n",
        summary.total_saved,
        summary.target,
        percentage(summary.total_saved as u64, summary.target as u64)
    ));
    md.push_str(&format!(
        "- **Average Rate**: {:.2} records/sec\n\n",
        summary.average_rate
    ));

    md.push_str("## Crawl Statistics\n\n");
    md.push_str("| Counter | Value |\n");
    md.push_str("|---------|-------|\n");
    for (label, value) in [
        ("Pages fetched", stats.pages_fetched),
        ("Listing pages", stats.listing_pages),
        ("Detail pages", stats.detail_pages),
        ("Detail requests enqueued", stats.detail_enqueued),
        ("Pagination requests enqueued", stats.pagination_enqueued),
        ("Retries", stats.retries),
        ("Blocked responses", stats.blocked),
        ("Terminal failures", stats.failed_terminal),
        ("Sessions retired", stats.sessions_retired),
    ] {
        md.push_str(&format!("| {} | {} |\n", label, value));
    }

    md
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
