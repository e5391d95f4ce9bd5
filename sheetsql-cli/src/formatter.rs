//! Output formatters for the import summary
//!
//! Both go to stderr so stdout stays a clean SQL script.

use anyhow::Result;
use colored::*;
use sheetsql_core::ImportSummary;
use std::path::Path;

/// Print the summary in human-readable format with colors
pub fn print_human(file_path: &Path, summary: &ImportSummary) {
    eprintln!("{}", format!("Converted: {}", file_path.display()).bold());
    eprintln!();

    eprintln!("{}", "Summary:".bold().underline());
    eprintln!("  {} {}", "Rows read:".bold(), summary.rows_read);
    if summary.rows_without_name > 0 {
        eprintln!(
            "  {} {}",
            "Skipped (no name):".yellow().bold(),
            summary.rows_without_name
        );
    }
    eprintln!("  {} {}", "Products:".green().bold(), summary.products);
    eprintln!("  {} {}", "Categories:".cyan().bold(), summary.categories);
    eprintln!("  {} {}", "Brands:".cyan().bold(), summary.brands);
    if summary.sku_collisions > 0 {
        eprintln!(
            "  {} {}",
            "Renamed SKUs:".yellow().bold(),
            summary.sku_collisions
        );
    }
    if summary.generated_skus > 0 {
        eprintln!(
            "  {} {}",
            "Generated SKUs:".blue().bold(),
            summary.generated_skus
        );
    }
}

/// Print the summary in JSON format
pub fn print_json(file_path: &Path, summary: &ImportSummary) -> Result<()> {
    let output = serde_json::json!({
        "file": file_path.display().to_string(),
        "summary": summary,
    });

    eprintln!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
