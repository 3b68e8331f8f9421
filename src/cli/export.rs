use super::{query, ui};
use crate::core::export::{DelimitedProfile, Sheet, stats_sheet, table_sheet, to_delimited};
use crate::core::{AnalysisQuery, AnalysisReport, Analyzer};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Picks the aligned data or the per-series statistics.
pub fn build_sheet(report: &AnalysisReport, stats: bool) -> Sheet {
    if stats {
        stats_sheet(&report.stats, &report.requests)
    } else {
        table_sheet(&report.table, &report.requests)
    }
}

pub fn write_sheet(sheet: &Sheet, profile: &DelimitedProfile, output: &Path) -> Result<()> {
    let bytes = to_delimited(sheet, profile)?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write export to {}", output.display()))?;
    info!(
        "Wrote {} rows of '{}' to {}",
        sheet.rows.len(),
        sheet.name,
        output.display()
    );
    Ok(())
}

pub async fn run(
    analyzer: &Analyzer,
    query: &AnalysisQuery,
    profile: &DelimitedProfile,
    output: &Path,
    stats: bool,
) -> Result<()> {
    let report = query::analyze_with_spinner(analyzer, query).await?;
    report.ensure_data()?;

    let sheet = build_sheet(&report, stats);
    write_sheet(&sheet, profile, output)?;
    println!(
        "Exported {} rows to {}",
        sheet.rows.len(),
        ui::style_text(&output.display().to_string(), ui::StyleType::Title)
    );
    Ok(())
}
