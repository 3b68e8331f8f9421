use super::ui;
use crate::core::{AnalysisQuery, AnalysisReport, AnalyticsError, Analyzer, SeriesCode};
use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment};
use tracing::warn;

impl AnalysisReport {
    fn name_of(&self, code: SeriesCode) -> String {
        self.requests
            .get(code)
            .map_or_else(|| code.to_string(), |r| r.display_name())
    }

    /// Latest observed value per series, in request order.
    pub fn display_latest(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Series"),
            ui::header_cell("Code"),
            ui::header_cell("Last value"),
            ui::header_cell("As of"),
        ]);

        for request in self.requests.requests() {
            let stats = self.stats.get(&request.code);
            table.add_row(vec![
                Cell::new(request.display_name()),
                Cell::new(request.code).set_alignment(CellAlignment::Right),
                ui::format_optional_cell(stats.and_then(|s| s.last_value), ui::format_compact),
                ui::format_optional_cell(stats.and_then(|s| s.last_date), |d| {
                    d.format("%Y-%m-%d").to_string()
                }),
            ]);
        }
        table.to_string()
    }

    pub fn display_stats(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Series"),
            ui::header_cell("Obs"),
            ui::header_cell("Missing"),
            ui::header_cell("Mean"),
            ui::header_cell("Median"),
            ui::header_cell("Std dev"),
            ui::header_cell("Min"),
            ui::header_cell("Max"),
        ]);

        for request in self.requests.requests() {
            let Some(s) = self.stats.get(&request.code) else {
                continue;
            };
            table.add_row(vec![
                Cell::new(request.display_name()),
                Cell::new(s.observation_count).set_alignment(CellAlignment::Right),
                Cell::new(s.missing_count).set_alignment(CellAlignment::Right),
                ui::format_optional_cell(s.mean, ui::format_compact),
                ui::format_optional_cell(s.median, ui::format_compact),
                ui::format_optional_cell(s.std_dev, ui::format_compact),
                ui::format_optional_cell(s.min, ui::format_compact),
                ui::format_optional_cell(s.max, ui::format_compact),
            ]);
        }
        table.to_string()
    }

    /// Square correlation grid, or `None` with fewer than two series.
    pub fn display_correlation(&self) -> Option<String> {
        let codes = self.correlation.codes();
        if codes.len() < 2 {
            return None;
        }

        let mut table = ui::new_styled_table();
        let mut header = vec![ui::header_cell("")];
        header.extend(codes.iter().map(|c| ui::header_cell(&self.name_of(*c))));
        table.set_header(header);

        for (code, row) in codes.iter().zip(self.correlation.to_grid()) {
            let mut cells = vec![ui::header_cell(&self.name_of(*code))];
            cells.extend(row.into_iter().map(ui::correlation_cell));
            table.add_row(cells);
        }
        Some(table.to_string())
    }

    /// One line per axis listing the series plotted on it.
    pub fn display_axes(&self) -> String {
        let names = |codes: Vec<SeriesCode>| {
            codes
                .into_iter()
                .map(|c| self.name_of(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        if !self.axes.is_dual() {
            return format!("Single axis: {}", names(self.axes.primary()));
        }
        format!(
            "Left axis: {}\nRight axis: {}",
            names(self.axes.primary()),
            names(self.axes.secondary())
        )
    }

    pub fn display_full(&self) -> String {
        let mut output = format!(
            "{} ({} to {}, {} rows)\n\n",
            ui::style_text("Latest values", ui::StyleType::Title),
            self.requests.start(),
            self.requests.end(),
            self.table.len()
        );
        output.push_str(&self.display_latest());
        output.push_str(&format!(
            "\n\n{}\n\n",
            ui::style_text("Statistics", ui::StyleType::Title)
        ));
        output.push_str(&self.display_stats());

        if let Some(correlation) = self.display_correlation() {
            output.push_str(&format!(
                "\n\n{}\n\n",
                ui::style_text("Correlation", ui::StyleType::Title)
            ));
            output.push_str(&correlation);
        }

        output.push_str("\n\n");
        output.push_str(&ui::style_text(&self.display_axes(), ui::StyleType::Subtle));
        output
    }
}

/// Runs the analysis behind a spinner.
pub async fn analyze_with_spinner(
    analyzer: &Analyzer,
    query: &AnalysisQuery,
) -> Result<AnalysisReport, AnalyticsError> {
    let spinner = ui::new_spinner(&format!("Fetching {} series...", query.series.len()));
    let result = analyzer.analyze(query).await;
    spinner.finish_and_clear();
    result
}

pub async fn run(analyzer: &Analyzer, query: &AnalysisQuery, json: bool) -> Result<()> {
    let report = analyze_with_spinner(analyzer, query).await?;

    if json {
        let body = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{body}");
        return Ok(());
    }

    if let Err(e @ AnalyticsError::EmptyResult) = report.ensure_data() {
        warn!("{e}");
        println!(
            "{}",
            ui::style_text(
                "No data found for the selected series and period.",
                ui::StyleType::Warning
            )
        );
        return Ok(());
    }

    println!("{}", report.display_full());
    ui::print_separator();
    Ok(())
}
