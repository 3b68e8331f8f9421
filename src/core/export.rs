//! Flat row/column representations of analysis results.

use crate::core::series::{RequestSet, SeriesCode};
use crate::core::stats::SeriesStats;
use crate::core::table::AlignedTable;
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// A spreadsheet-like cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Integer(u64),
    Date(NaiveDate),
    Empty,
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Number)
    }
}

impl From<Option<NaiveDate>> for CellValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Text rendering options for [`to_delimited`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedProfile {
    pub separator: char,
    /// Render `1.5` as `1,5`.
    pub decimal_comma: bool,
    pub date_format: String,
    /// Prefix the output with a UTF-8 byte order mark for spreadsheet tools.
    pub bom: bool,
}

impl Default for DelimitedProfile {
    fn default() -> Self {
        Self {
            separator: ';',
            decimal_comma: true,
            date_format: "%d/%m/%Y".to_string(),
            bom: true,
        }
    }
}

/// One row per date, one column per requested series in request order.
pub fn table_sheet(table: &AlignedTable, requests: &RequestSet) -> Sheet {
    let columns: Vec<(String, Option<usize>)> = requests
        .requests()
        .iter()
        .map(|r| (r.column_name(), table.column_index(r.code)))
        .collect();

    let mut header = vec!["Date".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![CellValue::Date(row.date)];
            cells.extend(
                columns
                    .iter()
                    .map(|(_, idx)| idx.and_then(|i| row.values[i]).into()),
            );
            cells
        })
        .collect();

    Sheet {
        name: "Data".to_string(),
        header,
        rows,
    }
}

/// One row per series with its descriptive statistics.
pub fn stats_sheet(stats: &BTreeMap<SeriesCode, SeriesStats>, requests: &RequestSet) -> Sheet {
    let header = [
        "Series", "Observations", "Missing", "First date", "Last date", "Mean", "Median",
        "Std dev", "Min", "Max",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let rows = requests
        .requests()
        .iter()
        .filter_map(|r| stats.get(&r.code).map(|s| (r, s)))
        .map(|(r, s)| {
            vec![
                CellValue::Text(r.column_name()),
                CellValue::Integer(s.observation_count as u64),
                CellValue::Integer(s.missing_count as u64),
                s.first_date.into(),
                s.last_date.into(),
                s.mean.into(),
                s.median.into(),
                s.std_dev.into(),
                s.min.into(),
                s.max.into(),
            ]
        })
        .collect();

    Sheet {
        name: "Statistics".to_string(),
        header,
        rows,
    }
}

impl DelimitedProfile {
    /// Rejects separators the writer cannot emit and date formats chrono cannot render.
    pub fn validate(&self) -> Result<()> {
        if !self.separator.is_ascii() || matches!(self.separator, '"' | '\n' | '\r') {
            bail!("Invalid export separator: {:?}", self.separator);
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            bail!("Invalid export date format: {}", self.date_format);
        }
        Ok(())
    }
}

/// Renders `sheet` as delimited UTF-8 text.
pub fn to_delimited(sheet: &Sheet, profile: &DelimitedProfile) -> Result<Vec<u8>> {
    profile.validate()?;

    let mut buffer = Vec::new();
    if profile.bom {
        buffer.extend_from_slice("\u{feff}".as_bytes());
    }

    let mut writer = WriterBuilder::new()
        .delimiter(profile.separator as u8)
        .from_writer(buffer);
    writer
        .write_record(&sheet.header)
        .with_context(|| format!("Failed to write header of sheet '{}'", sheet.name))?;
    for row in &sheet.rows {
        let fields = row
            .iter()
            .map(|cell| render(cell, profile))
            .collect::<Result<Vec<_>>>()?;
        writer
            .write_record(&fields)
            .with_context(|| format!("Failed to write row of sheet '{}'", sheet.name))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush sheet '{}': {}", sheet.name, e.error()))
}

fn render(cell: &CellValue, profile: &DelimitedProfile) -> Result<String> {
    let text = match cell {
        CellValue::Text(text) => text.clone(),
        // Shortest round-trip digits, never exponent notation.
        CellValue::Number(n) if n.is_finite() => {
            let text = n.to_string();
            if profile.decimal_comma {
                text.replace('.', ",")
            } else {
                text
            }
        }
        CellValue::Number(_) => String::new(),
        CellValue::Integer(n) => n.to_string(),
        CellValue::Date(d) => {
            let mut text = String::new();
            write!(text, "{}", d.format(&profile.date_format))
                .map_err(|_| anyhow!("Invalid export date format: {}", profile.date_format))?;
            text
        }
        CellValue::Empty => String::new(),
    };
    Ok(text)
}
