//! Date-indexed wide table built from multiple series, and its resampling.

use crate::core::error::AnalyticsError;
use crate::core::series::{RawSeries, SeriesCode};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Original,
    Monthly,
    Annual,
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Original => "original",
                Frequency::Monthly => "monthly",
                Frequency::Annual => "annual",
            }
        )
    }
}

impl FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" | "o" => Ok(Frequency::Original),
            "monthly" | "m" => Ok(Frequency::Monthly),
            "annual" | "yearly" | "a" | "y" => Ok(Frequency::Annual),
            _ => Err(anyhow::anyhow!("Invalid frequency: {}", s)),
        }
    }
}

impl Frequency {
    /// Last calendar day of the period containing `date`, or `None` for `Original`.
    pub fn period_end(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Original => None,
            Frequency::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.pred_opt())
            }
            Frequency::Annual => NaiveDate::from_ymd_opt(date.year(), 12, 31),
        }
    }
}

/// Reduction applied to the observations falling into one period.
///
/// `Last` matches stock-variable semantics for economic indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    #[default]
    Last,
    First,
    Mean,
    Sum,
    Min,
    Max,
}

impl Display for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Aggregator::Last => "last",
                Aggregator::First => "first",
                Aggregator::Mean => "mean",
                Aggregator::Sum => "sum",
                Aggregator::Min => "min",
                Aggregator::Max => "max",
            }
        )
    }
}

impl FromStr for Aggregator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last" => Ok(Aggregator::Last),
            "first" => Ok(Aggregator::First),
            "mean" | "avg" => Ok(Aggregator::Mean),
            "sum" => Ok(Aggregator::Sum),
            "min" => Ok(Aggregator::Min),
            "max" => Ok(Aggregator::Max),
            _ => Err(anyhow::anyhow!("Invalid aggregator: {}", s)),
        }
    }
}

impl Aggregator {
    /// Reduces chronologically ordered values. `None` when there are none.
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reduced = match self {
            Aggregator::Last => values[values.len() - 1],
            Aggregator::First => values[0],
            Aggregator::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregator::Sum => values.iter().sum(),
            Aggregator::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregator::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(reduced)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub date: NaiveDate,
    /// One slot per table code, in the table's code order.
    pub values: Vec<Option<f64>>,
}

/// Outer join of several series on date.
///
/// Columns are the codes in ascending order; rows are unique dates in
/// ascending order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignedTable {
    codes: Vec<SeriesCode>,
    rows: Vec<Row>,
}

impl AlignedTable {
    pub fn empty(mut codes: Vec<SeriesCode>) -> Self {
        codes.sort();
        codes.dedup();
        Self {
            codes,
            rows: Vec::new(),
        }
    }

    pub fn codes(&self) -> &[SeriesCode] {
        &self.codes
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when at least one cell holds a value.
    pub fn has_observations(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.values.iter().any(Option::is_some))
    }

    pub fn column_index(&self, code: SeriesCode) -> Option<usize> {
        self.codes.binary_search(&code).ok()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    /// Every row's value for `code`, missing included.
    pub fn column(&self, code: SeriesCode) -> Vec<Option<f64>> {
        match self.column_index(code) {
            Some(idx) => self.rows.iter().map(|row| row.values[idx]).collect(),
            None => Vec::new(),
        }
    }

    /// Only the dates where `code` has a value.
    pub fn observed(&self, code: SeriesCode) -> Vec<(NaiveDate, f64)> {
        let Some(idx) = self.column_index(code) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.values[idx].map(|v| (row.date, v)))
            .collect()
    }

    pub fn value(&self, date: NaiveDate, code: SeriesCode) -> Option<f64> {
        let idx = self.column_index(code)?;
        let pos = self.rows.binary_search_by_key(&date, |row| row.date).ok()?;
        self.rows[pos].values[idx]
    }

    /// Splits the table back into one series per code. Missing cells are kept.
    pub fn to_raw_series(&self) -> Vec<RawSeries> {
        self.codes
            .iter()
            .enumerate()
            .map(|(idx, code)| {
                RawSeries::from_values(
                    *code,
                    self.rows.iter().map(|row| (row.date, row.values[idx])),
                )
            })
            .collect()
    }
}

/// Outer-joins `series` on date.
///
/// Within a series a repeated date keeps its last occurrence; NaN is read as
/// missing. The result does not depend on the order of `series`.
pub fn align(series: &[RawSeries]) -> Result<AlignedTable, AnalyticsError> {
    let mut codes: Vec<SeriesCode> = series.iter().map(|s| s.code).collect();
    codes.sort();
    if let Some(pair) = codes.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(AnalyticsError::DuplicateSeries(pair[0]));
    }

    let width = codes.len();
    let mut grid: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for s in series {
        let idx = codes.binary_search(&s.code).unwrap_or_default();
        for obs in &s.observations {
            let value = obs.value.filter(|v| !v.is_nan());
            grid.entry(obs.date).or_insert_with(|| vec![None; width])[idx] = value;
        }
    }

    let rows: Vec<Row> = grid
        .into_iter()
        .map(|(date, values)| Row { date, values })
        .collect();
    debug!("Aligned {} series into {} rows", width, rows.len());

    Ok(AlignedTable { codes, rows })
}

/// Downsamples `table` into monthly or annual periods.
///
/// Each period is labelled by its last calendar day. Periods without a
/// single observation are dropped; a code without observations in a kept
/// period is missing there.
pub fn resample(table: &AlignedTable, frequency: Frequency, aggregator: Aggregator) -> AlignedTable {
    if frequency == Frequency::Original {
        return table.clone();
    }

    let width = table.codes.len();
    let mut periods: BTreeMap<NaiveDate, Vec<Vec<f64>>> = BTreeMap::new();
    for row in &table.rows {
        let Some(period) = frequency.period_end(row.date) else {
            continue;
        };
        let buckets = periods
            .entry(period)
            .or_insert_with(|| vec![Vec::new(); width]);
        for (idx, value) in row.values.iter().enumerate() {
            if let Some(v) = value {
                buckets[idx].push(*v);
            }
        }
    }

    let rows: Vec<Row> = periods
        .into_iter()
        .filter(|(_, buckets)| buckets.iter().any(|b| !b.is_empty()))
        .map(|(date, buckets)| Row {
            date,
            values: buckets.iter().map(|b| aggregator.reduce(b)).collect(),
        })
        .collect();
    debug!(
        "Resampled {} rows into {} {} periods using {}",
        table.len(),
        rows.len(),
        frequency,
        aggregator
    );

    AlignedTable {
        codes: table.codes.clone(),
        rows,
    }
}
