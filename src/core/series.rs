//! Series identifiers, requests and the retrieval abstraction

use crate::core::error::AnalyticsError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

/// Numeric identifier of an SGS series (e.g. 433 for IPCA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesCode(pub u32);

impl Display for SeriesCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SeriesCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(SeriesCode)
            .map_err(|_| anyhow::anyhow!("Invalid series code: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRequest {
    pub code: SeriesCode,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SeriesRequest {
    /// Column name used in exports: `{code}_{label}`, or the bare code when unlabelled.
    pub fn column_name(&self) -> String {
        let label = self.label.trim();
        if label.is_empty() {
            self.code.to_string()
        } else {
            format!("{}_{}", self.code, label)
        }
    }

    /// Display name used in charts and tables.
    pub fn display_name(&self) -> String {
        let label = self.label.trim();
        if label.is_empty() {
            self.code.to_string()
        } else {
            label.to_string()
        }
    }
}

/// A validated, non-empty set of requests sharing one date range.
///
/// Request order is preserved since it drives color assignment in charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSet {
    requests: Vec<SeriesRequest>,
    start: NaiveDate,
    end: NaiveDate,
}

impl RequestSet {
    pub fn new(
        series: impl IntoIterator<Item = (SeriesCode, String)>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, AnalyticsError> {
        if start > end {
            return Err(AnalyticsError::InvalidRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        for (code, label) in series {
            if !seen.insert(code) {
                return Err(AnalyticsError::DuplicateSeries(code));
            }
            requests.push(SeriesRequest {
                code,
                label,
                start_date: start,
                end_date: end,
            });
        }

        if requests.is_empty() {
            return Err(AnalyticsError::InvalidRequest(
                "at least one series code is required".to_string(),
            ));
        }

        Ok(Self {
            requests,
            start,
            end,
        })
    }

    pub fn requests(&self) -> &[SeriesRequest] {
        &self.requests
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Codes in ascending order, independent of request order.
    pub fn sorted_codes(&self) -> Vec<SeriesCode> {
        let mut codes: Vec<_> = self.requests.iter().map(|r| r.code).collect();
        codes.sort();
        codes
    }

    pub fn get(&self, code: SeriesCode) -> Option<&SeriesRequest> {
        self.requests.iter().find(|r| r.code == code)
    }
}

/// One observation. `None` marks an absent value at that date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub code: SeriesCode,
    pub observations: Vec<Observation>,
}

impl RawSeries {
    pub fn new(code: SeriesCode, observations: Vec<Observation>) -> Self {
        Self { code, observations }
    }

    pub fn empty(code: SeriesCode) -> Self {
        Self::new(code, Vec::new())
    }

    pub fn from_values(
        code: SeriesCode,
        values: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
    ) -> Self {
        let observations = values
            .into_iter()
            .map(|(date, value)| Observation { date, value })
            .collect();
        Self::new(code, observations)
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Outbound retrieval of a single series over a date range.
///
/// An empty series is a valid result; genuine failures must be returned as errors.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    async fn fetch_series(
        &self,
        code: SeriesCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries>;
}
