use crate::core::series::SeriesCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the analytics engine.
///
/// Per-pair correlation gaps are not errors; they show up as missing
/// coefficients in the matrix.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnalyticsError {
    /// Remote retrieval failed for a series. Nothing is cached for the request set.
    #[error("failed to fetch series {code}: {message}")]
    Fetch {
        /// Series whose retrieval failed.
        code: SeriesCode,
        /// Error reported by the provider.
        message: String,
    },

    /// The request produced no dates at all across every series.
    #[error("no observations found for the requested series and range")]
    EmptyResult,

    /// Invalid pipeline input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The same series appeared more than once in a request or alignment.
    #[error("series {0} was supplied more than once")]
    DuplicateSeries(SeriesCode),
}
