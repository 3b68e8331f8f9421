//! Core analytics engine

pub mod analysis;
pub mod axis;
pub mod cache;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch_cache;
pub mod log;
pub mod series;
pub mod stats;
pub mod table;

// Re-export main types for cleaner imports
pub use analysis::{AnalysisQuery, AnalysisReport, Analyzer};
pub use error::AnalyticsError;
pub use fetch_cache::FetchCache;
pub use series::{RawSeries, RequestSet, SeriesCode, SeriesProvider, SeriesRequest};
pub use table::{AlignedTable, Aggregator, Frequency};
