//! Request/response pipeline: cache lookup, fetch, align, resample, stats,
//! axis clustering and chart layout.

use crate::core::axis::{AxisAssignment, AxisClusterer};
use crate::core::catalog;
use crate::core::chart::{ChartLayoutBuilder, ChartSpec, HeatmapSpec, Theme};
use crate::core::config::AppConfig;
use crate::core::error::AnalyticsError;
use crate::core::fetch_cache::FetchCache;
use crate::core::series::{RequestSet, SeriesCode, SeriesProvider};
use crate::core::stats::{CorrelationMatrix, SeriesStats, correlate, describe};
use crate::core::table::{AlignedTable, Aggregator, Frequency};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Ranges longer than this are slow to fetch for daily series.
const LONG_RANGE_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisQuery {
    /// Codes with optional labels; an empty label falls back to the catalog name.
    pub series: Vec<(SeriesCode, String)>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub frequency: Frequency,
    /// Overrides the configured aggregator.
    pub aggregator: Option<Aggregator>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(skip)]
    pub requests: RequestSet,
    pub table: AlignedTable,
    pub stats: BTreeMap<SeriesCode, SeriesStats>,
    pub correlation: CorrelationMatrix,
    pub axes: AxisAssignment,
    pub chart: ChartSpec,
    pub heatmap: HeatmapSpec,
}

impl AnalysisReport {
    /// Fails with [`AnalyticsError::EmptyResult`] when no series has a single value.
    pub fn ensure_data(&self) -> Result<&Self, AnalyticsError> {
        if self.table.has_observations() {
            Ok(self)
        } else {
            Err(AnalyticsError::EmptyResult)
        }
    }
}

pub struct Analyzer {
    cache: Arc<FetchCache>,
    provider: Arc<dyn SeriesProvider>,
    clusterer: AxisClusterer,
    aggregator: Aggregator,
    theme: Theme,
}

impl Analyzer {
    pub fn new(cache: Arc<FetchCache>, provider: Arc<dyn SeriesProvider>) -> Self {
        Self {
            cache,
            provider,
            clusterer: AxisClusterer::default(),
            aggregator: Aggregator::default(),
            theme: Theme::default(),
        }
    }

    pub fn from_config(config: &AppConfig, provider: Arc<dyn SeriesProvider>) -> Self {
        let cache = Arc::new(FetchCache::with_ttl(Duration::from_secs(
            config.cache.ttl_secs,
        )));
        Self::new(cache, provider)
            .with_clusterer(AxisClusterer::new(config.analysis.axis_threshold))
            .with_aggregator(config.analysis.aggregator)
            .with_theme(config.theme.clone())
    }

    pub fn with_clusterer(mut self, clusterer: AxisClusterer) -> Self {
        self.clusterer = clusterer;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub async fn analyze(&self, query: &AnalysisQuery) -> Result<AnalysisReport, AnalyticsError> {
        let labelled = query.series.iter().map(|(code, label)| {
            let label = if label.trim().is_empty() {
                catalog::default_label(*code)
            } else {
                label.clone()
            };
            (*code, label)
        });
        let requests = RequestSet::new(labelled, query.start, query.end)?;

        if (query.end - query.start).num_days() > LONG_RANGE_DAYS {
            warn!(
                "Requested range {} to {} spans more than ten years; daily series will be fetched in chunks",
                query.start, query.end
            );
        }
        let codes = requests.sorted_codes();
        if catalog::has_mixed_frequencies(&codes) {
            warn!("Selected series have different native frequencies; consider resampling");
        }

        let aggregator = query.aggregator.unwrap_or(self.aggregator);
        let table = self
            .cache
            .get_or_fetch(&requests, query.frequency, aggregator, self.provider.as_ref())
            .await?;
        info!(
            "Resolved {} series into {} rows at {} frequency",
            codes.len(),
            table.len(),
            query.frequency
        );

        let stats = describe(&table);
        let correlation = correlate(&table);
        let axes = self.clusterer.assign(&table, &codes);
        let builder = ChartLayoutBuilder::new(requests.requests());
        let chart = builder.build(&table, &axes, &self.theme);
        let heatmap = builder.heatmap(&correlation, &self.theme);

        Ok(AnalysisReport {
            requests,
            table,
            stats,
            correlation,
            axes,
            chart,
            heatmap,
        })
    }
}
