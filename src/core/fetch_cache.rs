//! Memoized retrieval of request sets, resolved into aligned tables.

use crate::core::cache::Cache;
use crate::core::error::AnalyticsError;
use crate::core::series::{RawSeries, RequestSet, SeriesCode, SeriesProvider};
use crate::core::table::{AlignedTable, Aggregator, Frequency, align, resample};
use crate::store::MemoryCache;
use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Identifies a resolved table: sorted codes, range and resampling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub codes: Vec<SeriesCode>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub frequency: Frequency,
    pub aggregator: Aggregator,
}

/// Identifies one raw series as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub code: SeriesCode,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Cache in front of a [`SeriesProvider`].
///
/// Resolved tables are cached per request set. Raw series are cached per
/// code and range as well, so a request set that overlaps a previous one
/// only fetches the codes it has not seen. A request set whose fetches fail
/// for any code leaves the cache untouched.
pub struct FetchCache {
    tables: Arc<dyn Cache<TableKey, AlignedTable>>,
    series: Arc<dyn Cache<SeriesKey, RawSeries>>,
    ttl: Duration,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_stores(
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryCache::new()),
            ttl,
        )
    }

    pub fn with_stores(
        tables: Arc<dyn Cache<TableKey, AlignedTable>>,
        series: Arc<dyn Cache<SeriesKey, RawSeries>>,
        ttl: Duration,
    ) -> Self {
        Self { tables, series, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_fetch(
        &self,
        requests: &RequestSet,
        frequency: Frequency,
        aggregator: Aggregator,
        provider: &dyn SeriesProvider,
    ) -> Result<AlignedTable, AnalyticsError> {
        let key = TableKey {
            codes: requests.sorted_codes(),
            start: requests.start(),
            end: requests.end(),
            frequency,
            aggregator,
        };

        if let Some(table) = self.tables.get(&key).await {
            debug!("Serving {} series from cached table", key.codes.len());
            return Ok(table);
        }

        let mut resolved = Vec::with_capacity(key.codes.len());
        let mut missing = Vec::new();
        for code in &key.codes {
            let series_key = SeriesKey {
                code: *code,
                start: key.start,
                end: key.end,
            };
            match self.series.get(&series_key).await {
                Some(series) => resolved.push(series),
                None => missing.push(series_key),
            }
        }

        info!(
            "Fetching {} of {} series ({} to {})",
            missing.len(),
            key.codes.len(),
            key.start,
            key.end
        );
        let fetches = missing.iter().map(|k| async move {
            (k, provider.fetch_series(k.code, k.start, k.end).await)
        });
        let mut fetched = Vec::with_capacity(missing.len());
        for (series_key, result) in join_all(fetches).await {
            match result {
                Ok(mut series) => {
                    if series.code != series_key.code {
                        warn!(
                            "Provider returned series {} for requested code {}",
                            series.code, series_key.code
                        );
                        series.code = series_key.code;
                    }
                    fetched.push((series_key.clone(), series));
                }
                Err(e) => {
                    debug!("Fetch failed for {}: {:#}", series_key.code, e);
                    return Err(AnalyticsError::Fetch {
                        code: series_key.code,
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        resolved.extend(fetched.iter().map(|(_, series)| series.clone()));
        let table = resample(&align(&resolved)?, frequency, aggregator);

        for (series_key, series) in fetched {
            self.series.put(series_key, series, Some(self.ttl)).await;
        }
        self.tables.put(key, table.clone(), Some(self.ttl)).await;

        Ok(table)
    }

    /// Drops every cached table and series.
    pub async fn clear(&self) {
        self.tables.clear().await;
        self.series.clear().await;
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        data: HashMap<SeriesCode, Vec<(NaiveDate, Option<f64>)>>,
        failing: Vec<SeriesCode>,
        calls: AtomicUsize,
        fetched: Mutex<Vec<SeriesCode>>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                data: HashMap::new(),
                failing: Vec::new(),
                calls: AtomicUsize::new(0),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn with_series(mut self, code: u32, points: &[(u32, f64)]) -> Self {
            self.data.insert(
                SeriesCode(code),
                points.iter().map(|(d, v)| (day(*d), Some(*v))).collect(),
            );
            self
        }

        fn failing_on(mut self, code: u32) -> Self {
            self.failing.push(SeriesCode(code));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SeriesProvider for MockProvider {
        async fn fetch_series(
            &self,
            code: SeriesCode,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<RawSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fetched.lock().unwrap().push(code);
            if self.failing.contains(&code) {
                return Err(anyhow!("HTTP error: 500 Internal Server Error"));
            }
            Ok(RawSeries::from_values(
                code,
                self.data.get(&code).cloned().unwrap_or_default(),
            ))
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn request_set(codes: &[u32]) -> RequestSet {
        RequestSet::new(
            codes.iter().map(|c| (SeriesCode(*c), String::new())),
            day(1),
            day(31),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let provider = MockProvider::new()
            .with_series(1, &[(1, 1.0), (2, 2.0)])
            .with_series(2, &[(2, 3.0)]);
        let cache = FetchCache::new();
        let requests = request_set(&[2, 1]);

        let first = cache
            .get_or_fetch(&requests, Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();
        assert_eq!(provider.calls(), 2);

        // Same codes in a different order map to the same key.
        let second = cache
            .get_or_fetch(&request_set(&[1, 2]), Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(first, second);
        assert_eq!(first.value(day(1), SeriesCode(2)), None);
    }

    #[tokio::test]
    async fn test_overlapping_request_set_only_fetches_new_codes() {
        let provider = MockProvider::new()
            .with_series(1, &[(1, 1.0)])
            .with_series(2, &[(1, 2.0)])
            .with_series(3, &[(1, 3.0)]);
        let cache = FetchCache::new();

        cache
            .get_or_fetch(&request_set(&[1, 2]), Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();
        let table = cache
            .get_or_fetch(&request_set(&[1, 2, 3]), Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(provider.fetched.lock().unwrap().last(), Some(&SeriesCode(3)));
        assert_eq!(table.codes().len(), 3);

        // A different frequency reuses the raw series.
        cache
            .get_or_fetch(&request_set(&[1, 2, 3]), Frequency::Monthly, Aggregator::Last, &provider)
            .await
            .unwrap();
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_failure_caches_nothing() {
        let provider = MockProvider::new()
            .with_series(1, &[(1, 1.0)])
            .failing_on(2);
        let cache = FetchCache::new();
        let requests = request_set(&[1, 2]);

        let result = cache
            .get_or_fetch(&requests, Frequency::Original, Aggregator::Last, &provider)
            .await;
        match result {
            Err(AnalyticsError::Fetch { code, message }) => {
                assert_eq!(code, SeriesCode(2));
                assert!(message.contains("500"));
            }
            other => panic!("Expected fetch error, got {other:?}"),
        }

        // Series 1 succeeded but was not cached either.
        let _ = cache
            .get_or_fetch(&requests, Frequency::Original, Aggregator::Last, &provider)
            .await;
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let provider = MockProvider::new().with_series(1, &[(1, 1.0)]);
        let cache = FetchCache::with_ttl(Duration::from_millis(10));
        let requests = request_set(&[1]);

        cache
            .get_or_fetch(&requests, Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .get_or_fetch(&requests, Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let provider = MockProvider::new().with_series(1, &[(1, 1.0)]);
        let cache = FetchCache::new();
        let requests = request_set(&[1]);

        cache
            .get_or_fetch(&requests, Frequency::Annual, Aggregator::Last, &provider)
            .await
            .unwrap();
        cache.clear().await;
        let table = cache
            .get_or_fetch(&requests, Frequency::Annual, Aggregator::Last, &provider)
            .await
            .unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(table.dates(), vec![NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()]);
    }

    #[tokio::test]
    async fn test_empty_series_is_a_valid_result() {
        let provider = MockProvider::new();
        let cache = FetchCache::new();

        let table = cache
            .get_or_fetch(&request_set(&[7]), Frequency::Original, Aggregator::Last, &provider)
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.codes(), &[SeriesCode(7)]);
    }
}
