use anyhow::Error;
use chrono::{Months, NaiveDate};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                warn!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Splits `[start, end]` into consecutive inclusive windows spanning at most
/// `months` months each.
pub fn date_windows(start: NaiveDate, end: NaiveDate, months: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let window_end = cursor
            .checked_add_months(Months::new(months))
            .and_then(|d| d.pred_opt())
            .map_or(end, |d| d.min(end));
        windows.push((cursor, window_end));
        match window_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    windows
}
