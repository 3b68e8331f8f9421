use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::config::SgsProviderConfig;
use crate::core::series::{Observation, RawSeries, SeriesCode, SeriesProvider};
use crate::providers::util::{date_windows, with_retry};

/// The SGS API refuses ranges longer than ten years.
const MAX_WINDOW_MONTHS: u32 = 120;
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Fetches series from the Banco Central do Brasil SGS open data API.
pub struct SgsProvider {
    base_url: String,
    retries: usize,
    retry_delay_ms: u64,
}

impl SgsProvider {
    pub fn new(base_url: &str) -> Self {
        SgsProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries: 3,
            retry_delay_ms: 500,
        }
    }

    pub fn from_config(config: &SgsProviderConfig) -> Self {
        SgsProvider {
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
            ..Self::new(&config.base_url)
        }
    }

    async fn fetch_window(
        &self,
        client: &reqwest::Client,
        code: SeriesCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>> {
        let url = format!("{}/dados/serie/bcdata.sgs.{}/dados", self.base_url, code);
        let params = [
            ("formato", "json".to_string()),
            ("dataInicial", start.format(DATE_FORMAT).to_string()),
            ("dataFinal", end.format(DATE_FORMAT).to_string()),
        ];
        debug!("Requesting series data from {} ({} to {})", url, start, end);

        let response = with_retry(
            || async { client.get(&url).query(&params).send().await },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Request error for series: {code} URL: {url}"))?;

        // SGS answers 404 when the range holds no values.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No values for series {} between {} and {}", code, start, end);
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for series: {}",
                response.status(),
                code
            ));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for series: {code}"))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let points: Vec<SgsPoint> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse SGS response for series {code}"))?;

        points
            .into_iter()
            .map(|point| point.into_observation(code))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SgsPoint {
    data: String,
    valor: SgsValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SgsValue {
    Number(f64),
    Text(String),
    Null,
}

impl SgsPoint {
    fn into_observation(self, code: SeriesCode) -> Result<Observation> {
        let date = NaiveDate::parse_from_str(self.data.trim(), DATE_FORMAT)
            .with_context(|| format!("Invalid date '{}' for series {}", self.data, code))?;
        let value = match self.valor {
            SgsValue::Number(n) => Some(n),
            SgsValue::Text(text) => text.trim().parse::<f64>().ok(),
            SgsValue::Null => None,
        };
        Ok(Observation { date, value })
    }
}

#[async_trait]
impl SeriesProvider for SgsProvider {
    #[instrument(name = "SgsFetch", skip(self), fields(code = %code))]
    async fn fetch_series(
        &self,
        code: SeriesCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries> {
        let client = reqwest::Client::builder().user_agent("tslab/0.1").build()?;

        let mut observations = Vec::new();
        for (window_start, window_end) in date_windows(start, end, MAX_WINDOW_MONTHS) {
            let chunk = self
                .fetch_window(&client, code, window_start, window_end)
                .await?;
            observations.extend(chunk);
        }

        observations.retain(|o| o.date >= start && o.date <= end);
        observations.sort_by_key(|o| o.date);
        debug!("Fetched {} observations for series {}", observations.len(), code);

        Ok(RawSeries::new(code, observations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider(server: &MockServer) -> SgsProvider {
        SgsProvider::from_config(&SgsProviderConfig {
            base_url: server.uri(),
            retries: 0,
            retry_delay_ms: 0,
        })
    }

    async fn mount(server: &MockServer, code: u32, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/dados/serie/bcdata.sgs.{code}/dados")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_series_fetch() {
        let server = MockServer::start().await;
        let body = r#"[
            {"data": "01/02/2020", "valor": "0.25"},
            {"data": "01/01/2020", "valor": "0.21"},
            {"data": "01/03/2020", "valor": ""},
            {"data": "01/04/2020", "valor": -0.31}
        ]"#;
        Mock::given(method("GET"))
            .and(path("/dados/serie/bcdata.sgs.433/dados"))
            .and(query_param("formato", "json"))
            .and(query_param("dataInicial", "01/01/2020"))
            .and(query_param("dataFinal", "31/12/2020"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let series = provider(&server)
            .fetch_series(SeriesCode(433), date(2020, 1, 1), date(2020, 12, 31))
            .await
            .unwrap();

        assert_eq!(series.code, SeriesCode(433));
        let values: Vec<_> = series.observations.iter().map(|o| (o.date, o.value)).collect();
        assert_eq!(
            values,
            vec![
                (date(2020, 1, 1), Some(0.21)),
                (date(2020, 2, 1), Some(0.25)),
                (date(2020, 3, 1), None),
                (date(2020, 4, 1), Some(-0.31)),
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_is_empty_series() {
        let server = MockServer::start().await;
        mount(&server, 1, 404, r#"{"error": "Value(s) not found"}"#).await;

        let series = provider(&server)
            .fetch_series(SeriesCode(1), date(2020, 1, 1), date(2020, 1, 5))
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        mount(&server, 1, 500, "").await;

        let result = provider(&server)
            .fetch_series(SeriesCode(1), date(2020, 1, 1), date(2020, 1, 5))
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for series: 1"
        );
    }

    #[tokio::test]
    async fn test_malformed_response_is_reported() {
        let server = MockServer::start().await;
        mount(&server, 1, 200, r#"{"message": "unexpected"}"#).await;

        let result = provider(&server)
            .fetch_series(SeriesCode(1), date(2020, 1, 1), date(2020, 1, 5))
            .await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse SGS response for series 1")
        );
    }

    #[tokio::test]
    async fn test_long_range_is_fetched_in_windows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dados/serie/bcdata.sgs.1/dados"))
            .and(query_param("dataInicial", "01/01/2005"))
            .and(query_param("dataFinal", "31/12/2014"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"data": "03/01/2005", "valor": "2.70"}]"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dados/serie/bcdata.sgs.1/dados"))
            .and(query_param("dataInicial", "01/01/2015"))
            .and(query_param("dataFinal", "30/06/2016"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"data": "02/01/2015", "valor": "2.69"}]"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let series = provider(&server)
            .fetch_series(SeriesCode(1), date(2005, 1, 1), date(2016, 6, 30))
            .await
            .unwrap();
        assert_eq!(series.observations.len(), 2);
        assert_eq!(series.observations[1].date, date(2015, 1, 2));
    }
}
