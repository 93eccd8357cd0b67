//! Price-pair acquisition from the market-data provider.
//!
//! Both symbols are queried with the same lookback and bar interval so the
//! pair is time-aligned. The call fails as a whole if either side is
//! unavailable; a ratio is never computed from a one-sided sample.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::config::{ES_SYMBOL, FetchConfig, SPY_SYMBOL};
use crate::error::FetchError;
use crate::sample::Sample;

/// Source of aligned price pairs consumed by the refresh loop.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self) -> Result<Sample, FetchError>;
}

/// Provider chart response envelope
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartErrorBody>,
}

/// Provider-reported error payload (e.g. unknown or delisted symbol)
#[derive(Debug, Deserialize)]
struct ChartErrorBody {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

/// Per-bar quote arrays; bars still forming are null
#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Most recent usable close for `symbol`, skipping the trailing nulls
    /// the provider emits for bars still forming.
    fn latest_close(&self, symbol: &str) -> Result<f64, FetchError> {
        if let Some(err) = &self.chart.error {
            return Err(FetchError::Provider {
                symbol: symbol.to_string(),
                code: err.code.clone(),
                description: err.description.clone(),
            });
        }

        let result = self
            .chart
            .result
            .as_ref()
            .and_then(|results| results.first())
            .ok_or_else(|| FetchError::EmptyHistory {
                symbol: symbol.to_string(),
            })?;

        let quote = result.indicators.quote.first().ok_or_else(|| {
            FetchError::Malformed {
                symbol: symbol.to_string(),
                detail: "missing quote block".to_string(),
            }
        })?;

        let close = quote
            .close
            .iter()
            .rev()
            .flatten()
            .copied()
            .next()
            .ok_or_else(|| FetchError::EmptyHistory {
                symbol: symbol.to_string(),
            })?;

        // A non-positive close would poison the ratio and the zero-base
        // percent-change guard downstream; treat it as bad provider data.
        if !close.is_finite() || close <= 0.0 {
            return Err(FetchError::Malformed {
                symbol: symbol.to_string(),
                detail: format!("non-positive close {close}"),
            });
        }

        Ok(close)
    }
}

/// HTTP fetcher for the two tracked symbols.
///
/// Purely functional from the engine's perspective: no retry or backoff
/// lives here, and no tracker lock is held across a request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Create a fetcher with the default provider configuration
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    /// Create a fetcher with a custom configuration
    pub fn with_config(config: FetchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn latest_close(&self, symbol: &str) -> Result<f64, FetchError> {
        let url = format!(
            "{}/{}?range={}&interval={}",
            self.config.endpoint, symbol, self.config.range, self.config.interval
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Request(format!("{symbol}: {e}")))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: ChartResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::Malformed {
                    symbol: symbol.to_string(),
                    detail: e.to_string(),
                })?;

        body.latest_close(symbol)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for Fetcher {
    async fn fetch(&self) -> Result<Sample, FetchError> {
        let es = self.latest_close(ES_SYMBOL).await?;
        let spy = self.latest_close(SPY_SYMBOL).await?;

        debug!(es, spy, "fetched aligned price pair");
        Ok(Sample::new(es, spy, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChartResponse {
        serde_json::from_str(json).expect("valid chart JSON")
    }

    #[test]
    fn test_latest_close_skips_trailing_nulls() {
        let response = parse(
            r#"{
                "chart": {
                    "result": [{
                        "indicators": {
                            "quote": [{"close": [5310.25, 5311.0, 5312.5, null, null]}]
                        }
                    }],
                    "error": null
                }
            }"#,
        );

        let close = response.latest_close("ES=F").unwrap();
        assert!((close - 5312.5).abs() < 1e-9);
    }

    #[test]
    fn test_all_null_closes_is_empty_history() {
        let response = parse(
            r#"{
                "chart": {
                    "result": [{
                        "indicators": {"quote": [{"close": [null, null]}]}
                    }],
                    "error": null
                }
            }"#,
        );

        assert_eq!(
            response.latest_close("SPY"),
            Err(FetchError::EmptyHistory {
                symbol: "SPY".to_string()
            })
        );
    }

    #[test]
    fn test_missing_result_is_empty_history() {
        let response = parse(r#"{"chart": {"result": null, "error": null}}"#);

        assert!(matches!(
            response.latest_close("ES=F"),
            Err(FetchError::EmptyHistory { .. })
        ));
    }

    #[test]
    fn test_provider_error_preserves_code_and_description() {
        let response = parse(
            r#"{
                "chart": {
                    "result": null,
                    "error": {
                        "code": "Not Found",
                        "description": "No data found, symbol may be delisted"
                    }
                }
            }"#,
        );

        let err = response.latest_close("ES=F").unwrap_err();
        assert_eq!(
            err,
            FetchError::Provider {
                symbol: "ES=F".to_string(),
                code: "Not Found".to_string(),
                description: "No data found, symbol may be delisted".to_string(),
            }
        );
    }

    #[test]
    fn test_non_positive_close_is_malformed() {
        let response = parse(
            r#"{
                "chart": {
                    "result": [{
                        "indicators": {"quote": [{"close": [531.0, 0.0]}]}
                    }],
                    "error": null
                }
            }"#,
        );

        assert!(matches!(
            response.latest_close("SPY"),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_quote_block_is_malformed() {
        let response = parse(
            r#"{
                "chart": {
                    "result": [{"indicators": {"quote": []}}],
                    "error": null
                }
            }"#,
        );

        assert!(matches!(
            response.latest_close("ES=F"),
            Err(FetchError::Malformed { .. })
        ));
    }
}
