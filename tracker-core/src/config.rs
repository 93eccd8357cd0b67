//! Fixed configuration surface for the tracker.
//!
//! The refresh cadence, history depth, and calculator seed are design
//! constants rather than runtime knobs. The effective look-back duration is
//! `HISTORY_CAPACITY * REFRESH_INTERVAL` (about 8.3 minutes at the
//! defaults) because eviction is size-based, not time-based.

use std::time::Duration;

/// Period between scheduled fetch+ingest cycles.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum number of retained samples; the oldest is evicted beyond this.
pub const HISTORY_CAPACITY: usize = 100;

/// Calculator seed ratio used before any real data has been ingested.
pub const DEFAULT_RATIO: f64 = 10.0;

/// Provider symbol for the S&P 500 E-mini futures contract.
pub const ES_SYMBOL: &str = "ES=F";

/// Provider symbol for the SPDR S&P 500 ETF.
pub const SPY_SYMBOL: &str = "SPY";

/// Fetcher configuration.
///
/// Defaults target the provider's intraday chart endpoint; the builder
/// exists so tests can point the fetcher at a fixture server. Both symbols
/// are always queried with the same range and interval so the pair stays
/// time-aligned.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Chart endpoint base, queried as `{endpoint}/{symbol}?range=..&interval=..`
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Lookback window requested from the provider
    pub range: String,
    /// Bar granularity, identical for both symbols
    pub interval: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            timeout: Duration::from_secs(10),
            range: "1d".to_string(),
            interval: "1m".to_string(),
        }
    }
}

impl FetchConfig {
    /// Create a new configuration with a custom endpoint base
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the lookback range
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// Set the bar interval
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = FetchConfig::new("http://127.0.0.1:8080/chart")
            .with_timeout(Duration::from_secs(3))
            .with_range("5d")
            .with_interval("5m");

        assert_eq!(config.endpoint, "http://127.0.0.1:8080/chart");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.range, "5d");
        assert_eq!(config.interval, "5m");
    }

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(
            config.endpoint,
            "https://query1.finance.yahoo.com/v8/finance/chart"
        );
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.range, "1d");
        assert_eq!(config.interval, "1m");
    }
}
