use thiserror::Error;

/// All errors generated while acquiring the price pair.
///
/// The distinguishing provider message is preserved in every variant so the
/// shells can display it verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("provider error for {symbol}: {code}: {description}")]
    Provider {
        symbol: String,
        code: String,
        description: String,
    },

    #[error("malformed provider response for {symbol}: {detail}")]
    Malformed { symbol: String, detail: String },

    #[error("no intraday history returned for {symbol}")]
    EmptyHistory { symbol: String },
}

impl FetchError {
    /// Determine if the refresh loop should simply retry on its next tick.
    ///
    /// A failed fetch never mutates tracker state and never terminates the
    /// loop, so every variant classifies as transient; the explicit match
    /// keeps that contract visible when variants are added.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(_)
            | FetchError::Status { .. }
            | FetchError::Provider { .. }
            | FetchError::Malformed { .. }
            | FetchError::EmptyHistory { .. } => true,
        }
    }
}

/// Invalid input supplied to the price calculator.
///
/// Calculator validation never touches tracker state; it is reported to the
/// immediate caller only.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid price {0}: must be a positive, finite number")]
    Price(f64),

    #[error("invalid ratio {0}: must be a positive, finite number")]
    Ratio(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_transient() {
        struct TestCase {
            input: FetchError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: network failure retries on the next tick
                input: FetchError::Request("connection refused".to_string()),
                expected: true,
            },
            TestCase {
                // TC1: provider outage retries on the next tick
                input: FetchError::Status {
                    symbol: "ES=F".to_string(),
                    status: 502,
                },
                expected: true,
            },
            TestCase {
                // TC2: provider-reported error retries on the next tick
                input: FetchError::Provider {
                    symbol: "SPY".to_string(),
                    code: "Not Found".to_string(),
                    description: "No data found".to_string(),
                },
                expected: true,
            },
            TestCase {
                // TC3: empty history retries on the next tick
                input: FetchError::EmptyHistory {
                    symbol: "ES=F".to_string(),
                },
                expected: true,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_transient();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_fetch_error_preserves_detail() {
        let err = FetchError::Provider {
            symbol: "SPY".to_string(),
            code: "Not Found".to_string(),
            description: "No data found, symbol may be delisted".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("SPY"));
        assert!(rendered.contains("No data found, symbol may be delisted"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::Ratio(-1.5);
        assert!(err.to_string().contains("-1.5"));
        assert!(err.to_string().contains("ratio"));
    }
}
