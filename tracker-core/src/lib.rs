//! ES/SPY Price Tracker - Core Engine
//!
//! This library provides the data-tracking engine shared by the two
//! presentation shells:
//! - tracker-tui: continuously-looping terminal dashboard
//! - tracker-server: request-triggered WebSocket shell
//!
//! The library includes:
//! - Sample / bounded-history data types
//! - The thread-safe `RatioTracker` with consistent snapshots
//! - The provider fetcher behind the `PriceSource` seam
//! - The shared periodic refresh loop
//! - Calculator arithmetic used by both shells

pub mod calc;
pub mod config;
pub mod error;
pub mod fetch;
pub mod refresh;
pub mod sample;
pub mod tracker;

// Re-export commonly used items for convenience
pub use calc::{es_from_spy, percent_change, spy_from_es};
pub use config::{
    DEFAULT_RATIO, ES_SYMBOL, FetchConfig, HISTORY_CAPACITY, REFRESH_INTERVAL, SPY_SYMBOL,
};
pub use error::{FetchError, ValidationError};
pub use fetch::{Fetcher, PriceSource};
pub use refresh::{RefreshEvent, RefreshHandle, refresh_once, spawn_refresh_loop};
pub use sample::{PriceSeries, Sample};
pub use tracker::{LastUpdate, RatioTracker, TrackerSnapshot};
