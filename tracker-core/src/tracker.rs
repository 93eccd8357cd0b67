//! Thread-safe tracking state shared by the presentation shells.
//!
//! A single `RatioTracker` owns the bounded history and derived metrics;
//! shells hold `Arc` handles and read consistent snapshots while the
//! refresh loop ingests on its own task.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::calc::percent_change;
use crate::config::{DEFAULT_RATIO, HISTORY_CAPACITY};
use crate::sample::{PriceSeries, Sample};

/// Marker for the last successful state transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "time", rename_all = "snake_case")]
pub enum LastUpdate {
    /// No ingest has happened since process start
    Never,
    /// History was explicitly cleared
    Cleared,
    /// Time of the most recent successful ingest
    At(DateTime<Utc>),
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdate::Never => write!(f, "not updated yet"),
            LastUpdate::Cleared => write!(f, "data cleared"),
            LastUpdate::At(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Consistent point-in-time copy of the tracking state, handed to shells
/// for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    /// Retained window, oldest to newest
    pub samples: Vec<Sample>,
    /// ES change between the two most recent samples, percent
    pub es_change_pct: f64,
    /// SPY change between the two most recent samples, percent
    pub spy_change_pct: f64,
    /// Ratio change between the two most recent samples, percent
    pub ratio_change_pct: f64,
    /// Latest ES/SPY ratio as seen by the calculator
    pub current_ratio: f64,
    pub last_update: LastUpdate,
}

impl TrackerSnapshot {
    /// Most recent sample, if any
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Check if no history is retained
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug)]
struct TrackerState {
    series: PriceSeries,
    es_change_pct: f64,
    spy_change_pct: f64,
    ratio_change_pct: f64,
    current_ratio: f64,
    last_update: LastUpdate,
}

impl TrackerState {
    fn new(capacity: usize) -> Self {
        Self {
            series: PriceSeries::new(capacity),
            es_change_pct: 0.0,
            spy_change_pct: 0.0,
            ratio_change_pct: 0.0,
            current_ratio: DEFAULT_RATIO,
            last_update: LastUpdate::Never,
        }
    }
}

/// Owns the bounded ES/SPY history and its derived metrics.
///
/// `ingest` and `clear` are the only writers and are mutually exclusive;
/// `snapshot` and `current_ratio` are readers. A reader always observes the
/// result of one completed write, never a partial mutation. No tracker
/// operation performs network I/O.
#[derive(Debug)]
pub struct RatioTracker {
    state: RwLock<TrackerState>,
}

impl RatioTracker {
    /// Create an empty tracker with the default history capacity
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty tracker with a custom history capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(TrackerState::new(capacity)),
        }
    }

    /// Append a sample and recompute the derived metrics.
    ///
    /// Percent-changes are computed strictly from the two most recently
    /// retained samples. A zero base leaves the prior percent-change value
    /// unchanged rather than dividing by zero.
    pub fn ingest(&self, sample: Sample) {
        let mut state = self.state.write();

        let prev = state.series.latest().copied();
        state.series.push(sample);

        if let Some(prev) = prev {
            if let Some(pct) = percent_change(prev.es, sample.es) {
                state.es_change_pct = pct;
            }
            if let Some(pct) = percent_change(prev.spy, sample.spy) {
                state.spy_change_pct = pct;
            }
            if let Some(pct) = percent_change(prev.ratio(), sample.ratio()) {
                state.ratio_change_pct = pct;
            }
        }

        state.current_ratio = sample.ratio();
        state.last_update = LastUpdate::At(sample.time);

        debug!(
            es = sample.es,
            spy = sample.spy,
            ratio = sample.ratio(),
            len = state.series.len(),
            "ingested sample"
        );
    }

    /// Consistent point-in-time copy of the full state for rendering.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.read();
        TrackerSnapshot {
            samples: state.series.to_vec(),
            es_change_pct: state.es_change_pct,
            spy_change_pct: state.spy_change_pct,
            ratio_change_pct: state.ratio_change_pct,
            current_ratio: state.current_ratio,
            last_update: state.last_update,
        }
    }

    /// Atomically reset the history and zero the percent-change metrics.
    ///
    /// The calculator ratio survives a clear so conversions keep working
    /// between data resets; it only reverts to the seed on process restart.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.series.clear();
        state.es_change_pct = 0.0;
        state.spy_change_pct = 0.0;
        state.ratio_change_pct = 0.0;
        state.last_update = LastUpdate::Cleared;

        debug!("tracker history cleared");
    }

    /// Latest ES/SPY ratio, or the configured seed before any ingest.
    pub fn current_ratio(&self) -> f64 {
        self.state.read().current_ratio
    }
}

impl Default for RatioTracker {
    fn default() -> Self {
        Self::new()
    }
}
