//! Sample and bounded-history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One synchronized observation of both tracked instruments.
///
/// Immutable once created; both prices come from the same provider query
/// granularity so the pair is time-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// ES futures price
    pub es: f64,
    /// SPY ETF price
    pub spy: f64,
    /// Wall-clock time the pair was captured
    pub time: DateTime<Utc>,
}

impl Sample {
    pub fn new(es: f64, spy: f64, time: DateTime<Utc>) -> Self {
        Self { es, spy, time }
    }

    /// ES price divided by SPY price.
    pub fn ratio(&self) -> f64 {
        self.es / self.spy
    }
}

/// Capacity-bounded, time-ascending history of samples.
///
/// Insertion is append-only; once full the oldest entry is evicted so the
/// window always holds the most recent `capacity` observations in original
/// order.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    /// Maximum number of entries to keep
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl PriceSeries {
    /// Create a new series with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest entry if at capacity
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Second most recent sample
    pub fn previous(&self) -> Option<&Sample> {
        self.samples.iter().rev().nth(1)
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Copy out the retained window, oldest to newest
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(es: f64, spy: f64) -> Sample {
        Sample::new(es, spy, Utc::now())
    }

    #[test]
    fn test_ratio() {
        let s = sample(4200.0, 420.0);
        assert!((s.ratio() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_series_bounded_eviction() {
        let mut series = PriceSeries::new(3);

        for i in 0..5 {
            series.push(sample(100.0 + i as f64, 10.0));
            assert!(series.len() <= 3);
        }

        // Retained window is exactly the most recent 3, in original order
        let es_prices: Vec<f64> = series.iter().map(|s| s.es).collect();
        assert_eq!(es_prices, vec![102.0, 103.0, 104.0]);
        assert_eq!(series.latest().unwrap().es, 104.0);
        assert_eq!(series.previous().unwrap().es, 103.0);
    }

    #[test]
    fn test_series_previous_needs_two() {
        let mut series = PriceSeries::new(10);
        assert!(series.previous().is_none());

        series.push(sample(100.0, 10.0));
        assert!(series.latest().is_some());
        assert!(series.previous().is_none());

        series.push(sample(101.0, 10.0));
        assert_eq!(series.previous().unwrap().es, 100.0);
    }

    #[test]
    fn test_series_clear() {
        let mut series = PriceSeries::new(4);
        series.push(sample(100.0, 10.0));
        series.push(sample(101.0, 10.0));

        series.clear();
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
        assert_eq!(series.capacity(), 4);
    }
}
