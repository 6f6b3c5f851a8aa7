//! Statistics collection
//!
//! Per-operation latency accounting and per-worker phase records.
//!
//! Latency is tracked with a handful of running counters rather than a
//! histogram: the sum of all samples, the maximum, the sample count, and how
//! many samples exceeded the short (2 s) and long (10 s) thresholds. Records
//! from several workers merge by summing counters and taking the largest max.
//!
//! # Example
//!
//! ```
//! use iostorm::stats::Latency;
//!
//! let mut latency = Latency::default();
//! for sample in [1.0, 3.0, 11.0] {
//!     latency.record(sample);
//! }
//!
//! let summary = latency.finalize();
//! assert_eq!(summary.count, 3);
//! assert_eq!(summary.average_secs, 5.0);
//! assert_eq!(summary.max_secs, 11.0);
//! ```

pub mod aggregator;

use crate::util::time::Timing;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Samples slower than this many seconds count as slow
pub const SHORT_LATENCY_SECS: f64 = 2.0;
/// Samples slower than this many seconds count as very slow
pub const LONG_LATENCY_SECS: f64 = 10.0;

/// Running latency counters
///
/// `sum` holds the unnormalized total until `finalize` divides it by `count`.
/// Since the long threshold exceeds the short one, `count_long <= count_short
/// <= count` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Latency {
    sum: f64,
    max: f64,
    count: u64,
    count_short: u64,
    count_long: u64,
}

impl Latency {
    /// Record one sample, in seconds
    #[inline]
    pub fn record(&mut self, secs: f64) {
        if secs > self.max {
            self.max = secs;
        }
        self.sum += secs;
        self.count += 1;
        if secs > SHORT_LATENCY_SECS {
            self.count_short += 1;
        }
        if secs > LONG_LATENCY_SECS {
            self.count_long += 1;
        }
    }

    #[inline]
    pub fn record_duration(&mut self, elapsed: Duration) {
        self.record(elapsed.as_secs_f64());
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &Latency) {
        self.sum += other.sum;
        self.count += other.count;
        self.count_short += other.count_short;
        self.count_long += other.count_long;
        if other.max > self.max {
            self.max = other.max;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Unnormalized sum of all samples
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn count_short(&self) -> u64 {
        self.count_short
    }

    pub fn count_long(&self) -> u64 {
        self.count_long
    }

    /// Averages and threshold percentages; all zero when nothing was recorded
    pub fn finalize(&self) -> LatencySummary {
        let (average_secs, pct_short, pct_long) = if self.count > 0 {
            let n = self.count as f64;
            (
                self.sum / n,
                100.0 * self.count_short as f64 / n,
                100.0 * self.count_long as f64 / n,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        LatencySummary {
            count: self.count,
            average_secs,
            max_secs: self.max,
            pct_over_short: pct_short,
            pct_over_long: pct_long,
        }
    }
}

/// Finalized latency figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub average_secs: f64,
    pub max_secs: f64,
    /// Percentage of samples above `SHORT_LATENCY_SECS`
    pub pct_over_short: f64,
    /// Percentage of samples above `LONG_LATENCY_SECS`
    pub pct_over_long: f64,
}

impl LatencySummary {
    pub fn average_ms(&self) -> f64 {
        self.average_secs * 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        self.max_secs * 1000.0
    }
}

/// One worker's result for one phase
#[derive(Debug, Clone, Copy)]
pub struct PhaseRecord {
    /// Thread-scoped timer around the worker's phase loop
    pub timing: Timing,
    pub latency: Latency,
    /// Blocks transferred
    pub blocks: u64,
}

impl Default for PhaseRecord {
    fn default() -> Self {
        Self {
            timing: Timing::thread(),
            latency: Latency::default(),
            blocks: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_counters() {
        let mut latency = Latency::default();
        for sample in [1.0, 3.0, 11.0] {
            latency.record(sample);
        }

        assert_eq!(latency.count(), 3);
        assert_eq!(latency.count_short(), 2);
        assert_eq!(latency.count_long(), 1);
        assert_eq!(latency.max(), 11.0);
        assert_eq!(latency.sum(), 15.0);

        let summary = latency.finalize();
        assert_eq!(summary.average_secs, 5.0);
        assert!((summary.pct_over_short - 200.0 / 3.0).abs() < 1e-9);
        assert!((summary.pct_over_long - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut latency = Latency::default();
        latency.record(SHORT_LATENCY_SECS);
        latency.record(LONG_LATENCY_SECS);
        assert_eq!(latency.count_short(), 1);
        assert_eq!(latency.count_long(), 0);
    }

    #[test]
    fn test_empty_finalize_is_zero() {
        let summary = Latency::default().finalize();
        assert_eq!(summary, LatencySummary::default());
    }

    #[test]
    fn test_merge() {
        let mut a = Latency::default();
        a.record(0.5);
        a.record(2.5);

        let mut b = Latency::default();
        b.record(12.0);

        a.merge(&b);
        assert_eq!(a.count(), 3);
        assert_eq!(a.count_short(), 2);
        assert_eq!(a.count_long(), 1);
        assert_eq!(a.max(), 12.0);
        assert_eq!(a.sum(), 15.0);

        // Merging an empty accumulator changes nothing
        let before = a;
        a.merge(&Latency::default());
        assert_eq!(a, before);
    }

    #[test]
    fn test_milliseconds() {
        let mut latency = Latency::default();
        latency.record_duration(Duration::from_micros(1500));
        let summary = latency.finalize();
        assert!((summary.average_ms() - 1.5).abs() < 1e-9);
        assert!((summary.max_ms() - 1.5).abs() < 1e-9);
    }
}
