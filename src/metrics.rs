//! Windowed latency statistics (C6), used to validate the fabric's latency
//! targets under load. Not on the request path.
//!
//! Grounded on `tracing/counter.go`'s `Counter`/`AddOne`/`AddTimeSince`: this
//! expansion keeps a fixed-size sample buffer instead of a running
//! sum-of-squares so that p50/p75/p99 can be reported alongside mean/stdev,
//! per SPEC_FULL.md §2.1/§4.6 (the original reports only mean/stdev/min/max
//! every 1000 samples; this buffers 5000 and adds percentiles).

use parking_lot::Mutex;
use std::time::Duration;

/// Samples held before a window reports and resets.
const WINDOW_SIZE: usize = 5000;

struct Window {
    label: String,
    samples: Vec<i64>,
}

pub struct Counter {
    inner: Mutex<Window>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub count: usize,
    pub mean: f64,
    pub stdev: f64,
    pub min: i64,
    pub max: i64,
    pub p50: i64,
    pub p75: i64,
    pub p99: i64,
}

impl Counter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Window {
                label: label.into(),
                samples: Vec::with_capacity(WINDOW_SIZE),
            }),
        }
    }

    /// Records one microsecond sample. Never allocates on the steady path:
    /// the buffer is pre-sized to `WINDOW_SIZE` and cleared in place on
    /// reset.
    pub fn observe(&self, microseconds: i64) {
        let mut window = self.inner.lock();
        window.samples.push(microseconds);
        if window.samples.len() >= WINDOW_SIZE {
            let report = summarize(&mut window.samples);
            tracing::info!(
                label = %window.label,
                count = report.count,
                mean = report.mean,
                stdev = report.stdev,
                min = report.min,
                max = report.max,
                p50 = report.p50,
                p75 = report.p75,
                p99 = report.p99,
                "latency window report"
            );
            window.samples.clear();
        }
    }

    pub fn observe_elapsed(&self, since: std::time::Instant) {
        self.observe(since.elapsed().as_micros() as i64);
    }

    pub fn observe_duration(&self, d: Duration) {
        self.observe(d.as_micros() as i64);
    }
}

fn summarize(samples: &mut [i64]) -> Report {
    samples.sort_unstable();
    let count = samples.len();
    let sum: i64 = samples.iter().sum();
    let mean = sum as f64 / count as f64;
    let variance = samples
        .iter()
        .map(|v| {
            let d = *v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64;
    Report {
        count,
        mean,
        stdev: variance.sqrt(),
        min: samples[0],
        max: samples[count - 1],
        p50: percentile(samples, 0.50),
        p75: percentile(samples, 0.75),
        p99: percentile(samples, 0.99),
    }
}

fn percentile(sorted_samples: &[i64], p: f64) -> i64 {
    let idx = ((sorted_samples.len() as f64 - 1.0) * p).round() as usize;
    sorted_samples[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_after_a_full_window() {
        let counter = Counter::new("test");
        for i in 0..WINDOW_SIZE {
            counter.observe(i as i64);
        }
        assert_eq!(counter.inner.lock().samples.len(), 0);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let mut samples: Vec<i64> = (0..1000).collect();
        let report = summarize(&mut samples);
        assert!(report.p50 <= report.p75);
        assert!(report.p75 <= report.p99);
        assert_eq!(report.min, 0);
        assert_eq!(report.max, 999);
    }
}
