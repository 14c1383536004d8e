//! Breath-event detection over a smoothed level series.

use crate::constants::EPSILON;
use crate::signal::{mean, std_dev};

/// Peak detection parameters.
#[derive(Clone, Copy, Debug)]
pub struct PeakParams {
    /// Threshold = mean + k * stddev.
    pub threshold_k: f64,
    /// Strict comparison span on each side.
    pub neighbors: usize,
    /// Minimum distance from the previously accepted peak.
    pub min_distance_ms: u64,
}

/// Timestamps of accepted peaks in `smoothed`, oldest first.
///
/// `smoothed` and `timestamps` must be aligned; extra entries in the longer
/// slice are ignored. A sample is a candidate when it is above the threshold
/// and strictly greater than `neighbors` samples on each side. Candidates
/// within `min_distance_ms` of the last accepted peak are dropped.
pub fn detect_peaks(smoothed: &[f64], timestamps: &[u64], params: PeakParams) -> Vec<u64> {
    let n = smoothed.len().min(timestamps.len());
    let span = params.neighbors.max(1);
    if n < 2 * span + 1 {
        return Vec::new();
    }

    let series = &smoothed[..n];
    let spread = std_dev(series);
    // rounding noise in a flat series is not a breath
    if spread < EPSILON {
        return Vec::new();
    }
    let threshold = mean(series) + params.threshold_k * spread;

    let mut peaks: Vec<u64> = Vec::new();
    for i in span..n - span {
        let v = series[i];
        if v <= threshold {
            continue;
        }
        let is_max = (1..=span).all(|j| v > series[i - j] && v > series[i + j]);
        if !is_max {
            continue;
        }
        let t = timestamps[i];
        if let Some(&last) = peaks.last()
            && t.saturating_sub(last) < params.min_distance_ms
        {
            continue;
        }
        peaks.push(t);
    }
    peaks
}

/// Peak-to-peak intervals in ms, keeping only those inside `[min_ms, max_ms]`.
pub fn valid_intervals(peaks: &[u64], min_ms: u64, max_ms: u64) -> Vec<f64> {
    peaks
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]))
        .filter(|d| (min_ms..=max_ms).contains(d))
        .map(|d| d as f64)
        .collect()
}
