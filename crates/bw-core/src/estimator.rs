//! Breathing estimator: audio-level stream in, breathing metrics out.
//!
//! Each accepted sample is appended to a time-bounded history. Once enough
//! samples exist the whole window is re-analyzed:
//!
//! 1. symmetric moving average over the raw levels
//! 2. peaks above `mean + k * stddev`, strict over ±`peak_neighbors`,
//!    at least `min_peak_distance_ms` apart
//! 3. peak-to-peak intervals outside the plausible band are dropped
//! 4. with at least `min_valid_intervals` intervals, rate, depth,
//!    regularity, coherence and the stress index are recomputed wholesale
//!
//! When intervals are insufficient the previous metrics stand and
//! confidence drops below the recommendation gate.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::peaks::{PeakParams, detect_peaks, valid_intervals};
use crate::sample::{Sample, SampleHistory};
use crate::signal::{
    coefficient_of_variation, mean, mean_successive_difference, moving_average, percentile,
};

/// Estimator tunables. Every field has a default so partial TOML tables work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub window_ms: u64,
    pub max_samples: usize,
    pub min_samples: usize,
    pub smoothing_radius: usize,
    pub peak_threshold_k: f64,
    pub peak_neighbors: usize,
    pub min_peak_distance_ms: u64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub min_valid_intervals: usize,
    pub min_rate_bpm: f64,
    pub max_rate_bpm: f64,
    pub depth_gain: f64,
    pub regularity_gain: f64,
    pub coherence_gain: f64,
    pub confidence_saturation_peaks: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_ms: WINDOW_MS,
            max_samples: MAX_SAMPLES,
            min_samples: MIN_SAMPLES,
            smoothing_radius: SMOOTHING_RADIUS,
            peak_threshold_k: PEAK_THRESHOLD_K,
            peak_neighbors: PEAK_NEIGHBORS,
            min_peak_distance_ms: MIN_PEAK_DISTANCE_MS,
            min_interval_ms: MIN_INTERVAL_MS,
            max_interval_ms: MAX_INTERVAL_MS,
            min_valid_intervals: MIN_VALID_INTERVALS,
            min_rate_bpm: MIN_RATE_BPM,
            max_rate_bpm: MAX_RATE_BPM,
            depth_gain: DEPTH_GAIN,
            regularity_gain: REGULARITY_GAIN,
            coherence_gain: COHERENCE_GAIN,
            confidence_saturation_peaks: CONFIDENCE_SATURATION_PEAKS,
        }
    }
}

/// Latest breathing estimate. Replaced as a whole on every update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathingMetrics {
    /// Breaths per minute, within the configured rate band.
    pub rate: f64,
    /// Amplitude spread, [0, 1].
    pub depth: f64,
    /// Interval consistency, [0, 1]; 1 = perfectly even spacing.
    pub regularity: f64,
    /// Successive-interval smoothness, [0, 1].
    pub coherence: f64,
    /// Composite stress index, [0, 1].
    pub stress_level: f64,
}

impl Default for BreathingMetrics {
    fn default() -> Self {
        Self {
            rate: 12.0,
            depth: 0.0,
            regularity: 0.0,
            coherence: 0.0,
            stress_level: 0.5,
        }
    }
}

/// What a single `ingest` call did to the estimator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimateOutcome {
    /// Sample was older than the newest retained one and was dropped.
    Rejected,
    /// Fewer than `min_samples` retained; nothing recomputed.
    Warming,
    /// Window analyzed but too few valid intervals; metrics held.
    InsufficientPeaks,
    /// Metrics and confidence recomputed.
    Updated,
}

/// Rolling breathing estimator. Single owner, single writer.
#[derive(Clone, Debug)]
pub struct BreathingEstimator {
    config: EstimatorConfig,
    history: SampleHistory,
    metrics: BreathingMetrics,
    confidence: f64,
    peaks: Vec<u64>,
    intervals: Vec<f64>,
    updates: u64,
}

impl Default for BreathingEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl BreathingEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        let history = SampleHistory::new(config.window_ms, config.max_samples);
        Self {
            config,
            history,
            metrics: BreathingMetrics::default(),
            confidence: 0.0,
            peaks: Vec::new(),
            intervals: Vec::new(),
            updates: 0,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Append a sample, prune the window and recompute when there is enough history.
    pub fn ingest(&mut self, sample: Sample) -> EstimateOutcome {
        if !self.history.push(sample) {
            return EstimateOutcome::Rejected;
        }
        if self.history.len() < self.config.min_samples {
            return EstimateOutcome::Warming;
        }
        self.recompute()
    }

    pub fn current_metrics(&self) -> BreathingMetrics {
        self.metrics
    }

    pub fn current_confidence(&self) -> f64 {
        self.confidence
    }

    /// Peak timestamps found by the most recent analysis.
    pub fn peaks(&self) -> &[u64] {
        &self.peaks
    }

    /// Valid breath-cycle durations (ms) from the most recent analysis.
    pub fn recent_cycles(&self) -> &[f64] {
        &self.intervals
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Number of times metrics have been recomputed.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Drop history and return to initial defaults.
    pub fn reset(&mut self) {
        self.history.clear();
        self.metrics = BreathingMetrics::default();
        self.confidence = 0.0;
        self.peaks.clear();
        self.intervals.clear();
        self.updates = 0;
    }

    fn recompute(&mut self) -> EstimateOutcome {
        let cfg = &self.config;
        let levels = self.history.levels();
        let timestamps = self.history.timestamps();

        let smoothed = moving_average(&levels, cfg.smoothing_radius);
        let peaks = detect_peaks(
            &smoothed,
            &timestamps,
            PeakParams {
                threshold_k: cfg.peak_threshold_k,
                neighbors: cfg.peak_neighbors,
                min_distance_ms: cfg.min_peak_distance_ms,
            },
        );
        let intervals = valid_intervals(&peaks, cfg.min_interval_ms, cfg.max_interval_ms);
        let peak_term = self.peak_term(peaks.len());

        self.peaks = peaks;

        if intervals.len() < cfg.min_valid_intervals.max(1) {
            self.intervals = intervals;
            self.confidence = clamp01(peak_term * LOW_CONFIDENCE_SCALE);
            return EstimateOutcome::InsufficientPeaks;
        }

        let mean_interval = mean(&intervals);
        let rate = (60_000.0 / mean_interval).clamp(cfg.min_rate_bpm, cfg.max_rate_bpm);

        let spread = percentile(&smoothed, 90.0) - percentile(&smoothed, 10.0);
        let depth = clamp01(spread * cfg.depth_gain);

        let regularity = 1.0 - clamp01(coefficient_of_variation(&intervals) * cfg.regularity_gain);

        let successive = mean_successive_difference(&intervals) / mean_interval;
        let coherence = 1.0 - clamp01(successive * cfg.coherence_gain);

        let stress_level = stress_index(rate, depth, regularity, coherence);

        self.metrics = BreathingMetrics {
            rate,
            depth,
            regularity,
            coherence,
            stress_level,
        };
        self.confidence = clamp01(peak_term * (0.5 + 0.5 * regularity));
        self.intervals = intervals;
        self.updates += 1;
        EstimateOutcome::Updated
    }

    fn peak_term(&self, peaks: usize) -> f64 {
        let saturation = self.config.confidence_saturation_peaks.max(1) as f64;
        (peaks as f64 / saturation).min(1.0)
    }
}

/// Composite stress index from independent, fixed penalty terms.
///
/// Fast breathing weighs more than slow; shallow and irregular breathing
/// each add up to 0.3; low coherence adds a flat 0.2. Clamped to [0, 1].
pub fn stress_index(rate: f64, depth: f64, regularity: f64, coherence: f64) -> f64 {
    let rate_penalty = if rate > 20.0 {
        0.3
    } else if rate > 16.0 {
        0.1
    } else if rate < 8.0 {
        0.1
    } else {
        0.0
    };

    let depth_penalty = if depth < 0.1 {
        0.3
    } else if depth < 0.2 {
        0.1
    } else {
        0.0
    };

    let regularity_penalty = if regularity < 0.3 {
        0.3
    } else if regularity < 0.6 {
        0.1
    } else {
        0.0
    };

    let coherence_penalty = if coherence < 0.3 { 0.2 } else { 0.0 };

    clamp01(rate_penalty + depth_penalty + regularity_penalty + coherence_penalty)
}

pub(crate) fn clamp01(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
