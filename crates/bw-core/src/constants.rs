/// Retention window W: samples older than `newest - W` are evicted.
pub const WINDOW_MS: u64 = 15_000;

/// Hard cap on retained samples, independent of sampling cadence.
pub const MAX_SAMPLES: usize = 4_096;

/// Samples required before the estimator runs at all.
pub const MIN_SAMPLES: usize = 50;

/// Symmetric moving-average radius (samples on each side).
pub const SMOOTHING_RADIUS: usize = 5;

/// Peak threshold = mean + k * stddev of the smoothed series.
pub const PEAK_THRESHOLD_K: f64 = 0.5;

/// A peak must strictly exceed this many neighbors on each side.
pub const PEAK_NEIGHBORS: usize = 2;

/// Candidate peaks closer than this to the last accepted peak are one breath.
pub const MIN_PEAK_DISTANCE_MS: u64 = 1_500;

/// Inter-peak intervals outside [MIN, MAX] are outliers.
pub const MIN_INTERVAL_MS: u64 = 2_000;
pub const MAX_INTERVAL_MS: u64 = 10_000;

/// Valid intervals needed before rate is updated.
pub const MIN_VALID_INTERVALS: usize = 2;

/// Physiologically plausible breathing band (breaths per minute).
pub const MIN_RATE_BPM: f64 = 6.0;
pub const MAX_RATE_BPM: f64 = 30.0;

pub const DEPTH_GAIN: f64 = 1.25;
pub const REGULARITY_GAIN: f64 = 1.0;
pub const COHERENCE_GAIN: f64 = 2.0;

/// Accepted peaks at which the peak-count term of confidence saturates.
pub const CONFIDENCE_SATURATION_PEAKS: usize = 5;

/// Scale applied to the peak term when too few intervals survive.
/// Keeps confidence under the recommendation gate.
pub const LOW_CONFIDENCE_SCALE: f64 = 0.25;

/// Recommendations only refresh when confidence is strictly above this.
pub const CONFIDENCE_GATE: f64 = 0.3;

/// Tone cues (and entrainment) require confidence strictly above this.
pub const CUE_GATE: f64 = 0.5;

/// Default tone when nothing else applies.
pub const DEFAULT_FREQUENCY_HZ: u32 = 432;

/// Entrainment search radius around the table frequency.
pub const ENTRAINMENT_MAX_SHIFT_HZ: u32 = 3;

/// Largest accepted distance from a whole number of tone cycles per breath.
pub const ENTRAINMENT_ALIGNMENT_TOLERANCE: f64 = 0.05;

pub const BASE_DURATION_MS: f64 = 3_000.0;
pub const STRESS_DURATION_MS: f64 = 4_000.0;
pub const DURATION_BONUS_MS: f64 = 1_000.0;

pub const BASE_INTENSITY: f64 = 0.2;
pub const MIN_INTENSITY: f64 = 0.15;
pub const MAX_INTENSITY: f64 = 0.5;

/// Coherence above which a moment is written to the memory log.
pub const MOMENT_COHERENCE: f64 = 0.6;

/// Minimum spacing between captured moments.
pub const MOMENT_SPACING_MS: u64 = 10_000;

/// Memory log capacity (most recent moments win).
pub const MOMENT_CAPACITY: usize = 20;

/// Pulse estimates are clamped to this band, in bpm.
pub const PULSE_MIN_BPM: f64 = 45.0;
pub const PULSE_MAX_BPM: f64 = 120.0;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;
