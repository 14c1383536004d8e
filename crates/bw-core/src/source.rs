//! Sample sources: anything that yields `Sample`s on a periodic tick.
//!
//! The estimator never knows which source it is fed from. Live capture lives
//! outside this crate; here are the deterministic fallback generator, a
//! replay source for recorded level traces, and the analyzer level mix.

use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{PULSE_MAX_BPM, PULSE_MIN_BPM};
use crate::sample::Sample;

/// A single continuous sequence of samples.
pub trait SampleSource {
    /// Next sample, or `None` when the source is exhausted.
    fn next_sample(&mut self) -> Option<Sample>;

    /// Short label for logs and the session record.
    fn describe(&self) -> String;
}

/// Synthetic breathing generator parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Breath period in milliseconds.
    pub period_ms: f64,
    pub baseline: f64,
    pub amplitude: f64,
    /// Uniform jitter added to every sample, ±jitter.
    pub jitter: f64,
    /// Tick cadence in milliseconds.
    pub tick_ms: u64,
    pub start_ms: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            period_ms: 4_000.0,
            baseline: 0.5,
            amplitude: 0.4,
            jitter: 0.02,
            tick_ms: 100,
            start_ms: 0,
        }
    }
}

/// Fallback generator: a sine breath plus seeded jitter on a fixed cadence.
/// Infinite; stop it by dropping it or by bounding the loop that drives it.
pub struct SimulatedBreathSource {
    config: SimulatedConfig,
    rng: SmallRng,
    next_ts: u64,
}

impl SimulatedBreathSource {
    pub fn new(config: SimulatedConfig, seed: u64) -> Self {
        let next_ts = config.start_ms;
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
            next_ts,
        }
    }

    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    /// Level at time `t` without jitter.
    pub fn level_at(&self, t: u64) -> f64 {
        let period = self.config.period_ms.max(1.0);
        let phase = std::f64::consts::TAU * t as f64 / period;
        self.config.baseline + self.config.amplitude * phase.sin()
    }
}

impl SampleSource for SimulatedBreathSource {
    fn next_sample(&mut self) -> Option<Sample> {
        let t = self.next_ts;
        let jitter = if self.config.jitter.is_finite() && self.config.jitter > 0.0 {
            self.rng.random_range(-self.config.jitter..=self.config.jitter)
        } else {
            0.0
        };
        self.next_ts = t + self.config.tick_ms.max(1);
        Some(Sample::new(self.level_at(t) + jitter, t))
    }

    fn describe(&self) -> String {
        format!(
            "simulated(period={}ms, tick={}ms)",
            self.config.period_ms, self.config.tick_ms
        )
    }
}

/// Error parsing a recorded trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for TraceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for TraceParseError {}

/// Replays a recorded trace in order.
pub struct ReplaySource {
    samples: std::vec::IntoIter<Sample>,
    label: String,
}

impl ReplaySource {
    pub fn new(samples: Vec<Sample>, label: &str) -> Self {
        Self {
            samples: samples.into_iter(),
            label: label.to_string(),
        }
    }

    /// Parse `timestamp_ms,level` lines. Blank lines and `#` comments are
    /// skipped, as is a header: the first content line, when it does not
    /// parse as numbers.
    pub fn parse(text: &str, label: &str) -> Result<Self, TraceParseError> {
        let mut samples = Vec::new();
        let mut first = true;
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let is_first = std::mem::replace(&mut first, false);
            let mut parts = line.split(',').map(str::trim);
            let (ts, level) = match (parts.next(), parts.next(), parts.next()) {
                (Some(ts), Some(level), None) => (ts, level),
                _ => {
                    return Err(TraceParseError {
                        line: idx + 1,
                        message: format!("expected `timestamp,level`, got `{line}`"),
                    });
                }
            };
            match (ts.parse::<u64>(), level.parse::<f64>()) {
                (Ok(ts), Ok(level)) => samples.push(Sample::new(level, ts)),
                _ if is_first => continue,
                _ => {
                    return Err(TraceParseError {
                        line: idx + 1,
                        message: format!("invalid numbers in `{line}`"),
                    });
                }
            }
        }
        Ok(Self::new(samples, label))
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for ReplaySource {
    fn next_sample(&mut self) -> Option<Sample> {
        self.samples.next()
    }

    fn describe(&self) -> String {
        format!("replay({})", self.label)
    }
}

/// Breath level from one analyzer frame of byte magnitudes (0-255).
///
/// 70% overall RMS (normalized by 128, capped at 1) plus 30% mean energy of
/// the bins below 50 Hz. `sample_rate` is the capture rate; bins span
/// 0..sample_rate/2.
pub fn spectrum_level(bins: &[u8], sample_rate: f64) -> f64 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = bins.iter().map(|&b| (b as f64).powi(2)).sum();
    let rms = (sum_sq / bins.len() as f64).sqrt();
    let normalized = (rms / 128.0).min(1.0);

    let low_bins = bin_edge(50.0, bins.len(), sample_rate);
    let low_mean = mean_bin(&bins[..low_bins]);

    ((low_mean / 255.0) * 0.3 + normalized * 0.7).clamp(0.0, 1.0)
}

/// Pulse in bpm from one analyzer frame at `t` ms.
///
/// A slow 72 ± 6 bpm swing, raised by up to 15 bpm with the mean energy of
/// the 50-200 Hz bins, clamped to the pulse band.
pub fn pulse_estimate(bins: &[u8], sample_rate: f64, t: u64) -> f64 {
    let base = 72.0 + (t as f64 / 1200.0).sin() * 6.0;
    let mid_mean = if bins.is_empty() {
        0.0
    } else {
        let start = bin_edge(50.0, bins.len(), sample_rate);
        let end = bin_edge(200.0, bins.len(), sample_rate);
        if end > start { mean_bin(&bins[start..end]) } else { 0.0 }
    };
    (base + mid_mean / 255.0 * 15.0).clamp(PULSE_MIN_BPM, PULSE_MAX_BPM)
}

/// Exclusive bin index for `hz`, at least 1 and at most `len`.
fn bin_edge(hz: f64, len: usize, sample_rate: f64) -> usize {
    if sample_rate > 0.0 {
        ((hz * len as f64 / sample_rate).floor() as usize).clamp(1, len)
    } else {
        1
    }
}

fn mean_bin(bins: &[u8]) -> f64 {
    bins.iter().map(|&b| b as f64).sum::<f64>() / bins.len().max(1) as f64
}

/// Seeded pulse stand-in for runs without analyzer frames.
pub struct SimulatedPulse {
    rng: SmallRng,
}

impl SimulatedPulse {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// 72 ± 8 bpm slow swing plus up to 4 bpm of noise.
    pub fn at(&mut self, t: u64) -> f64 {
        let swing = (t as f64 / 1000.0).sin() * 8.0;
        let noise = self.rng.random_range(0.0..4.0);
        (72.0 + swing + noise).clamp(PULSE_MIN_BPM, PULSE_MAX_BPM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_is_seeded() {
        let mut a = SimulatedBreathSource::new(SimulatedConfig::default(), 7);
        let mut b = SimulatedBreathSource::new(SimulatedConfig::default(), 7);
        for _ in 0..50 {
            assert_eq!(a.next_sample(), b.next_sample());
        }
    }

    #[test]
    fn test_simulated_cadence_and_bounds() {
        let mut src = SimulatedBreathSource::new(SimulatedConfig::default(), 1);
        let mut prev = None;
        for _ in 0..200 {
            let s = src.next_sample().unwrap();
            assert!((0.0..=1.0).contains(&s.level));
            if let Some(p) = prev {
                assert_eq!(s.timestamp - p, 100);
            }
            prev = Some(s.timestamp);
        }
    }

    #[test]
    fn test_replay_parse() {
        let text = "timestamp,level\n# comment\n0,0.1\n\n100, 0.5\n200,0.9\n";
        let mut src = ReplaySource::parse(text, "trace").unwrap();
        assert_eq!(src.remaining(), 3);
        assert_eq!(src.next_sample(), Some(Sample::new(0.1, 0)));
        assert_eq!(src.describe(), "replay(trace)");
    }

    #[test]
    fn test_replay_parse_errors() {
        let err = ReplaySource::parse("0,0.1\n100\n", "t").err().unwrap();
        assert_eq!(err.line, 2);
        let err = ReplaySource::parse("0,0.1\nabc,0.2\n", "t").err().unwrap();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_replay_header_after_comment() {
        let text = "# exported trace\n\ntimestamp_ms,level\n0,0.2\n100,0.4\n";
        let src = ReplaySource::parse(text, "t").unwrap();
        assert_eq!(src.remaining(), 2);

        let err = ReplaySource::parse("# c\nts,level\nbad,row\n", "t").err().unwrap();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_simulated_ignores_non_finite_jitter() {
        let config = SimulatedConfig {
            jitter: f64::INFINITY,
            ..SimulatedConfig::default()
        };
        let mut src = SimulatedBreathSource::new(config, 1);
        let s = src.next_sample().unwrap();
        assert_eq!(s.level, 0.5);
    }

    #[test]
    fn test_pulse_estimate() {
        // 4096 bins at 8 kHz: bins 25..102 span 50-200 Hz
        let silent = [0u8; 4_096];
        assert!((pulse_estimate(&silent, 8_000.0, 0) - 72.0).abs() < 1e-12);

        let mut loud = [0u8; 4_096];
        loud[25..102].fill(255);
        assert!((pulse_estimate(&loud, 8_000.0, 0) - 87.0).abs() < 1e-12);

        for t in (0..60_000).step_by(700) {
            let p = pulse_estimate(&[255; 512], 44_100.0, t);
            assert!((PULSE_MIN_BPM..=PULSE_MAX_BPM).contains(&p));
        }
        assert!((pulse_estimate(&[], 44_100.0, 0) - 72.0).abs() < 1e-12);
    }

    #[test]
    fn test_simulated_pulse_is_seeded_and_bounded() {
        let mut a = SimulatedPulse::new(9);
        let mut b = SimulatedPulse::new(9);
        for t in (0..30_000).step_by(100) {
            let p = a.at(t);
            assert_eq!(p, b.at(t));
            assert!((64.0..84.0).contains(&p), "pulse {p} at {t}");
        }
    }

    #[test]
    fn test_spectrum_level() {
        assert_eq!(spectrum_level(&[], 44_100.0), 0.0);
        assert_eq!(spectrum_level(&[0; 1024], 44_100.0), 0.0);
        let loud = spectrum_level(&[255; 1024], 44_100.0);
        assert!((loud - 1.0).abs() < 1e-12);
        let mid = spectrum_level(&[64; 1024], 44_100.0);
        assert!((mid - (0.5 * 0.7 + 64.0 / 255.0 * 0.3)).abs() < 1e-12);
    }
}
