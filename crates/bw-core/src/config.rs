use std::fmt;

use serde::{Deserialize, Serialize};

use crate::estimator::EstimatorConfig;
use crate::moments::MomentConfig;
use crate::selector::SelectorConfig;
use crate::session::SessionConfig;
use crate::source::SimulatedConfig;

/// Full tunable surface. Each table is optional in TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub estimator: EstimatorConfig,
    pub selector: SelectorConfig,
    pub session: SessionConfig,
    pub moments: MomentConfig,
    pub simulated: SimulatedConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn unit(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(invalid(field, format!("{v} is outside [0, 1]")))
    }
}

fn finite(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("{v} is not finite")))
    }
}

impl EngineConfig {
    /// Reject settings the estimator or selector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.estimator;
        if e.window_ms == 0 {
            return Err(invalid("estimator.window_ms", "must be positive"));
        }
        if e.max_samples == 0 {
            return Err(invalid("estimator.max_samples", "must be positive"));
        }
        if e.smoothing_radius > 64 {
            return Err(invalid("estimator.smoothing_radius", "must be at most 64"));
        }
        if e.peak_neighbors == 0 {
            return Err(invalid("estimator.peak_neighbors", "must be positive"));
        }
        if !e.peak_threshold_k.is_finite() {
            return Err(invalid("estimator.peak_threshold_k", "must be finite"));
        }
        if e.min_interval_ms > e.max_interval_ms {
            return Err(invalid(
                "estimator.min_interval_ms",
                format!("{} exceeds max_interval_ms {}", e.min_interval_ms, e.max_interval_ms),
            ));
        }
        if !(e.min_rate_bpm > 0.0 && e.min_rate_bpm <= e.max_rate_bpm) {
            return Err(invalid(
                "estimator.min_rate_bpm",
                format!("rate band [{}, {}] is empty", e.min_rate_bpm, e.max_rate_bpm),
            ));
        }

        let s = &self.selector;
        unit("selector.entrainment_min_confidence", s.entrainment_min_confidence)?;
        if !(s.min_intensity <= s.max_intensity) {
            return Err(invalid(
                "selector.min_intensity",
                format!("{} exceeds max_intensity {}", s.min_intensity, s.max_intensity),
            ));
        }
        unit("selector.min_intensity", s.min_intensity)?;
        unit("selector.max_intensity", s.max_intensity)?;

        unit("session.confidence_gate", self.session.confidence_gate)?;
        unit("session.cue_gate", self.session.cue_gate)?;
        unit("moments.coherence_threshold", self.moments.coherence_threshold)?;

        let sim = &self.simulated;
        if sim.tick_ms == 0 {
            return Err(invalid("simulated.tick_ms", "must be positive"));
        }
        if !(sim.period_ms.is_finite() && sim.period_ms > 0.0) {
            return Err(invalid("simulated.period_ms", "must be finite and positive"));
        }
        finite("simulated.baseline", sim.baseline)?;
        finite("simulated.amplitude", sim.amplitude)?;
        finite("simulated.jitter", sim.jitter)?;
        if sim.jitter < 0.0 {
            return Err(invalid("simulated.jitter", "must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_inverted_interval_band() {
        let mut cfg = EngineConfig::default();
        cfg.estimator.min_interval_ms = 12_000;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("estimator.min_interval_ms"));
    }

    #[test]
    fn test_rejects_gate_out_of_range() {
        let mut cfg = EngineConfig::default();
        cfg.session.confidence_gate = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_rate_band() {
        let mut cfg = EngineConfig::default();
        cfg.estimator.min_rate_bpm = 40.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_jitter() {
        let mut cfg = EngineConfig::default();
        cfg.simulated.jitter = f64::INFINITY;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("simulated.jitter"));

        cfg.simulated.jitter = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_simulated_period() {
        let mut cfg = EngineConfig::default();
        cfg.simulated.period_ms = 0.0;
        assert!(cfg.validate().is_err());
        cfg.simulated.period_ms = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.simulated.amplitude = f64::NEG_INFINITY;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("simulated.amplitude"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"estimator": {"window_ms": 12000}}"#).unwrap();
        assert_eq!(cfg.estimator.window_ms, 12_000);
        assert_eq!(cfg.estimator.min_samples, 50);
        assert_eq!(cfg.selector, SelectorConfig::default());
    }
}
