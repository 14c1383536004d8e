//! Memory log of high-coherence moments.
//!
//! A moment is captured when coherence rises above the threshold, at most
//! once per spacing interval. Only the most recent `capacity` moments are
//! kept.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{MOMENT_CAPACITY, MOMENT_COHERENCE, MOMENT_SPACING_MS};
use crate::estimator::BreathingMetrics;
use crate::labels::coherence_tier;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    pub timestamp: u64,
    pub coherence: f64,
    pub tier: u8,
    pub metrics: BreathingMetrics,
    pub frequency: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentConfig {
    pub coherence_threshold: f64,
    pub spacing_ms: u64,
    pub capacity: usize,
}

impl Default for MomentConfig {
    fn default() -> Self {
        Self {
            coherence_threshold: MOMENT_COHERENCE,
            spacing_ms: MOMENT_SPACING_MS,
            capacity: MOMENT_CAPACITY,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MomentLog {
    config: MomentConfig,
    moments: VecDeque<Moment>,
}

impl MomentLog {
    pub fn new(config: MomentConfig) -> Self {
        Self {
            config,
            moments: VecDeque::new(),
        }
    }

    /// Seed the log with previously persisted moments, oldest first.
    pub fn with_moments(config: MomentConfig, moments: Vec<Moment>) -> Self {
        let mut log = Self::new(config);
        for m in moments {
            log.push(m);
        }
        log
    }

    /// Capture a moment if the metrics qualify. Returns the new moment.
    pub fn observe(
        &mut self,
        metrics: &BreathingMetrics,
        frequency: u32,
        timestamp: u64,
    ) -> Option<Moment> {
        if metrics.coherence <= self.config.coherence_threshold {
            return None;
        }
        if let Some(last) = self.moments.back()
            && timestamp.saturating_sub(last.timestamp) < self.config.spacing_ms
        {
            return None;
        }

        let moment = Moment {
            timestamp,
            coherence: metrics.coherence,
            tier: coherence_tier(metrics.coherence),
            metrics: *metrics,
            frequency,
        };
        self.push(moment.clone());
        Some(moment)
    }

    fn push(&mut self, moment: Moment) {
        self.moments.push_back(moment);
        while self.moments.len() > self.config.capacity.max(1) {
            self.moments.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    /// Oldest first.
    pub fn moments(&self) -> Vec<Moment> {
        self.moments.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.moments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coherent(c: f64) -> BreathingMetrics {
        BreathingMetrics {
            coherence: c,
            ..BreathingMetrics::default()
        }
    }

    #[test]
    fn test_low_coherence_ignored() {
        let mut log = MomentLog::default();
        assert!(log.observe(&coherent(0.6), 432, 0).is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn test_spacing_enforced() {
        let mut log = MomentLog::default();
        assert!(log.observe(&coherent(0.9), 432, 0).is_some());
        assert!(log.observe(&coherent(0.9), 432, 9_999).is_none());
        let m = log.observe(&coherent(0.95), 528, 10_000);
        assert_eq!(m.map(|m| m.tier), Some(3));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_capacity_keeps_latest() {
        let mut log = MomentLog::default();
        for i in 0..30u64 {
            log.observe(&coherent(0.8), 432, i * 10_000);
        }
        assert_eq!(log.len(), 20);
        assert_eq!(log.moments()[0].timestamp, 100_000);
    }

    #[test]
    fn test_with_moments_respects_capacity() {
        let config = MomentConfig {
            capacity: 2,
            ..MomentConfig::default()
        };
        let seed: Vec<Moment> = (0..5u64)
            .map(|i| Moment {
                timestamp: i,
                coherence: 0.7,
                tier: 2,
                metrics: coherent(0.7),
                frequency: 432,
            })
            .collect();
        let log = MomentLog::with_moments(config, seed);
        assert_eq!(log.len(), 2);
        assert_eq!(log.moments()[0].timestamp, 3);
    }
}
