use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Samples summed when computing the short-term trend.
const TREND_SAMPLES: usize = 5;

/// |trend| above this picks a direction; below it the breath is held.
const TREND_THRESHOLD: f64 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    Inhale,
    Exhale,
    Hold,
}

impl BreathPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            BreathPhase::Inhale => "inhale",
            BreathPhase::Exhale => "exhale",
            BreathPhase::Hold => "hold",
        }
    }
}

/// Tracks inhale/exhale/hold from the direction of the last few levels.
#[derive(Clone, Debug)]
pub struct PhaseTracker {
    recent: [f64; TREND_SAMPLES],
    filled: usize,
    phase: BreathPhase,
    changed_at: u64,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            recent: [0.0; TREND_SAMPLES],
            filled: 0,
            phase: BreathPhase::Inhale,
            changed_at: 0,
        }
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample and return the current phase.
    pub fn update(&mut self, sample: Sample) -> BreathPhase {
        if self.filled < TREND_SAMPLES {
            self.recent[self.filled] = sample.level;
            self.filled += 1;
        } else {
            self.recent.rotate_left(1);
            self.recent[TREND_SAMPLES - 1] = sample.level;
        }

        if self.filled < 2 {
            return self.phase;
        }

        let window = &self.recent[..self.filled];
        let trend: f64 = window.windows(2).map(|w| w[1] - w[0]).sum();
        let next = if trend.abs() > TREND_THRESHOLD {
            if trend > 0.0 {
                BreathPhase::Inhale
            } else {
                BreathPhase::Exhale
            }
        } else {
            BreathPhase::Hold
        };

        if next != self.phase {
            self.phase = next;
            self.changed_at = sample.timestamp;
        }
        self.phase
    }

    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    /// Timestamp of the most recent phase change.
    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }

    /// Milliseconds spent in the current phase as of `now`.
    pub fn time_in_phase(&self, now: u64) -> u64 {
        now.saturating_sub(self.changed_at)
    }
}
