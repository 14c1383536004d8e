//! Therapeutic tone selection.
//!
//! Metrics are mapped onto a fixed, ordered table of tones. Higher stress
//! lands on lower, grounding frequencies; calm lands on higher ones. A short
//! list of override rules runs first, then the stress-band lookup, then an
//! optional nudge toward a whole number of tone cycles per breath.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::estimator::{BreathingMetrics, clamp01};

/// One row of the tone table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TherapeuticFrequency {
    pub frequency: u32,
    pub name: &'static str,
    pub purpose: &'static str,
    pub stress_low: f64,
    pub stress_high: f64,
}

impl TherapeuticFrequency {
    pub fn contains(&self, stress: f64) -> bool {
        stress >= self.stress_low && stress <= self.stress_high
    }

    pub fn center(&self) -> f64 {
        (self.stress_low + self.stress_high) / 2.0
    }
}

/// Ordered from acute (high stress, low Hz) to expansive (calm, high Hz).
pub const THERAPEUTIC_TABLE: [TherapeuticFrequency; 9] = [
    TherapeuticFrequency {
        frequency: 174,
        name: "Pain Relief",
        purpose: "Physical healing and pain relief",
        stress_low: 0.8,
        stress_high: 1.0,
    },
    TherapeuticFrequency {
        frequency: 285,
        name: "Tissue Healing",
        purpose: "Cellular regeneration and healing",
        stress_low: 0.7,
        stress_high: 0.9,
    },
    TherapeuticFrequency {
        frequency: 396,
        name: "Fear Release",
        purpose: "Releasing fear and guilt",
        stress_low: 0.6,
        stress_high: 0.8,
    },
    TherapeuticFrequency {
        frequency: 417,
        name: "Change Facilitation",
        purpose: "Facilitating positive change",
        stress_low: 0.5,
        stress_high: 0.7,
    },
    TherapeuticFrequency {
        frequency: 432,
        name: "Nature Harmony",
        purpose: "Natural healing and balance",
        stress_low: 0.4,
        stress_high: 0.6,
    },
    TherapeuticFrequency {
        frequency: 528,
        name: "DNA Repair",
        purpose: "Transformation and nervous system calming",
        stress_low: 0.3,
        stress_high: 0.5,
    },
    TherapeuticFrequency {
        frequency: 639,
        name: "Heart Connection",
        purpose: "Relationships and emotional healing",
        stress_low: 0.2,
        stress_high: 0.4,
    },
    TherapeuticFrequency {
        frequency: 741,
        name: "Expression",
        purpose: "Creative expression and problem solving",
        stress_low: 0.1,
        stress_high: 0.3,
    },
    TherapeuticFrequency {
        frequency: 852,
        name: "Intuition",
        purpose: "Spiritual awakening and intuition",
        stress_low: 0.0,
        stress_high: 0.2,
    },
];

/// The fixed tone table.
pub fn table() -> &'static [TherapeuticFrequency] {
    &THERAPEUTIC_TABLE
}

/// Look up a table row by its frequency.
pub fn entry_for(frequency: u32) -> Option<&'static TherapeuticFrequency> {
    THERAPEUTIC_TABLE.iter().find(|e| e.frequency == frequency)
}

fn default_entry() -> &'static TherapeuticFrequency {
    // 432 Hz is always in the table
    entry_for(DEFAULT_FREQUENCY_HZ).unwrap_or(&THERAPEUTIC_TABLE[4])
}

/// A condition on metrics that forces a specific table row.
#[derive(Clone, Copy, Debug)]
pub struct OverrideRule {
    pub name: &'static str,
    pub frequency: u32,
    pub applies: fn(&BreathingMetrics) -> bool,
}

/// Evaluated top-down; the first match wins.
pub const OVERRIDE_RULES: [OverrideRule; 3] = [
    OverrideRule {
        name: "acute hyperventilation",
        frequency: 174,
        applies: |m| m.rate >= 24.0 && m.depth < 0.2,
    },
    OverrideRule {
        name: "erratic breathing",
        frequency: 285,
        applies: |m| m.regularity < 0.2 && m.coherence < 0.3,
    },
    OverrideRule {
        name: "deep meditative breathing",
        frequency: 852,
        applies: |m| {
            m.rate <= 8.0 && m.depth >= 0.6 && m.regularity >= 0.8 && m.stress_level < 0.2
        },
    },
];

/// Why a given row was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionReason {
    Override,
    StressBand,
    Fallback,
}

/// Tone the playback layer should use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyRecommendation {
    /// Integer Hz; the table frequency or its entrained neighbor.
    pub frequency: u32,
    pub name: String,
    pub purpose: String,
    /// Exposure in milliseconds.
    pub duration: u64,
    /// Playback gain, within the selector's intensity band.
    pub intensity: f64,
}

impl FrequencyRecommendation {
    /// Frequency of the table row this recommendation came from, before any
    /// entrainment shift.
    pub fn table_frequency(&self) -> u32 {
        THERAPEUTIC_TABLE
            .iter()
            .find(|e| e.name == self.name)
            .map_or(self.frequency, |e| e.frequency)
    }
}

impl Default for FrequencyRecommendation {
    fn default() -> Self {
        let entry = default_entry();
        Self {
            frequency: entry.frequency,
            name: entry.name.to_string(),
            purpose: entry.purpose.to_string(),
            duration: BASE_DURATION_MS as u64,
            intensity: 0.3,
        }
    }
}

/// Selector tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub enable_overrides: bool,
    pub enable_entrainment: bool,
    /// Entrainment only runs when confidence is strictly above this.
    pub entrainment_min_confidence: f64,
    pub entrainment_max_shift_hz: u32,
    pub entrainment_tolerance: f64,
    pub base_duration_ms: f64,
    pub stress_duration_ms: f64,
    pub duration_bonus_ms: f64,
    pub base_intensity: f64,
    pub min_intensity: f64,
    pub max_intensity: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            enable_overrides: true,
            enable_entrainment: true,
            entrainment_min_confidence: CUE_GATE,
            entrainment_max_shift_hz: ENTRAINMENT_MAX_SHIFT_HZ,
            entrainment_tolerance: ENTRAINMENT_ALIGNMENT_TOLERANCE,
            base_duration_ms: BASE_DURATION_MS,
            stress_duration_ms: STRESS_DURATION_MS,
            duration_bonus_ms: DURATION_BONUS_MS,
            base_intensity: BASE_INTENSITY,
            min_intensity: MIN_INTENSITY,
            max_intensity: MAX_INTENSITY,
        }
    }
}

/// Stateless mapping from metrics to a recommendation.
#[derive(Clone, Debug, Default)]
pub struct TherapeuticFrequencySelector {
    config: SelectorConfig,
}

impl TherapeuticFrequencySelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Select without entrainment input.
    pub fn select(&self, metrics: &BreathingMetrics, confidence: f64) -> FrequencyRecommendation {
        self.select_with_cycles(metrics, confidence, &[])
    }

    /// Select, nudging toward the breath rhythm when `cycles_ms` is non-empty
    /// and confidence clears the entrainment gate.
    pub fn select_with_cycles(
        &self,
        metrics: &BreathingMetrics,
        confidence: f64,
        cycles_ms: &[f64],
    ) -> FrequencyRecommendation {
        let (entry, _) = self.choose_entry(metrics);

        let mut frequency = entry.frequency;
        if self.config.enable_entrainment && confidence > self.config.entrainment_min_confidence {
            frequency = entrain(
                entry.frequency,
                cycles_ms,
                self.config.entrainment_max_shift_hz,
                self.config.entrainment_tolerance,
            );
        }

        FrequencyRecommendation {
            frequency,
            name: entry.name.to_string(),
            purpose: entry.purpose.to_string(),
            duration: self.duration_ms(metrics),
            intensity: self.intensity(metrics),
        }
    }

    /// Table row for these metrics and the rule that picked it.
    pub fn choose_entry(
        &self,
        metrics: &BreathingMetrics,
    ) -> (&'static TherapeuticFrequency, SelectionReason) {
        if self.config.enable_overrides
            && let Some(entry) = OVERRIDE_RULES
                .iter()
                .find(|r| (r.applies)(metrics))
                .and_then(|r| entry_for(r.frequency))
        {
            return (entry, SelectionReason::Override);
        }

        match band_lookup(metrics.stress_level) {
            Some(entry) => (entry, SelectionReason::StressBand),
            None => (default_entry(), SelectionReason::Fallback),
        }
    }

    fn duration_ms(&self, m: &BreathingMetrics) -> u64 {
        let cfg = &self.config;
        let mut duration = cfg.base_duration_ms + clamp01(m.stress_level) * cfg.stress_duration_ms;
        if m.rate > 20.0 {
            duration += cfg.duration_bonus_ms;
        }
        if m.depth < 0.2 {
            duration += cfg.duration_bonus_ms;
        }
        if m.regularity < 0.5 {
            duration += cfg.duration_bonus_ms;
        }
        duration.max(0.0).round() as u64
    }

    fn intensity(&self, m: &BreathingMetrics) -> f64 {
        let cfg = &self.config;
        let raw = cfg.base_intensity + (1.0 - clamp01(m.coherence)) * 0.15 + clamp01(m.depth) * 0.1
            - clamp01(m.stress_level) * 0.1;
        raw.clamp(cfg.min_intensity, cfg.max_intensity)
    }
}

/// Row whose stress range contains `stress`, nearest band center first.
/// Exact ties keep the earlier (lower-frequency) row.
pub fn band_lookup(stress: f64) -> Option<&'static TherapeuticFrequency> {
    let mut best: Option<(&'static TherapeuticFrequency, f64)> = None;
    for entry in THERAPEUTIC_TABLE.iter().filter(|e| e.contains(stress)) {
        let distance = (stress - entry.center()).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((entry, distance)),
        }
    }
    best.map(|(e, _)| e)
}

/// Nudge `frequency` to the integer Hz within `max_shift_hz` that fits the
/// closest-to-whole number of tone cycles per breath. Returns `frequency`
/// unchanged when no candidate aligns within `tolerance` cycles.
pub fn entrain(frequency: u32, cycles_ms: &[f64], max_shift_hz: u32, tolerance: f64) -> u32 {
    let Some(cycle_s) = mean_cycle_s(cycles_ms) else {
        return frequency;
    };

    let lo = frequency.saturating_sub(max_shift_hz).max(1);
    let hi = frequency.saturating_add(max_shift_hz);

    let mut best: Option<(u32, f64)> = None;
    for candidate in lo..=hi {
        let mismatch = mismatch_at(candidate, cycle_s);
        let better = match best {
            None => true,
            Some((b, bm)) => {
                mismatch < bm - EPSILON
                    || ((mismatch - bm).abs() <= EPSILON
                        && candidate.abs_diff(frequency) < b.abs_diff(frequency))
            }
        };
        if better {
            best = Some((candidate, mismatch));
        }
    }

    match best {
        Some((candidate, mismatch)) if mismatch <= tolerance => candidate,
        _ => frequency,
    }
}

/// Distance in tone cycles from `frequency` to a whole number of cycles per
/// mean breath, or `None` without usable cycles.
pub fn cycle_mismatch(frequency: u32, cycles_ms: &[f64]) -> Option<f64> {
    mean_cycle_s(cycles_ms).map(|cycle_s| mismatch_at(frequency, cycle_s))
}

fn mean_cycle_s(cycles_ms: &[f64]) -> Option<f64> {
    let valid: Vec<f64> = cycles_ms
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect();
    if valid.is_empty() {
        return None;
    }
    Some(valid.iter().sum::<f64>() / valid.len() as f64 / 1000.0)
}

fn mismatch_at(frequency: u32, cycle_s: f64) -> f64 {
    // tone cycles per breath; breath frequency is 1 / cycle_s
    let per_breath = frequency as f64 * cycle_s;
    (per_breath - per_breath.round()).abs()
}
