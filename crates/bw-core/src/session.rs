//! Per-tick pipeline: sample → estimator → gate → selector → consumers.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::constants::{CONFIDENCE_GATE, CUE_GATE};
use crate::estimator::{BreathingEstimator, BreathingMetrics, EstimateOutcome};
use crate::moments::{Moment, MomentLog};
use crate::phase::{BreathPhase, PhaseTracker};
use crate::sample::Sample;
use crate::selector::{FrequencyRecommendation, TherapeuticFrequencySelector, cycle_mismatch};
use crate::snapshot::Snapshot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Recommendations refresh only when confidence is strictly above this.
    pub confidence_gate: f64,
    /// Tone cues fire only when confidence is strictly above this.
    pub cue_gate: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confidence_gate: CONFIDENCE_GATE,
            cue_gate: CUE_GATE,
        }
    }
}

/// Instruction for the playback layer to start a tone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneCue {
    pub frequency: u32,
    pub duration: u64,
    pub intensity: f64,
}

/// Everything one tick produced.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub timestamp: u64,
    pub outcome: EstimateOutcome,
    pub phase: BreathPhase,
    pub metrics: BreathingMetrics,
    pub confidence: f64,
    pub recommendation: FrequencyRecommendation,
    pub recommendation_changed: bool,
    pub cue: Option<ToneCue>,
    pub moment: Option<Moment>,
}

/// Owns the estimator and everything downstream of it for one sampling loop.
pub struct ResonanceSession {
    config: SessionConfig,
    estimator: BreathingEstimator,
    selector: TherapeuticFrequencySelector,
    phase: PhaseTracker,
    moments: MomentLog,
    recommendation: FrequencyRecommendation,
    /// Table row of the last cue; entrainment shifts within a row never re-cue.
    last_cued_row: Option<u32>,
    ticks: u64,
    last_timestamp: Option<u64>,
}

impl Default for ResonanceSession {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ResonanceSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.session.clone(),
            estimator: BreathingEstimator::new(config.estimator.clone()),
            selector: TherapeuticFrequencySelector::new(config.selector.clone()),
            phase: PhaseTracker::new(),
            moments: MomentLog::new(config.moments.clone()),
            recommendation: FrequencyRecommendation::default(),
            last_cued_row: None,
            ticks: 0,
            last_timestamp: None,
        }
    }

    /// Replace the memory log, e.g. with moments loaded from storage.
    pub fn with_moment_log(mut self, moments: MomentLog) -> Self {
        self.moments = moments;
        self
    }

    /// Run one tick for `sample`.
    pub fn tick(&mut self, sample: Sample) -> TickReport {
        self.ticks += 1;
        let outcome = self.estimator.ingest(sample);

        let phase = if outcome == EstimateOutcome::Rejected {
            self.phase.phase()
        } else {
            self.last_timestamp = Some(sample.timestamp);
            self.phase.update(sample)
        };

        let metrics = self.estimator.current_metrics();
        let confidence = self.estimator.current_confidence();

        let mut recommendation_changed = false;
        if outcome == EstimateOutcome::Updated && confidence > self.config.confidence_gate {
            let cycles = self.estimator.recent_cycles();
            let mut next = self.selector.select_with_cycles(&metrics, confidence, cycles);
            if self.keeps_frequency(&next, cycles) {
                next.frequency = self.recommendation.frequency;
            }
            if next != self.recommendation {
                self.recommendation = next;
                recommendation_changed = true;
            }
        }

        let mut cue = None;
        let row = self.recommendation.table_frequency();
        if confidence > self.config.cue_gate && self.last_cued_row != Some(row) {
            self.last_cued_row = Some(row);
            cue = Some(ToneCue {
                frequency: self.recommendation.frequency,
                duration: self.recommendation.duration,
                intensity: self.recommendation.intensity,
            });
        }

        let moment = if outcome == EstimateOutcome::Updated {
            self.moments
                .observe(&metrics, self.recommendation.frequency, sample.timestamp)
        } else {
            None
        };

        TickReport {
            timestamp: sample.timestamp,
            outcome,
            phase,
            metrics,
            confidence,
            recommendation: self.recommendation.clone(),
            recommendation_changed,
            cue,
            moment,
        }
    }

    /// Same row, and the current frequency is still aligned with the breath.
    fn keeps_frequency(&self, next: &FrequencyRecommendation, cycles_ms: &[f64]) -> bool {
        let current = &self.recommendation;
        if current.name != next.name || current.frequency == next.frequency {
            return false;
        }
        let cfg = self.selector.config();
        current.frequency.abs_diff(next.table_frequency()) <= cfg.entrainment_max_shift_hz
            && cycle_mismatch(current.frequency, cycles_ms)
                .is_some_and(|m| m <= cfg.entrainment_tolerance)
    }

    pub fn metrics(&self) -> BreathingMetrics {
        self.estimator.current_metrics()
    }

    pub fn confidence(&self) -> f64 {
        self.estimator.current_confidence()
    }

    pub fn recommendation(&self) -> &FrequencyRecommendation {
        &self.recommendation
    }

    pub fn phase(&self) -> BreathPhase {
        self.phase.phase()
    }

    pub fn estimator(&self) -> &BreathingEstimator {
        &self.estimator
    }

    pub fn moments(&self) -> &MomentLog {
        &self.moments
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Point-in-time export of the consumer-facing state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.metrics(),
            self.confidence(),
            self.recommendation.clone(),
            self.moments.moments(),
        )
    }

    /// Timestamp of the newest accepted sample.
    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SampleSource, SimulatedBreathSource, SimulatedConfig};

    fn run(
        session: &mut ResonanceSession,
        source: &mut dyn SampleSource,
        ticks: usize,
    ) -> Vec<TickReport> {
        (0..ticks)
            .filter_map(|_| source.next_sample())
            .map(|s| session.tick(s))
            .collect()
    }

    #[test]
    fn test_gate_holds_default_recommendation_while_warming() {
        let mut session = ResonanceSession::default();
        let mut src = SimulatedBreathSource::new(SimulatedConfig::default(), 3);
        let reports = run(&mut session, &mut src, 40);
        assert!(reports.iter().all(|r| r.outcome == EstimateOutcome::Warming));
        assert_eq!(session.recommendation(), &FrequencyRecommendation::default());
        assert!(reports.iter().all(|r| r.cue.is_none()));
    }

    #[test]
    fn test_calm_breathing_updates_recommendation() {
        let mut session = ResonanceSession::default();
        let mut src = SimulatedBreathSource::new(SimulatedConfig::default(), 3);
        let reports = run(&mut session, &mut src, 300);

        assert!(reports.iter().any(|r| r.outcome == EstimateOutcome::Updated));
        assert!(reports.iter().any(|r| r.recommendation_changed));
        let m = session.metrics();
        assert!((m.rate - 15.0).abs() < 1.0, "rate = {}", m.rate);
        assert!(m.stress_level < 0.3, "stress = {}", m.stress_level);
        assert!(session.recommendation().frequency >= 500);
    }

    #[test]
    fn test_cue_fires_once_per_row() {
        let mut session = ResonanceSession::default();
        let mut src = SimulatedBreathSource::new(SimulatedConfig::default(), 11);
        let reports = run(&mut session, &mut src, 600);

        let cues: Vec<&ToneCue> = reports.iter().filter_map(|r| r.cue.as_ref()).collect();
        assert!(!cues.is_empty());
        for w in cues.windows(2) {
            assert_ne!(w[0].frequency, w[1].frequency);
        }
    }

    #[test]
    fn test_steady_breath_cues_track_table_rows() {
        for seed in [1, 7, 11, 42] {
            let mut session = ResonanceSession::default();
            let mut src = SimulatedBreathSource::new(SimulatedConfig::default(), seed);
            let reports = run(&mut session, &mut src, 3_000);

            let cues = reports.iter().filter(|r| r.cue.is_some()).count();
            let row_changes = reports
                .windows(2)
                .filter(|w| {
                    w[0].recommendation.table_frequency() != w[1].recommendation.table_frequency()
                })
                .count();
            assert!(cues >= 1, "seed {seed}: no cue");
            assert!(
                cues <= row_changes + 1,
                "seed {seed}: {cues} cues for {row_changes} row changes"
            );
        }
    }

    #[test]
    fn test_entrained_frequency_held_while_aligned() {
        let mut session = ResonanceSession::default();
        session.recommendation = FrequencyRecommendation {
            frequency: 430,
            ..FrequencyRecommendation::default()
        };
        let next = FrequencyRecommendation {
            frequency: 431,
            ..FrequencyRecommendation::default()
        };
        // 430 Hz over a 3.3 s breath is exactly 1419 cycles
        assert!(session.keeps_frequency(&next, &[3_300.0]));
        // 430 Hz over 3.35 s is 1440.5 cycles
        assert!(!session.keeps_frequency(&next, &[3_350.0]));

        let other_row = FrequencyRecommendation {
            frequency: 528,
            name: "DNA Repair".to_string(),
            ..FrequencyRecommendation::default()
        };
        assert!(!session.keeps_frequency(&other_row, &[3_300.0]));
    }

    #[test]
    fn test_rejected_sample_counts_tick_only() {
        let mut session = ResonanceSession::default();
        session.tick(Sample::new(0.5, 1_000));
        let report = session.tick(Sample::new(0.5, 10));
        assert_eq!(report.outcome, EstimateOutcome::Rejected);
        assert_eq!(session.ticks(), 2);
        assert_eq!(session.last_timestamp(), Some(1_000));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut session = ResonanceSession::default();
        let mut src = SimulatedBreathSource::new(SimulatedConfig::default(), 5);
        run(&mut session, &mut src, 300);
        let snap = session.snapshot();
        assert_eq!(snap.metrics, session.metrics());
        assert_eq!(&snap.recommendation, session.recommendation());
    }
}
