//! Breathing estimator and therapeutic tone selector.
//!
//! Turns a stream of scalar audio-level samples into breathing metrics
//! (rate, depth, regularity, coherence, stress) with a confidence score, and
//! maps those metrics onto a fixed table of therapeutic tones.
//!
//! Zero I/O: audio capture and tone playback live with the caller.

pub mod config;
pub mod constants;
pub mod estimator;
pub mod labels;
pub mod moments;
pub mod peaks;
pub mod phase;
pub mod sample;
pub mod selector;
pub mod session;
pub mod signal;
pub mod snapshot;
pub mod source;
pub mod time;

pub use config::{ConfigError, EngineConfig};
pub use constants::{CONFIDENCE_GATE, CUE_GATE, DEFAULT_FREQUENCY_HZ, WINDOW_MS};
pub use estimator::{
    BreathingEstimator, BreathingMetrics, EstimateOutcome, EstimatorConfig, stress_index,
};
pub use labels::{coherence_tier, frequency_family, rate_status, stress_label};
pub use moments::{Moment, MomentConfig, MomentLog};
pub use phase::{BreathPhase, PhaseTracker};
pub use sample::{Sample, SampleHistory};
pub use selector::{
    FrequencyRecommendation, OVERRIDE_RULES, SelectionReason, SelectorConfig, THERAPEUTIC_TABLE,
    TherapeuticFrequency, TherapeuticFrequencySelector, band_lookup, cycle_mismatch, entrain,
    entry_for, table,
};
pub use session::{ResonanceSession, SessionConfig, TickReport, ToneCue};
pub use snapshot::{CURRENT_VERSION, Snapshot, export_snapshot, import_snapshot};
pub use source::{
    ReplaySource, SampleSource, SimulatedBreathSource, SimulatedConfig, SimulatedPulse,
    TraceParseError, pulse_estimate, spectrum_level,
};
pub use time::{millis_to_iso8601, now_iso8601, now_unix_millis};
