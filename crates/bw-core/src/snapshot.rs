//! JSON wire format for exported session state.
//!
//! camelCase field names, integer Hz and millisecond durations, ISO-8601
//! export timestamp.

use serde::{Deserialize, Serialize};

use crate::estimator::BreathingMetrics;
use crate::moments::Moment;
use crate::selector::FrequencyRecommendation;
use crate::time::now_iso8601;

pub const CURRENT_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub timestamp: String,
    pub metrics: BreathingMetrics,
    pub confidence: f64,
    pub recommendation: FrequencyRecommendation,
    #[serde(default)]
    pub moments: Vec<Moment>,
}

impl Snapshot {
    pub fn new(
        metrics: BreathingMetrics,
        confidence: f64,
        recommendation: FrequencyRecommendation,
        moments: Vec<Moment>,
    ) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            timestamp: now_iso8601(),
            metrics,
            confidence,
            recommendation,
            moments,
        }
    }
}

pub fn export_snapshot(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(snapshot)
}

pub fn import_snapshot(json: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let snap = Snapshot::new(
            BreathingMetrics::default(),
            0.4,
            FrequencyRecommendation::default(),
            Vec::new(),
        );
        let json = export_snapshot(&snap).unwrap();
        assert!(json.contains("\"stressLevel\""));
        assert!(json.contains("\"frequency\": 432"));
        assert!(json.contains("\"version\": \"1.0\""));
        assert_eq!(import_snapshot(&json).unwrap(), snap);
    }

    #[test]
    fn test_import_without_moments() {
        let json = r#"{
            "version": "1.0",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "metrics": {"rate": 14.0, "depth": 0.5, "regularity": 0.9, "coherence": 0.8, "stressLevel": 0.1},
            "confidence": 0.7,
            "recommendation": {"frequency": 852, "name": "Intuition", "purpose": "p", "duration": 3400, "intensity": 0.3}
        }"#;
        let snap = import_snapshot(json).unwrap();
        assert!(snap.moments.is_empty());
        assert_eq!(snap.recommendation.frequency, 852);
        assert_eq!(snap.metrics.stress_level, 0.1);
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(import_snapshot("{\"version\": 3}").is_err());
    }
}
