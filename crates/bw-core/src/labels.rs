//! Human-readable bands for metrics and tones.

/// Stress index label.
pub fn stress_label(stress: f64) -> &'static str {
    if stress < 0.2 {
        "Very Calm"
    } else if stress < 0.4 {
        "Relaxed"
    } else if stress < 0.6 {
        "Moderate"
    } else if stress < 0.8 {
        "Elevated"
    } else {
        "High Stress"
    }
}

/// Breathing rate status (breaths per minute).
pub fn rate_status(rate: f64) -> &'static str {
    if rate < 8.0 {
        "Very Slow"
    } else if rate < 12.0 {
        "Slow & Deep"
    } else if rate < 16.0 {
        "Normal"
    } else if rate < 20.0 {
        "Slightly Fast"
    } else {
        "Fast & Shallow"
    }
}

/// Tone family for any frequency, table or entrained.
pub fn frequency_family(frequency: u32) -> &'static str {
    match frequency {
        0..=285 => "Grounding",
        286..=396 => "Liberation",
        397..=432 => "Healing",
        433..=528 => "Transformation",
        529..=639 => "Connection",
        640..=741 => "Expression",
        _ => "Intuition",
    }
}

/// Coherence tier 0..=3, used to grade memory-log moments.
pub fn coherence_tier(coherence: f64) -> u8 {
    ((coherence.clamp(0.0, 1.0) * 4.0).floor() as u8).min(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_labels() {
        assert_eq!(stress_label(0.0), "Very Calm");
        assert_eq!(stress_label(0.2), "Relaxed");
        assert_eq!(stress_label(0.59), "Moderate");
        assert_eq!(stress_label(0.7), "Elevated");
        assert_eq!(stress_label(1.0), "High Stress");
    }

    #[test]
    fn test_rate_status() {
        assert_eq!(rate_status(6.0), "Very Slow");
        assert_eq!(rate_status(10.0), "Slow & Deep");
        assert_eq!(rate_status(15.0), "Normal");
        assert_eq!(rate_status(18.0), "Slightly Fast");
        assert_eq!(rate_status(25.0), "Fast & Shallow");
    }

    #[test]
    fn test_frequency_family() {
        assert_eq!(frequency_family(174), "Grounding");
        assert_eq!(frequency_family(396), "Liberation");
        assert_eq!(frequency_family(430), "Healing");
        assert_eq!(frequency_family(528), "Transformation");
        assert_eq!(frequency_family(852), "Intuition");
    }

    #[test]
    fn test_coherence_tier() {
        assert_eq!(coherence_tier(0.1), 0);
        assert_eq!(coherence_tier(0.3), 1);
        assert_eq!(coherence_tier(0.65), 2);
        assert_eq!(coherence_tier(1.0), 3);
        assert_eq!(coherence_tier(-1.0), 0);
    }
}
