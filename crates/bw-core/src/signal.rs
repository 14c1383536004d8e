//! Small statistics helpers over `f64` slices.
//!
//! All functions are total: empty input yields 0 rather than NaN so callers
//! can clamp without special-casing.

/// Symmetric moving average with the given radius. Windows are truncated at
/// the edges, so the output has the same length as the input.
pub fn moving_average(values: &[f64], radius: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    // prefix[i] = sum of values[..i]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Linear-interpolated percentile, `p` in [0, 100].
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// stddev / mean. Zero when the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.abs() < crate::constants::EPSILON {
        return 0.0;
    }
    std_dev(values) / m
}

/// Mean absolute difference between consecutive values.
pub fn mean_successive_difference(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (values.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_constant() {
        let out = moving_average(&[0.4; 20], 5);
        assert_eq!(out.len(), 20);
        assert!(out.iter().all(|v| (v - 0.4).abs() < 1e-12));
    }

    #[test]
    fn test_moving_average_edges_truncated() {
        let out = moving_average(&[0.0, 3.0, 6.0], 1);
        assert!((out[0] - 1.5).abs() < 1e-12);
        assert!((out[1] - 3.0).abs() < 1e-12);
        assert!((out[2] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_radius_zero_is_identity() {
        let input = [0.1, 0.9, 0.3];
        assert_eq!(moving_average(&input, 0), input.to_vec());
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(mean_successive_difference(&[1.0]), 0.0);
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn test_std_dev_known() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [10.0, 0.0, 20.0, 30.0, 40.0];
        assert!((percentile(&v, 50.0) - 20.0).abs() < 1e-12);
        assert!((percentile(&v, 90.0) - 36.0).abs() < 1e-12);
        assert!((percentile(&v, 10.0) - 4.0).abs() < 1e-12);
        assert_eq!(percentile(&v, 0.0), 0.0);
        assert_eq!(percentile(&v, 100.0), 40.0);
    }

    #[test]
    fn test_cv_even_spacing_is_zero() {
        assert_eq!(coefficient_of_variation(&[4000.0, 4000.0, 4000.0]), 0.0);
        assert!(coefficient_of_variation(&[2000.0, 6000.0]) > 0.4);
    }

    #[test]
    fn test_mean_successive_difference() {
        assert!((mean_successive_difference(&[1.0, 3.0, 2.0]) - 1.5).abs() < 1e-12);
    }
}
