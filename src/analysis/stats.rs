//! Summary statistics over run samples.

/// Arithmetic mean, or `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (N-1 denominator). Undefined below two samples.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Round half away from zero to `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// `"{mean:.2} ± {std:.2}"`, or `None` when either statistic is undefined.
pub fn format_mean_std(values: &[f64]) -> Option<String> {
    let m = mean(values)?;
    let s = sample_std(values)?;
    Some(format!("{:.2} ± {:.2}", m, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_sample_std() {
        let values = [0.70, 0.80, 0.90];
        assert!((mean(&values).unwrap() - 0.80).abs() < 1e-12);
        assert!((sample_std(&values).unwrap() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_statistics() {
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std(&[0.5]), None);
        assert_eq!(format_mean_std(&[0.5]), None);
    }

    #[test]
    fn test_format_mean_std() {
        assert_eq!(format_mean_std(&[0.70, 0.80, 0.90]).as_deref(), Some("0.80 ± 0.10"));
        assert_eq!(round_to(0.3249, 2), 0.32);
    }
}
