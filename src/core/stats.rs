//! Small numeric helpers shared by the aggregation stages.

/// Returns the `q`-th quantile (0.0..=1.0) of a sample using linear
/// interpolation between the two closest ranks.
///
/// The sample does not need to be sorted. Non-finite values are ignored.
/// Returns `None` for an empty sample.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

/// Same as [`percentile`] but expects an already sorted slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}

/// Rounds to 4 decimal places, the precision every derived table is kept at.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let sample = [0.06, 0.02, 0.04];
        assert!(approx(median(&sample).unwrap(), 0.04));
        // rank = 0.1 * 2 = 0.2 -> 0.02 + 0.02 * 0.2
        assert!(approx(percentile(&sample, 0.10).unwrap(), 0.024));
        // rank = 0.9 * 2 = 1.8 -> 0.04 + 0.02 * 0.8
        assert!(approx(percentile(&sample, 0.90).unwrap(), 0.056));
    }

    #[test]
    fn test_percentile_even_sample_and_single_value() {
        assert!(approx(median(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5));
        assert_eq!(percentile(&[7.0], 0.9), Some(7.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn test_percentile_sorted_handles_empty_slice() {
        assert_eq!(percentile_sorted(&[], 0.5), None);
        assert_eq!(percentile_sorted(&[1.0, 3.0], 0.5), Some(2.0));
    }

    #[test]
    fn test_mean_and_round4() {
        assert_eq!(mean(&[]), None);
        assert!(approx(mean(&[1.0, 2.0, 6.0]).unwrap(), 3.0));
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(-0.000_04), -0.0);
        assert_eq!(round4(1.0), 1.0);
    }
}
