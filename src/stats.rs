use crate::error::{EngineError, EngineResult};
use crate::models::{QuartileResult, StatisticsResult};

/// Mean, sample standard deviation and coefficient of variation (percent).
///
/// Fewer than two observations give a zero deviation, and a zero mean gives a
/// zero coefficient of variation.
pub fn weekday_statistics(counts: &[i64]) -> StatisticsResult {
    if counts.is_empty() {
        return StatisticsResult {
            mean: 0.0,
            std_dev: 0.0,
            coefficient_of_variation: 0.0,
            cohort: Vec::new(),
        };
    }

    let n = counts.len() as f64;
    let mean = counts.iter().map(|&c| c as f64).sum::<f64>() / n;

    let std_dev = if counts.len() > 1 {
        let sq_diff: f64 = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum();
        (sq_diff / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    let coefficient_of_variation = if mean > 0.0 {
        std_dev / mean * 100.0
    } else {
        0.0
    };

    StatisticsResult {
        mean,
        std_dev,
        coefficient_of_variation,
        cohort: counts.to_vec(),
    }
}

/// Positional quartiles over an ascending slice: q1 at `n/4`, q3 at `3n/4`.
/// No interpolation between neighbours.
pub fn quartiles(sorted: &[i64]) -> EngineResult<QuartileResult> {
    let n = sorted.len();
    if n == 0 {
        return Err(EngineError::DegenerateQuartileInput);
    }

    let q1 = sorted[n / 4];
    // 3n/4 < n for every n >= 1
    let q3 = sorted[(3 * n) / 4];

    Ok(QuartileResult {
        q1,
        q3,
        iqr: q3 - q1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cohort_is_all_zero() {
        let stats = weekday_statistics(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.coefficient_of_variation, 0.0);
    }

    #[test]
    fn single_observation_has_no_spread() {
        let stats = weekday_statistics(&[42]);
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.coefficient_of_variation, 0.0);
    }

    #[test]
    fn zero_mean_does_not_divide() {
        let stats = weekday_statistics(&[0, 0, 0]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.coefficient_of_variation, 0.0);
        assert!(stats.coefficient_of_variation.is_finite());
    }

    #[test]
    fn flat_cohort() {
        let stats = weekday_statistics(&[10, 10, 10, 10]);
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.coefficient_of_variation, 0.0);
    }

    #[test]
    fn uses_sample_deviation() {
        let stats = weekday_statistics(&[5, 15, 25, 35]);
        assert!((stats.mean - 20.0).abs() < 1e-9);
        assert!((stats.std_dev - 12.9099).abs() < 0.001);
        assert!((stats.coefficient_of_variation - 64.55).abs() < 0.01);
        assert_eq!(stats.cohort, vec![5, 15, 25, 35]);
    }

    #[test]
    fn repeated_calls_agree() {
        let cohort = [3, 9, 4, 11, 7];
        assert_eq!(weekday_statistics(&cohort), weekday_statistics(&cohort));
    }

    #[test]
    fn quartiles_are_positional() {
        let q = quartiles(&[5, 15, 25, 35]).unwrap();
        assert_eq!(q, QuartileResult { q1: 15, q3: 35, iqr: 20 });

        // n = 5: indices 1 and 3, not interpolated
        let q = quartiles(&[1, 2, 3, 4, 100]).unwrap();
        assert_eq!((q.q1, q.q3, q.iqr), (2, 4, 2));
    }

    #[test]
    fn quartiles_of_one_element() {
        let q = quartiles(&[8]).unwrap();
        assert_eq!((q.q1, q.q3, q.iqr), (8, 8, 0));
    }

    #[test]
    fn quartiles_reject_empty_input() {
        assert!(matches!(
            quartiles(&[]),
            Err(EngineError::DegenerateQuartileInput)
        ));
    }
}
