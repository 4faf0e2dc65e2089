//! Hit threshold from the baseline fit.

use crate::fit::FitResult;

/// Number of standard deviations above the baseline mean.
pub const SIGMA_MULTIPLIER: f64 = 3.0;

/// `μ + 3σ` of a fitted baseline.
#[inline]
#[must_use]
pub fn threshold(fit: &FitResult) -> f64 {
    fit.mean + SIGMA_MULTIPLIER * fit.sigma
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_threshold_exact() {
        let fit = FitResult::from_parameters(120.0, 5.0, 2.0);
        assert_eq!(threshold(&fit), 11.0);
        assert_eq!(fit.threshold(), 11.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_threshold_negative_mean() {
        let fit = FitResult::from_parameters(1.0, -1.5, 0.5);
        assert_eq!(threshold(&fit), 0.0);
    }
}
