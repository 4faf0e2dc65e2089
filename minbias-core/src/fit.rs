//! Binned Gaussian fit.
//!
//! Fits `A·exp(-(x-μ)²/(2σ²))` to the populated bins of a [`Histogram`]
//! with varpro's Levenberg–Marquardt solver. `A` enters the model
//! linearly and is projected out; `μ` and `σ` are the nonlinear
//! parameters, seeded from the histogram's own mean and standard
//! deviation. Bins are weighted by `1/√nᵢ` (Neyman χ²) and empty bins
//! are skipped. The fit covers the whole histogram domain.
//!
//! A fit never panics on bad data: every way it can go wrong is a
//! [`FitFailure`] so callers can report the channel and move on. That
//! includes a solver that "converges" on a width no baseline can have.

use crate::histogram::Histogram;
use crate::threshold::threshold;
use nalgebra::DVector;
use thiserror::Error;
use varpro::model::builder::SeparableModelBuilder;
use varpro::solvers::levmar::{LevMarProblemBuilder, LevMarSolver};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Limits a converged fit must satisfy to be reported.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitConfig {
    /// Largest accepted σ, as a fraction of the histogram domain width.
    pub max_width_fraction: f64,
    /// Largest accepted σ uncertainty, relative to σ.
    pub max_relative_width_error: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_width_fraction: 1.0,
            max_relative_width_error: 1.0,
        }
    }
}

/// Why a channel has no fit.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FitFailure {
    /// No entries inside the histogram domain.
    #[error("empty histogram")]
    EmptyHistogram,

    /// Too few populated bins to constrain three parameters.
    #[error("only {populated} populated bin(s), need at least 3")]
    InsufficientBins { populated: usize },

    /// Zero seed width, or a solution the data does not constrain
    /// (runaway width, center outside the domain).
    #[error("degenerate histogram")]
    Degenerate,

    /// The solver stopped without reaching a minimum.
    #[error("fit did not converge")]
    NonConvergence,

    /// The solver produced NaN or infinite parameters.
    #[error("non-finite fit parameters")]
    NonFinite,
}

/// Fitted Gaussian parameters of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitResult {
    /// Peak height (counts per bin).
    pub amplitude: f64,
    /// Center μ.
    pub mean: f64,
    /// Width σ, always non-negative.
    pub sigma: f64,
    pub amplitude_error: f64,
    pub mean_error: f64,
    pub sigma_error: f64,
    /// Neyman χ² at the solution.
    pub chi_square: f64,
    /// Degrees of freedom (populated bins - 3).
    pub ndf: usize,
    /// The solver returned a negative σ, reported here as its magnitude.
    pub width_sign_flipped: bool,
}

impl FitResult {
    /// A result carrying only the three shape parameters.
    #[must_use]
    pub fn from_parameters(amplitude: f64, mean: f64, sigma: f64) -> Self {
        Self {
            amplitude,
            mean,
            sigma,
            amplitude_error: 0.0,
            mean_error: 0.0,
            sigma_error: 0.0,
            chi_square: 0.0,
            ndf: 0,
            width_sign_flipped: false,
        }
    }

    /// `μ + 3σ`.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        threshold(self)
    }

    /// χ²/ndf, or `None` with no degrees of freedom.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduced_chi_square(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.chi_square / self.ndf as f64)
    }

    /// Model value at `x`.
    #[inline]
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.amplitude * gaussian(x, self.mean, self.sigma)
    }

    /// `points` samples of the fitted curve spread evenly over `[min, max]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn curve(&self, min: f64, max: f64, points: usize) -> Vec<(f64, f64)> {
        if points < 2 {
            return vec![(min, self.evaluate(min))];
        }
        let step = (max - min) / (points - 1) as f64;
        (0..points)
            .map(|i| {
                let x = min + step * i as f64;
                (x, self.evaluate(x))
            })
            .collect()
    }
}

#[inline]
fn gaussian(x: f64, mean: f64, sigma: f64) -> f64 {
    (-(x - mean).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn gaussian_basis(x: &DVector<f64>, mean: f64, sigma: f64) -> DVector<f64> {
    x.map(|x| gaussian(x, mean, sigma))
}

fn gaussian_pd_mean(x: &DVector<f64>, mean: f64, sigma: f64) -> DVector<f64> {
    x.map(|x| (x - mean) / sigma.powi(2) * gaussian(x, mean, sigma))
}

fn gaussian_pd_sigma(x: &DVector<f64>, mean: f64, sigma: f64) -> DVector<f64> {
    x.map(|x| (x - mean).powi(2) / sigma.powi(3) * gaussian(x, mean, sigma))
}

/// Fits with the default [`FitConfig`].
///
/// # Errors
/// Returns a [`FitFailure`] describing why the channel could not be fit.
pub fn fit(histogram: &Histogram) -> Result<FitResult, FitFailure> {
    fit_with_config(histogram, &FitConfig::default())
}

/// Fits a Gaussian to the histogram.
///
/// # Errors
/// Returns a [`FitFailure`] describing why the channel could not be fit.
pub fn fit_with_config(histogram: &Histogram, config: &FitConfig) -> Result<FitResult, FitFailure> {
    let (Some(mean), Some(std_dev)) = (histogram.mean(), histogram.std_dev()) else {
        return Err(FitFailure::EmptyHistogram);
    };

    let data = BinnedData::from_histogram(histogram);
    if data.len() < 3 {
        return Err(FitFailure::InsufficientBins {
            populated: data.len(),
        });
    }
    if std_dev <= 0.0 {
        return Err(FitFailure::Degenerate);
    }
    log::debug!(
        "fit seed: mu={mean:.4} sigma={std_dev:.4} over {} bins",
        data.len()
    );

    let model = SeparableModelBuilder::<f64>::new(&["mu", "sigma"])
        .initial_parameters(vec![mean, std_dev])
        .independent_variable(data.x.clone())
        .function(&["mu", "sigma"], gaussian_basis)
        .partial_deriv("mu", gaussian_pd_mean)
        .partial_deriv("sigma", gaussian_pd_sigma)
        .build()
        .map_err(|err| {
            log::debug!("failed to build model: {err:?}");
            FitFailure::Degenerate
        })?;

    let problem = LevMarProblemBuilder::new(model)
        .observations(data.y.clone())
        .weights(data.weights.clone())
        .build()
        .map_err(|err| {
            log::debug!("failed to build problem: {err:?}");
            FitFailure::Degenerate
        })?;

    let (solution, statistics) = LevMarSolver::default()
        .fit_with_statistics(problem)
        .map_err(|err| {
            log::debug!("solver stopped: {err:?}");
            FitFailure::NonConvergence
        })?;

    let nonlinear = solution.nonlinear_parameters();
    let amplitude = solution
        .linear_coefficients()
        .and_then(|coefficients| coefficients.iter().next().copied())
        .ok_or(FitFailure::NonFinite)?;
    let nonlinear_variances = statistics.nonlinear_parameters_variance();
    let linear_variances = statistics.linear_coefficients_variance();

    let (center, raw_sigma) = (nonlinear[0], nonlinear[1]);
    if ![amplitude, center, raw_sigma].iter().all(|p| p.is_finite()) {
        return Err(FitFailure::NonFinite);
    }
    let (sigma, width_sign_flipped) = fold_width(raw_sigma);

    let result = FitResult {
        amplitude,
        mean: center,
        sigma,
        amplitude_error: linear_variances[0].sqrt(),
        mean_error: nonlinear_variances[0].sqrt(),
        sigma_error: nonlinear_variances[1].sqrt(),
        chi_square: data.chi_square(amplitude, center, sigma),
        ndf: data.len() - 3,
        width_sign_flipped,
    };
    check_constrained(&result, histogram, config)?;
    Ok(result)
}

fn fold_width(sigma: f64) -> (f64, bool) {
    if sigma < 0.0 {
        (-sigma, true)
    } else {
        (sigma, false)
    }
}

/// Rejects solutions the histogram does not pin down.
fn check_constrained(
    result: &FitResult,
    histogram: &Histogram,
    config: &FitConfig,
) -> Result<(), FitFailure> {
    let domain = histogram.max() - histogram.min();
    let center_inside = (histogram.min()..histogram.max()).contains(&result.mean);
    let width_bounded = result.sigma > 0.0 && result.sigma <= config.max_width_fraction * domain;
    let width_measured = result.sigma_error.is_finite()
        && result.sigma_error <= config.max_relative_width_error * result.sigma;

    if center_inside && width_bounded && width_measured {
        Ok(())
    } else {
        log::debug!(
            "rejecting fit: mu={:.4} sigma={:.4}±{:.4}",
            result.mean,
            result.sigma,
            result.sigma_error
        );
        Err(FitFailure::Degenerate)
    }
}

/// Populated bins as bin centers, counts and Neyman weights `1/√n`.
struct BinnedData {
    x: DVector<f64>,
    y: DVector<f64>,
    weights: DVector<f64>,
}

impl BinnedData {
    #[allow(clippy::cast_precision_loss)]
    fn from_histogram(histogram: &Histogram) -> Self {
        let (x, y): (Vec<f64>, Vec<f64>) = histogram
            .iter()
            .filter(|&(_, count)| count > 0)
            .map(|(center, count)| (center, count as f64))
            .unzip();
        let weights = y.iter().map(|n| 1.0 / n.sqrt()).collect::<Vec<_>>();
        Self {
            x: DVector::from_vec(x),
            y: DVector::from_vec(y),
            weights: DVector::from_vec(weights),
        }
    }

    fn len(&self) -> usize {
        self.x.len()
    }

    fn chi_square(&self, amplitude: f64, mean: f64, sigma: f64) -> f64 {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| (y - amplitude * gaussian(x, mean, sigma)).powi(2) / y)
            .sum()
    }
}
