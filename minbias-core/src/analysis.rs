//! Per-channel analysis: fit every channel and collect the results in
//! display order.
//!
//! Each channel is fit independently on the rayon pool. A failing channel
//! only affects its own [`ChannelOutcome`].

use crate::channel_map::{ChannelMap, DisplayLayout};
use crate::event::{Event, EventFilter};
use crate::fit::{fit_with_config, FitConfig, FitFailure, FitResult};
use crate::histogram::{AccumulationStats, ChannelHistograms, Histogram, HistogramConfig};
use crate::{Error, Result, NUM_CHANNELS};
use rayon::prelude::*;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings for a full calibration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    pub filter: EventFilter,
    pub histogram: HistogramConfig,
    pub fit: FitConfig,
}

impl AnalysisConfig {
    /// Checks the binning and fit acceptance limits.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.histogram.validate()?;
        if !(self.fit.max_width_fraction.is_finite() && self.fit.max_width_fraction > 0.0) {
            return Err(Error::ConfigError(format!(
                "max_width_fraction must be positive, got {}",
                self.fit.max_width_fraction
            )));
        }
        if !(self.fit.max_relative_width_error.is_finite()
            && self.fit.max_relative_width_error > 0.0)
        {
            return Err(Error::ConfigError(format!(
                "max_relative_width_error must be positive, got {}",
                self.fit.max_relative_width_error
            )));
        }
        Ok(())
    }
}

/// Result for one PMT channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelOutcome {
    /// PMT slot (0-based).
    pub pmt: usize,
    /// Digitizer column the slot reads from.
    pub readout: usize,
    /// Grid cell `(row, column)`.
    pub position: (usize, usize),
    pub histogram: Histogram,
    pub fit: std::result::Result<FitResult, FitFailure>,
}

impl ChannelOutcome {
    /// 1-based PMT number as printed in reports.
    #[must_use]
    pub fn pmt_number(&self) -> usize {
        self.pmt + 1
    }

    /// `μ + 3σ`, if the fit succeeded.
    #[must_use]
    pub fn threshold(&self) -> Option<f64> {
        self.fit.as_ref().ok().map(FitResult::threshold)
    }
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fit {
            Ok(result) => {
                write!(f, "PMT {}: μ + 3σ = {:.4}", self.pmt_number(), result.threshold())?;
                if result.width_sign_flipped {
                    write!(f, " [negative width folded]")?;
                }
                Ok(())
            }
            Err(FitFailure::EmptyHistogram) => write!(f, "PMT {}: no data", self.pmt_number()),
            Err(failure) => write!(f, "PMT {}: fit failed ({failure})", self.pmt_number()),
        }
    }
}

/// Outcome of a calibration pass, channels in display order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BaselineReport {
    pub stats: AccumulationStats,
    pub channels: Vec<ChannelOutcome>,
}

impl BaselineReport {
    /// Histograms and fits every channel of an in-memory event stream.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn from_events<I>(
        events: I,
        map: &ChannelMap,
        layout: &DisplayLayout,
        config: &AnalysisConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Event>,
    {
        config.validate()?;
        let mut histograms = ChannelHistograms::new(&config.histogram)?;
        let stats = histograms.accumulate(events, map, &config.filter);
        Ok(Self::from_histograms(&histograms, stats, map, layout, &config.fit))
    }

    /// Fits already filled histograms.
    #[must_use]
    pub fn from_histograms(
        histograms: &ChannelHistograms,
        stats: AccumulationStats,
        map: &ChannelMap,
        layout: &DisplayLayout,
        fit: &FitConfig,
    ) -> Self {
        Self {
            stats,
            channels: analyze(histograms, map, layout, fit),
        }
    }

    /// Thresholds indexed by PMT slot.
    #[must_use]
    pub fn thresholds(&self) -> [Option<f64>; NUM_CHANNELS] {
        let mut thresholds = [None; NUM_CHANNELS];
        for outcome in &self.channels {
            thresholds[outcome.pmt] = outcome.threshold();
        }
        thresholds
    }

    /// Outcome of a PMT slot.
    #[must_use]
    pub fn channel(&self, pmt: usize) -> Option<&ChannelOutcome> {
        self.channels.iter().find(|outcome| outcome.pmt == pmt)
    }

    /// Number of channels without a fit.
    #[must_use]
    pub fn failed_channels(&self) -> usize {
        self.channels.iter().filter(|outcome| outcome.fit.is_err()).count()
    }
}

impl fmt::Display for BaselineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.channels {
            writeln!(f, "{outcome}")?;
        }
        Ok(())
    }
}

/// Fits each channel and returns the outcomes in display order.
#[must_use]
pub fn analyze(
    histograms: &ChannelHistograms,
    map: &ChannelMap,
    layout: &DisplayLayout,
    config: &FitConfig,
) -> Vec<ChannelOutcome> {
    let order: Vec<usize> = layout.iter().collect();
    order
        .into_par_iter()
        .map(|pmt| {
            let histogram = histograms.channel(pmt);
            let fit = fit_with_config(histogram, config);
            if matches!(&fit, Ok(result) if result.width_sign_flipped) {
                log::warn!("PMT {}: fit converged to a negative width, folded", pmt + 1);
            }
            match &fit {
                Ok(result) => log::debug!(
                    "PMT {}: A={:.2} mu={:.4}±{:.4} sigma={:.4}±{:.4} chi2/ndf={:.2}/{}",
                    pmt + 1,
                    result.amplitude,
                    result.mean,
                    result.mean_error,
                    result.sigma,
                    result.sigma_error,
                    result.chi_square,
                    result.ndf
                ),
                Err(FitFailure::EmptyHistogram) => log::warn!("Empty histogram for PMT {}", pmt + 1),
                Err(failure) => log::warn!("Fit failed for PMT {}: {failure}", pmt + 1),
            }
            ChannelOutcome {
                pmt,
                readout: map.physical_index(pmt),
                position: layout.display_position(pmt),
                histogram: histogram.clone(),
                fit,
            }
        })
        .collect()
}
