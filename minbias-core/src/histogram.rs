//! Fixed-binning amplitude histograms and event accumulation.
//!
//! Each PMT channel gets its own [`Histogram`] with the same binning,
//! 40 bins over `[-10, 30)` ADC counts by default. Values outside the
//! domain are tallied as underflow/overflow and never reach a bin.

use crate::channel_map::{ChannelMap, NUM_CHANNELS};
use crate::event::{Event, EventFilter};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Binning shared by all channel histograms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramConfig {
    /// Number of equal-width bins.
    pub bins: usize,
    /// Lower domain edge (inclusive).
    pub min: f64,
    /// Upper domain edge (exclusive).
    pub max: f64,
}

impl HistogramConfig {
    /// Checks that the binning is usable.
    ///
    /// # Errors
    /// Returns an error for zero bins or an empty/non-finite domain.
    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(Error::InvalidHistogram("bin count must be > 0".into()));
        }
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            return Err(Error::InvalidHistogram(format!(
                "domain [{}, {}) is empty or not finite",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bins: 40,
            min: -10.0,
            max: 30.0,
        }
    }
}

/// One-dimensional histogram with fixed equal-width bins.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram {
    min: f64,
    max: f64,
    bin_width: f64,
    counts: Vec<u64>,
    entries: u64,
    underflow: u64,
    overflow: u64,
}

impl Histogram {
    /// Creates an empty histogram.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &HistogramConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_binning(config))
    }

    fn with_binning(config: &HistogramConfig) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let bin_width = (config.max - config.min) / config.bins as f64;
        Self {
            min: config.min,
            max: config.max,
            bin_width,
            counts: vec![0; config.bins],
            entries: 0,
            underflow: 0,
            overflow: 0,
        }
    }

    /// Bin containing `value`, or `None` outside `[min, max)` and for NaN.
    #[inline]
    #[must_use]
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin = ((value - self.min) / self.bin_width) as usize;
        // Rounding can push values just below `max` onto the edge.
        Some(bin.min(self.counts.len() - 1))
    }

    /// Adds one entry. Out-of-domain values only bump the under/overflow tally.
    #[inline]
    pub fn fill(&mut self, value: f64) {
        match self.bin_index(value) {
            Some(bin) => {
                self.counts[bin] += 1;
                self.entries += 1;
            }
            None if value < self.min => self.underflow += 1,
            None if value >= self.max => self.overflow += 1,
            None => {}
        }
    }

    /// Zeroes all counts.
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.entries = 0;
        self.underflow = 0;
        self.overflow = 0;
    }

    /// Bin counts.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of in-domain entries.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// True when no value has landed in a bin.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    #[must_use]
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Center of bin `bin`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 + 0.5) * self.bin_width
    }

    /// Iterator over `(bin center, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(bin, &count)| (self.bin_center(bin), count))
    }

    /// Count-weighted mean of bin centers; `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.iter().map(|(x, c)| x * c as f64).sum();
        Some(sum / self.entries as f64)
    }

    /// Population standard deviation of bin centers; `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let sum: f64 = self
            .iter()
            .map(|(x, c)| c as f64 * (x - mean).powi(2))
            .sum();
        Some((sum / self.entries as f64).sqrt())
    }

    /// Largest bin count.
    #[must_use]
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Number of bins with at least one entry.
    #[must_use]
    pub fn populated_bins(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }
}

/// Counters from one accumulation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccumulationStats {
    /// Events read from the stream.
    pub events_scanned: u64,
    /// Events that passed the filter.
    pub events_selected: u64,
}

/// The twelve per-channel histograms, indexed by PMT slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelHistograms {
    histograms: Vec<Histogram>,
}

impl ChannelHistograms {
    /// Creates twelve empty histograms with the same binning.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &HistogramConfig) -> Result<Self> {
        let template = Histogram::new(config)?;
        Ok(Self {
            histograms: vec![template; NUM_CHANNELS],
        })
    }

    /// Histogram of a PMT slot.
    ///
    /// # Panics
    /// Panics if `slot >= NUM_CHANNELS`.
    #[must_use]
    pub fn channel(&self, slot: usize) -> &Histogram {
        &self.histograms[slot]
    }

    /// All histograms, indexed by PMT slot.
    #[must_use]
    pub fn as_slice(&self) -> &[Histogram] {
        &self.histograms
    }

    /// Zeroes every histogram.
    pub fn reset(&mut self) {
        self.histograms.iter_mut().for_each(Histogram::reset);
    }

    /// Fills all twelve channels from one event.
    ///
    /// The event filter is not consulted here.
    pub fn fill_event(&mut self, event: &Event, map: &ChannelMap) {
        for (slot, histogram) in self.histograms.iter_mut().enumerate() {
            histogram.fill(event.amplitude(map.physical_index(slot)));
        }
    }

    /// Adds every selected event of the stream to the histograms.
    ///
    /// Counts are added on top of the current contents; call
    /// [`reset`](Self::reset) first to start over.
    pub fn accumulate<I>(&mut self, events: I, map: &ChannelMap, filter: &EventFilter) -> AccumulationStats
    where
        I: IntoIterator<Item = Event>,
    {
        let mut stats = AccumulationStats::default();
        for event in events {
            stats.events_scanned += 1;
            if filter.accepts(&event) {
                stats.events_selected += 1;
                self.fill_event(&event, map);
            }
        }
        log::debug!(
            "accumulated {} of {} events",
            stats.events_selected,
            stats.events_scanned
        );
        stats
    }

    /// Like [`accumulate`](Self::accumulate) over a fallible stream.
    ///
    /// Stops at the first read error. Events read before the error stay
    /// in the histograms.
    ///
    /// # Errors
    /// Returns the first error yielded by the stream.
    pub fn try_accumulate<I, E>(
        &mut self,
        events: I,
        map: &ChannelMap,
        filter: &EventFilter,
    ) -> std::result::Result<AccumulationStats, E>
    where
        I: IntoIterator<Item = std::result::Result<Event, E>>,
    {
        let mut stats = AccumulationStats::default();
        for event in events {
            let event = event?;
            stats.events_scanned += 1;
            if filter.accepts(&event) {
                stats.events_selected += 1;
                self.fill_event(&event, map);
            }
        }
        log::debug!(
            "accumulated {} of {} events",
            stats.events_selected,
            stats.events_scanned
        );
        Ok(stats)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_binning(&HistogramConfig::default())
    }
}

impl Default for ChannelHistograms {
    fn default() -> Self {
        Self {
            histograms: vec![Histogram::default(); NUM_CHANNELS],
        }
    }
}

/// Builds fresh channel histograms from calibration events with the
/// default binning.
#[must_use]
pub fn accumulate<I>(events: I, map: &ChannelMap) -> ChannelHistograms
where
    I: IntoIterator<Item = Event>,
{
    let mut histograms = ChannelHistograms::default();
    histograms.accumulate(events, map, &EventFilter::default());
    histograms
}
