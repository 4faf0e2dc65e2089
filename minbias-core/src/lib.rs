//! minbias-core: Core types for PMT baseline noise characterization.
//!
//! This crate provides the per-channel calibration pipeline: event
//! selection, amplitude histogramming, Gaussian fitting and the
//! `μ + 3σ` hit threshold, along with the fixed channel wiring and
//! display layout tables.
//!

pub mod analysis;
pub mod channel_map;
pub mod error;
pub mod event;
pub mod fit;
pub mod histogram;
pub mod threshold;

pub use analysis::{analyze, AnalysisConfig, BaselineReport, ChannelOutcome};
pub use channel_map::{ChannelMap, DisplayLayout, GRID_COLUMNS, GRID_ROWS, NUM_CHANNELS};
pub use error::{Error, Result};
pub use event::{is_calibration_event, Event, EventFilter, CALIBRATION_TRIGGER, NUM_AMPLITUDES};
pub use fit::{fit, fit_with_config, FitConfig, FitFailure, FitResult};
pub use histogram::{accumulate, AccumulationStats, ChannelHistograms, Histogram, HistogramConfig};
pub use threshold::{threshold, SIGMA_MULTIPLIER};
