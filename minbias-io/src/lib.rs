//! minbias-io: Event store access and output for minbias.
//!
//! This crate reads calibration runs from memory-mapped binary event
//! files or HDF5 event tables, and writes the threshold report as JSON
//! and the combined diagnostic plot as PNG.
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
mod reader;
pub mod render;
mod source;
mod writer;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use crate::hdf5::{write_events_hdf5, Hdf5EventReader, Hdf5EventStream};
pub use reader::{EventFileReader, EventIter, MappedFileReader, EVENT_FILE_MAGIC, RECORD_SIZE};
pub use render::{render_report, PlotOptions};
pub use source::EventSource;
pub use writer::{write_report_json, EventFileWriter};
