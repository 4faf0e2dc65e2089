//! HDF5 event tables.
//!
//! A run is stored as group `tree` holding two datasets:
//!
//! - `pulseH`: `f64`, shape `(N, 23)`, pulse amplitude per readout column
//! - `triggerBits`: `i32`, shape `(N,)`
//!
//! Rows are read in chunks so memory stays bounded for long runs.

use crate::{Error, Result};
use hdf5::{Dataset, File, Group};
use minbias_core::{Event, NUM_AMPLITUDES};
use ndarray::{s, Array1, Array2};
use std::path::Path;

const TREE_GROUP: &str = "tree";
const PULSE_DATASET: &str = "pulseH";
const TRIGGER_DATASET: &str = "triggerBits";
const CHUNK_EVENTS: usize = 65_536;

/// Reader for HDF5 event tables.
pub struct Hdf5EventReader {
    _file: File,
    pulse: Dataset,
    trigger: Dataset,
    event_count: usize,
}

impl Hdf5EventReader {
    /// Opens the file and checks the event table shape.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the table is missing,
    /// or the dataset shapes disagree.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let tree = file
            .group(TREE_GROUP)
            .map_err(|_| Error::MissingTable(format!("group '{TREE_GROUP}' not found")))?;
        let pulse = open_dataset(&tree, PULSE_DATASET)?;
        let trigger = open_dataset(&tree, TRIGGER_DATASET)?;

        let pulse_shape = pulse.shape();
        if pulse_shape.len() != 2 || pulse_shape[1] != NUM_AMPLITUDES {
            return Err(Error::InvalidFormat(format!(
                "'{PULSE_DATASET}' has shape {pulse_shape:?}, expected (N, {NUM_AMPLITUDES})"
            )));
        }
        let trigger_shape = trigger.shape();
        if trigger_shape.len() != 1 || trigger_shape[0] != pulse_shape[0] {
            return Err(Error::InvalidFormat(format!(
                "'{TRIGGER_DATASET}' has shape {trigger_shape:?}, expected ({},)",
                pulse_shape[0]
            )));
        }

        Ok(Self {
            _file: file,
            pulse,
            trigger,
            event_count: pulse_shape[0],
        })
    }

    /// Number of event rows.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Streams the rows in order, one chunk in memory at a time.
    #[must_use]
    pub fn events(&self) -> Hdf5EventStream<'_> {
        Hdf5EventStream {
            reader: self,
            next_row: 0,
            pulse: Array2::zeros((0, NUM_AMPLITUDES)),
            trigger: Array1::zeros(0),
            cursor: 0,
        }
    }
}

fn open_dataset(group: &Group, name: &str) -> Result<Dataset> {
    group
        .dataset(name)
        .map_err(|_| Error::MissingTable(format!("dataset '{TREE_GROUP}/{name}' not found")))
}

/// Chunked row iterator of an [`Hdf5EventReader`].
///
/// A read error is yielded once and ends the stream.
pub struct Hdf5EventStream<'a> {
    reader: &'a Hdf5EventReader,
    next_row: usize,
    pulse: Array2<f64>,
    trigger: Array1<i32>,
    cursor: usize,
}

impl Hdf5EventStream<'_> {
    fn load_chunk(&mut self) -> Result<()> {
        let start = self.next_row;
        let end = (start + CHUNK_EVENTS).min(self.reader.event_count);
        self.pulse = self
            .reader
            .pulse
            .read_slice_2d::<f64, _>(s![start..end, ..])?;
        self.trigger = self.reader.trigger.read_slice_1d::<i32, _>(s![start..end])?;
        self.next_row = end;
        self.cursor = 0;
        log::debug!("read event rows {start}..{end}");
        Ok(())
    }
}

impl Iterator for Hdf5EventStream<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.trigger.len() {
            if self.next_row >= self.reader.event_count {
                return None;
            }
            if let Err(err) = self.load_chunk() {
                self.next_row = self.reader.event_count;
                self.trigger = Array1::zeros(0);
                self.cursor = 0;
                return Some(Err(err));
            }
        }

        let row = self.pulse.row(self.cursor);
        let mut amplitudes = [0.0; NUM_AMPLITUDES];
        for (value, &amplitude) in amplitudes.iter_mut().zip(row.iter()) {
            *value = amplitude;
        }
        let event = Event::new(amplitudes, self.trigger[self.cursor]);
        self.cursor += 1;
        Some(Ok(event))
    }
}

/// Writes events as an HDF5 event table.
///
/// # Errors
/// Returns an error if HDF5 I/O fails.
pub fn write_events_hdf5<P: AsRef<Path>>(path: P, events: &[Event]) -> Result<()> {
    let file = File::create(path)?;
    let tree = file.create_group(TREE_GROUP)?;

    let flat: Vec<f64> = events.iter().flat_map(|e| e.amplitudes).collect();
    let pulse = Array2::from_shape_vec((events.len(), NUM_AMPLITUDES), flat)
        .map_err(|e| Error::InvalidFormat(format!("pulse table shape: {e}")))?;
    let trigger: Array1<i32> = events.iter().map(|e| e.trigger_code).collect();

    tree.new_dataset::<f64>()
        .shape((events.len(), NUM_AMPLITUDES))
        .create(PULSE_DATASET)?
        .write(&pulse)?;
    tree.new_dataset::<i32>()
        .shape((events.len(),))
        .create(TRIGGER_DATASET)?
        .write(&trigger)?;
    Ok(())
}
