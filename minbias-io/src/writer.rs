//! Writers for event files and threshold reports.

use crate::reader::encode_header;
use crate::Result;
use minbias_core::{BaselineReport, Event};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streaming writer for binary event files.
pub struct EventFileWriter {
    writer: BufWriter<File>,
    events_written: usize,
}

impl EventFileWriter {
    /// Creates the file and writes the header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&encode_header())?;
        Ok(Self {
            writer,
            events_written: 0,
        })
    }

    /// Appends one event record.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        for amplitude in &event.amplitudes {
            self.writer.write_all(&amplitude.to_le_bytes())?;
        }
        self.writer.write_all(&event.trigger_code.to_le_bytes())?;
        self.events_written += 1;
        Ok(())
    }

    /// Appends every event of an iterator.
    ///
    /// # Errors
    /// Returns an error if a write fails.
    pub fn write_events<'a, I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        for event in events {
            self.write_event(event)?;
        }
        Ok(())
    }

    /// Flushes and closes the file, returning the number of records.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.events_written)
    }
}

/// Writes the report as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_report_json<P: AsRef<Path>>(path: P, report: &BaselineReport) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
