//! Event store selection by file extension.

use crate::reader::EventFileReader;
use crate::Result;
use minbias_core::Event;
use std::path::Path;

#[cfg(feature = "hdf5")]
use crate::hdf5::Hdf5EventReader;

/// An opened event store.
pub enum EventSource {
    /// Memory-mapped binary event file.
    Binary(EventFileReader),
    /// HDF5 event table.
    #[cfg(feature = "hdf5")]
    Hdf5(Hdf5EventReader),
}

impl EventSource {
    /// Opens `.h5`/`.hdf5` files as HDF5 tables and anything else as a
    /// binary event file.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened or is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_hdf5_path(path) {
            return open_hdf5(path);
        }
        Ok(Self::Binary(EventFileReader::open(path)?))
    }

    /// Number of events in the store.
    #[must_use]
    pub fn event_count(&self) -> usize {
        match self {
            Self::Binary(reader) => reader.event_count(),
            #[cfg(feature = "hdf5")]
            Self::Hdf5(reader) => reader.event_count(),
        }
    }

    /// Single forward pass over the events.
    pub fn events(&self) -> Box<dyn Iterator<Item = Result<Event>> + '_> {
        match self {
            Self::Binary(reader) => Box::new(reader.events().map(Ok)),
            #[cfg(feature = "hdf5")]
            Self::Hdf5(reader) => Box::new(reader.events()),
        }
    }
}

fn is_hdf5_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "h5" | "hdf5"))
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> Result<EventSource> {
    Ok(EventSource::Hdf5(Hdf5EventReader::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> Result<EventSource> {
    Err(crate::Error::Unsupported {
        path: path.to_path_buf(),
        reason: "built without the `hdf5` feature".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventFileWriter;
    use minbias_core::NUM_AMPLITUDES;

    #[test]
    fn test_hdf5_extension_detection() {
        assert!(is_hdf5_path(Path::new("run42.h5")));
        assert!(is_hdf5_path(Path::new("run42.HDF5")));
        assert!(!is_hdf5_path(Path::new("run42.mbev")));
        assert!(!is_hdf5_path(Path::new("run42")));
    }

    #[test]
    fn test_open_binary_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.mbev");
        let mut writer = EventFileWriter::create(&path).unwrap();
        writer
            .write_event(&Event::new([2.0; NUM_AMPLITUDES], 4))
            .unwrap();
        writer.finish().unwrap();

        let source = EventSource::open(&path).unwrap();
        assert_eq!(source.event_count(), 1);
        let events: Vec<Event> = source.events().collect::<Result<_>>().unwrap();
        assert_eq!(events[0].trigger_code, 4);
    }

    #[test]
    fn test_open_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EventSource::open(dir.path().join("absent.mbev")).is_err());
        assert!(EventSource::open(dir.path().join("absent.h5")).is_err());
    }
}
