//! Memory-mapped binary event files.
//!
//! Layout (little-endian):
//!
//! ```text
//! header  : b"MBEV" | u32 version (1) | u32 amplitudes per event (23) | u32 reserved
//! record  : 23 × f64 pulse amplitude | i32 trigger bits
//! ```

use crate::{Error, Result};
use memmap2::Mmap;
use minbias_core::{Event, NUM_AMPLITUDES};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::slice::ChunksExact;

/// File signature of binary event files.
pub const EVENT_FILE_MAGIC: [u8; 4] = *b"MBEV";

pub(crate) const FORMAT_VERSION: u32 = 1;

pub(crate) const HEADER_SIZE: usize = 16;

/// Bytes per event record.
pub const RECORD_SIZE: usize = NUM_AMPLITUDES * 8 + 4;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire
/// file into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reader for binary event files.
pub struct EventFileReader {
    reader: MappedFileReader,
    event_count: usize,
}

impl EventFileReader {
    /// Opens and validates a binary event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, the header is wrong,
    /// or the payload is not a whole number of records.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        let event_count = validate(reader.as_bytes())?;
        log::debug!(
            "{}: {} events ({} bytes)",
            reader.path().display(),
            event_count,
            reader.size()
        );
        Ok(Self {
            reader,
            event_count,
        })
    }

    /// Number of event records.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.size()
    }

    /// Lazily decodes the records in file order.
    #[must_use]
    pub fn events(&self) -> EventIter<'_> {
        EventIter {
            records: self.reader.as_bytes()[HEADER_SIZE..].chunks_exact(RECORD_SIZE),
        }
    }
}

/// Iterator over the records of an [`EventFileReader`].
pub struct EventIter<'a> {
    records: ChunksExact<'a, u8>,
}

impl Iterator for EventIter<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(decode_record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for EventIter<'_> {}

fn validate(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::InvalidFormat(format!(
            "file too short for header ({} bytes)",
            bytes.len()
        )));
    }
    if bytes[..4] != EVENT_FILE_MAGIC {
        return Err(Error::InvalidFormat("bad file signature".into()));
    }
    let version = read_u32(&bytes[4..8]);
    if version != FORMAT_VERSION {
        return Err(Error::InvalidFormat(format!(
            "unsupported format version {version}"
        )));
    }
    let amplitudes = read_u32(&bytes[8..12]) as usize;
    if amplitudes != NUM_AMPLITUDES {
        return Err(Error::InvalidFormat(format!(
            "expected {NUM_AMPLITUDES} amplitudes per event, header says {amplitudes}"
        )));
    }

    let payload = bytes.len() - HEADER_SIZE;
    if payload % RECORD_SIZE != 0 {
        return Err(Error::InvalidFormat(format!(
            "truncated record: {} trailing bytes",
            payload % RECORD_SIZE
        )));
    }
    Ok(payload / RECORD_SIZE)
}

pub(crate) fn encode_header() -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&EVENT_FILE_MAGIC);
    header[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)]
    let amplitudes = NUM_AMPLITUDES as u32;
    header[8..12].copy_from_slice(&amplitudes.to_le_bytes());
    header
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

fn decode_record(record: &[u8]) -> Event {
    let mut amplitudes = [0.0; NUM_AMPLITUDES];
    for (value, chunk) in amplitudes.iter_mut().zip(record.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *value = f64::from_le_bytes(raw);
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&record[NUM_AMPLITUDES * 8..]);
    Event::new(amplitudes, i32::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_bytes(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_header_only_file_has_no_events() {
        let file = write_bytes(&encode_header());
        let reader = EventFileReader::open(file.path()).unwrap();
        assert_eq!(reader.event_count(), 0);
        assert_eq!(reader.events().count(), 0);
        assert_eq!(reader.file_size(), HEADER_SIZE);
    }

    #[test]
    fn test_mapped_reader_exposes_file_bytes() {
        let file = write_bytes(b"MBEV0123");
        let reader = MappedFileReader::open(file.path()).unwrap();
        assert_eq!(reader.as_bytes(), b"MBEV0123");
        assert_eq!(reader.size(), 8);
        assert_eq!(reader.path(), file.path());
    }

    #[test]
    fn test_decode_record() {
        let mut bytes = encode_header().to_vec();
        for i in 0..NUM_AMPLITUDES {
            let value = f64::from(u8::try_from(i).unwrap()) * 0.5;
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&4i32.to_le_bytes());
        let file = write_bytes(&bytes);

        let reader = EventFileReader::open(file.path()).unwrap();
        let events: Vec<Event> = reader.events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger_code, 4);
        assert!((events[0].amplitude(22) - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut header = encode_header();
        header[0] = b'X';
        let file = write_bytes(&header);
        assert!(matches!(
            EventFileReader::open(file.path()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_record() {
        let mut bytes = encode_header().to_vec();
        bytes.extend_from_slice(&[0u8; RECORD_SIZE - 1]);
        let file = write_bytes(&bytes);
        assert!(matches!(
            EventFileReader::open(file.path()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_short_file() {
        let file = write_bytes(b"MBEV");
        assert!(matches!(
            EventFileReader::open(file.path()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EventFileReader::open(dir.path().join("missing.mbev"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
