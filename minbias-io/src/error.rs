//! I/O error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// The event table or one of its columns is missing.
    #[error("missing event table: {0}")]
    MissingTable(String),

    /// The file type needs a feature this build lacks.
    #[error("unsupported event store {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Plot rendering error.
    #[error("plot error: {0}")]
    Plot(String),
}
