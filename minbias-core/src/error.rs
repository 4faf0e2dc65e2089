//! Error types for minbias-core.

use thiserror::Error;

/// Result type alias for minbias operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for minbias operations.
///
/// Per-channel fit failures are not errors; they are reported through
/// [`crate::FitFailure`] so the remaining channels keep going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mapping table entry points outside the channel range.
    #[error("channel index {index} out of range (expected < {limit})")]
    ChannelOutOfRange { index: usize, limit: usize },

    /// A mapping table names the same channel twice.
    #[error("channel {0} appears more than once in mapping table")]
    DuplicateChannel(usize),

    /// Invalid histogram binning.
    #[error("invalid histogram configuration: {0}")]
    InvalidHistogram(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
