//! Codec error types
//!
//! Encoding fails when a blob's geometry cannot be represented in the
//! packed form; decoding persisted records fails on truncated or
//! inconsistent data.

use runblob_region::RegionError;
use thiserror::Error;

/// Error type for blob encoding and persistence
#[derive(Error, Debug)]
pub enum CodecError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the core library
    #[error("core error: {0}")]
    Core(#[from] runblob_core::Error),

    /// An error from blob building
    #[error("region error: {0}")]
    Region(#[from] RegionError),

    /// A run ends at a column that needs more than 15 bits
    #[error("run [{x0}, {x1}] does not fit: x1 must be below 32768")]
    CoordinateOverflow { x0: u16, x1: u16 },

    /// Runs skip a row, which the end-of-row flags cannot express
    #[error("runs jump from row {previous} to row {next}")]
    RowGap { previous: u16, next: u16 },

    /// Persisted data ended early
    #[error("truncated record: {0}")]
    Truncated(&'static str),

    /// Persisted data is structurally invalid
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Convenience alias for codec results
pub type CodecResult<T> = Result<T, CodecError>;
