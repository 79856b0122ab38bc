//! Error types for runblob-region

use runblob_core::PixelEncoding;
use thiserror::Error;

/// Errors that can occur during classification, extraction and blob building
#[derive(Debug, Error)]
pub enum RegionError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] runblob_core::Error),

    /// Frame and background use different pixel layouts
    #[error("encoding mismatch: background is {background}, input is {input}")]
    EncodingMismatch {
        background: PixelEncoding,
        input: PixelEncoding,
    },

    /// Encoding that cannot be used for this operation
    #[error("unsupported encoding for {operation}: {encoding}")]
    UnsupportedEncoding {
        operation: &'static str,
        encoding: PixelEncoding,
    },

    /// Operation needs pixel values but the blob only carries geometry
    #[error("blob has no pixel values")]
    MissingPixels,

    /// Moments were read before being calculated
    #[error("moments have not been calculated")]
    MomentsNotReady,

    /// A split blob needs the identity of its parent
    #[error("split blob requires a parent with a valid id")]
    MissingParent,

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Blob lies entirely outside the requested area
    #[error("empty crop: blob lies outside the target bounds")]
    EmptyCrop,
}

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;
