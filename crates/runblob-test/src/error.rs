//! Error types for the test framework

use thiserror::Error;

/// Errors that can occur during regression testing
#[derive(Debug, Error)]
pub enum TestError {
    /// Failed to write an image
    #[error("failed to write image '{path}': {message}")]
    ImageWrite { path: String, message: String },

    /// Failed to decode an image
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Image layout the PNG helpers do not handle
    #[error("unsupported image layout: {0}")]
    UnsupportedLayout(String),

    /// Error from the core library
    #[error("core error: {0}")]
    Core(#[from] runblob_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
