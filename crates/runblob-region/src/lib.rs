//! runblob-region - Foreground extraction and blobs
//!
//! This crate turns frames into blobs:
//!
//! - **Classification** - Per-pixel difference against a background model
//! - **Run extraction** - Row-ordered foreground runs, optionally in parallel bands
//! - **Component merging** - Fusing ordered run sequences
//! - **Labeling** - Grouping runs into connected components
//! - **Blobs** - Owned components with properties, moments and image crops
//!
//! # Examples
//!
//! ## Finding blobs in a mask
//!
//! ```
//! use runblob_region::{ExtractOptions, find_blobs};
//! use runblob_core::{Frame, PixelEncoding};
//!
//! #[rustfmt::skip]
//! let mask = [
//!     0, 1, 1, 0,
//!     1, 1, 1, 1,
//!     0, 0, 1, 0,
//! ];
//! let frame = Frame::new(&mask, 4, 3, PixelEncoding::Binary).unwrap();
//! let blobs = find_blobs(&frame, None, &ExtractOptions::default()).unwrap();
//! assert_eq!(blobs.len(), 1);
//! assert_eq!(blobs[0].num_pixels(), 7);
//! ```
//!
//! ## Classifying against a background
//!
//! ```
//! use runblob_region::{Background, ExtractOptions, find_blobs};
//! use runblob_core::{Frame, Image, PixelEncoding};
//!
//! let background = Background::new(Image::new(4, 1, 1).unwrap(), PixelEncoding::Gray).unwrap();
//! let pixels = [0, 40, 50, 3];
//! let frame = Frame::new(&pixels, 4, 1, PixelEncoding::Gray).unwrap();
//! let options = ExtractOptions::default().with_threshold(20);
//! let blobs = find_blobs(&frame, Some(&background), &options).unwrap();
//! assert_eq!(blobs[0].pixels(), Some(&[40u8, 50][..]));
//! ```

pub mod background;
pub mod blob;
pub mod classify;
pub mod error;
pub mod extract;
pub mod label;
pub mod merge;
pub mod source;
mod threshold;

// Re-export core types
pub use runblob_core;

// Re-export error types
pub use error::{RegionError, RegionResult};

// Re-export classification types
pub use background::{Background, DifferenceMethod, ThresholdGrid};
pub use classify::{
    Classifier, ClassifierConfig, MaskClassifier, RowClassifier, ThresholdCounter,
};

// Re-export extraction types and functions
pub use extract::{DEFAULT_PARALLEL_MIN_AREA, ExtractOptions, distribute_rows, extract, extract_lines};
pub use source::{RowRef, Source};

// Re-export component types and functions
pub use label::{ConnectivityType, find_blobs, label_components};
pub use merge::{Component, merge};

// Re-export blob types
pub use blob::{Blob, BlobFlags, Crop, MomentWeighting, Moments, Properties};
