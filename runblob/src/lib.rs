//! runblob - Run-length blob extraction for Rust
//!
//! Frames are compared against a background model, the differing pixels
//! are collected into horizontal runs, and the runs are grouped into
//! connected blobs.
//!
//! # Overview
//!
//! - Background classification (grayscale, RGB, R3G3B2 and binary frames)
//! - Row-run extraction, optionally over parallel row bands
//! - Merging and labeling of runs into components
//! - Blobs with properties, moments, re-thresholding and image crops
//! - Bit-packed blob encoding and persistence
//!
//! # Example
//!
//! ```
//! use runblob::codec::CompressedBlob;
//! use runblob::region::{ExtractOptions, find_blobs};
//! use runblob::{Frame, PixelEncoding};
//!
//! #[rustfmt::skip]
//! let mask = [
//!     0, 1, 1, 0,
//!     1, 1, 1, 1,
//!     0, 0, 1, 0,
//! ];
//! let frame = Frame::new(&mask, 4, 3, PixelEncoding::Binary).unwrap();
//! let mut blobs = find_blobs(&frame, None, &ExtractOptions::default()).unwrap();
//! assert_eq!(blobs.len(), 1);
//!
//! let packed = CompressedBlob::encode(&mut blobs[0]).unwrap();
//! assert_eq!(packed.num_pixels(), 7);
//! assert_eq!(packed.decode().lines(), blobs[0].lines());
//! ```

// Re-export core types (primary data structures used everywhere)
pub use runblob_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use runblob_codec as codec;
pub use runblob_region as region;
