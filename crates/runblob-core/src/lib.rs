//! runblob Core - Basic data structures for blob extraction
//!
//! This crate provides the fundamental data structures used throughout
//! runblob:
//!
//! - [`Frame`] - Borrowed view over caller-owned pixels
//! - [`Image`] - Owned raster (background references, blob crops)
//! - [`PixelEncoding`] - Gray / RGB / packed 3-3-2 / binary mask layouts
//! - [`HorizontalLine`] - A run of foreground pixels on one row
//! - [`Bounds`] - Rectangle regions
//! - [`BlobId`] - Content-derived blob identity
//!
//! # Examples
//!
//! ```
//! use runblob_core::{Frame, HorizontalLine, PixelEncoding};
//!
//! let pixels = [0u8, 255, 255, 0];
//! let frame = Frame::new(&pixels, 4, 1, PixelEncoding::Binary).unwrap();
//! assert_eq!(frame.row(0).unwrap(), &pixels);
//!
//! let run = HorizontalLine::new(0, 1, 2);
//! assert_eq!(run.width(), 2);
//! ```

pub mod bounds;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod id;
pub mod image;
pub mod line;

pub use bounds::Bounds;
pub use encoding::{PixelEncoding, r3g3b2_to_gray, r3g3b2_to_rgb, rgb_to_r3g3b2};
pub use error::{Error, Result};
pub use frame::Frame;
pub use id::BlobId;
pub use image::Image;
pub use line::{HorizontalLine, MAX_RUN_SPAN, count_pixels, is_well_ordered};
