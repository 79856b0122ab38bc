//! runblob-codec - Compact blob encoding
//!
//! Blobs are packed for storage by dropping their pixel values and storing
//! each run in 32 bits:
//!
//! - **Packed runs** - [`ShortHorizontalLine`] with 16-bit x0, 15-bit x1 and
//!   an end-of-row flag instead of a row coordinate
//! - **Compressed blobs** - [`CompressedBlob`] with status byte, ids and
//!   first row
//! - **Persistence** - little-endian records for writers and byte buffers
//!
//! # Examples
//!
//! ```
//! use runblob_codec::CompressedBlob;
//! use runblob_core::HorizontalLine;
//! use runblob_region::Blob;
//!
//! let mut blob = Blob::from_lines(vec![
//!     HorizontalLine::new(0, 1, 2),
//!     HorizontalLine::new(1, 0, 3),
//!     HorizontalLine::new(2, 2, 2),
//! ]);
//! let packed = CompressedBlob::encode(&mut blob).unwrap();
//! assert_eq!(packed.start_y(), 0);
//! assert_eq!(packed.num_pixels(), 7);
//!
//! let bytes = packed.write_to_bytes().unwrap();
//! let restored = CompressedBlob::read_from_bytes(&bytes).unwrap();
//! assert_eq!(restored.decode().lines(), blob.lines());
//! ```

pub mod compressed;
pub mod error;
pub mod line;
pub mod serial;

pub use compressed::CompressedBlob;
pub use error::{CodecError, CodecResult};
pub use line::{MAX_X1, ShortHorizontalLine};
pub use serial::{RECORD_HEADER_SIZE, read_blobs, write_blobs};
