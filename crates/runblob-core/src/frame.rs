//! Frame - a borrowed view over caller-owned pixels
//!
//! Frames are delivered by an external decoder. Nothing in runblob ever
//! owns frame memory: runs and components hold slices into the frame
//! buffer, tied to the frame's lifetime.

use crate::bounds::Bounds;
use crate::encoding::PixelEncoding;
use crate::error::{Error, Result};

/// A rectangular pixel buffer borrowed from the caller
///
/// Rows are tightly packed: row `y` starts at byte
/// `y * width * encoding.bytes_per_pixel()`.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: u16,
    height: u16,
    encoding: PixelEncoding,
}

impl<'a> Frame<'a> {
    /// Wrap a pixel buffer
    ///
    /// # Arguments
    ///
    /// * `data` - Pixel bytes, at least `width * height * bytes_per_pixel`
    /// * `width` - Frame width, 1..=65535
    /// * `height` - Frame height, 1..=65535
    /// * `encoding` - Pixel layout
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if a dimension is zero or does not
    /// fit 16-bit coordinates, and [`Error::BufferTooSmall`] if `data` is
    /// shorter than the geometry requires.
    pub fn new(data: &'a [u8], width: u32, height: u32, encoding: PixelEncoding) -> Result<Self> {
        if width == 0 || height == 0 || width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = width as usize * height as usize * encoding.bytes_per_pixel();
        if data.len() < expected {
            return Err(Error::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: &data[..expected],
            width: width as u16,
            height: height as u16,
            encoding,
        })
    }

    /// Get the width
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Get the height
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of pixels
    #[inline]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Pixel layout
    #[inline]
    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    /// Bytes per row
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.encoding.bytes_per_pixel()
    }

    /// Whole buffer
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Frame rectangle at the origin
    pub fn bounds(&self) -> Bounds {
        Bounds::new_unchecked(0, 0, self.width as i32, self.height as i32)
    }

    /// Pixels of row `y`
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `y >= height`.
    pub fn row(&self, y: u16) -> Result<&'a [u8]> {
        if y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: y as usize,
                len: self.height as usize,
            });
        }
        let stride = self.row_stride();
        let start = y as usize * stride;
        Ok(&self.data[start..start + stride])
    }

    /// Pixel bytes starting at `(x, y)` through the end of that row
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the position is outside
    /// the frame.
    pub fn row_from(&self, x: u16, y: u16) -> Result<&'a [u8]> {
        let row = self.row(y)?;
        if x >= self.width {
            return Err(Error::IndexOutOfBounds {
                index: x as usize,
                len: self.width as usize,
            });
        }
        Ok(&row[x as usize * self.encoding.bytes_per_pixel()..])
    }

    /// Bytes of a single pixel
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the position is outside
    /// the frame.
    pub fn pixel(&self, x: u16, y: u16) -> Result<&'a [u8]> {
        let bpp = self.encoding.bytes_per_pixel();
        Ok(&self.row_from(x, y)?[..bpp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![0u8; 4 * 3 * 3];
        let frame = Frame::new(&data, 4, 3, PixelEncoding::Rgb8).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.row_stride(), 12);
        assert_eq!(frame.area(), 12);
    }

    #[test]
    fn test_frame_rejects_bad_geometry() {
        let data = vec![0u8; 10];
        assert!(matches!(
            Frame::new(&data, 4, 3, PixelEncoding::Gray),
            Err(Error::BufferTooSmall {
                expected: 12,
                actual: 10
            })
        ));
        assert!(Frame::new(&data, 0, 3, PixelEncoding::Gray).is_err());
        assert!(Frame::new(&data, 70_000, 1, PixelEncoding::Gray).is_err());
    }

    #[test]
    fn test_frame_access() {
        let data: Vec<u8> = (0..12).collect();
        let frame = Frame::new(&data, 4, 3, PixelEncoding::Gray).unwrap();
        assert_eq!(frame.row(1).unwrap(), &[4, 5, 6, 7]);
        assert_eq!(frame.row_from(2, 2).unwrap(), &[10, 11]);
        assert_eq!(frame.pixel(3, 0).unwrap(), &[3]);
        assert!(frame.row(3).is_err());
        assert!(frame.pixel(4, 0).is_err());
    }
}
