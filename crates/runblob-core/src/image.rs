//! Image - an owned raster
//!
//! Holds background references and the crops produced when a blob is
//! materialized. Unlike [`Frame`], an image owns its bytes.

use crate::bounds::Bounds;
use crate::encoding::PixelEncoding;
use crate::error::{Error, Result};
use crate::frame::Frame;

/// Owned interleaved 8-bit raster with 1 to 4 channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

impl Image {
    /// Create a zero-filled image
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or a channel count outside 1..=4.
    pub fn new(width: u32, height: u32, channels: usize) -> Result<Self> {
        Self::check_geometry(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; width as usize * height as usize * channels],
        })
    }

    /// Wrap existing pixel data
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry is invalid or `data` has the wrong
    /// length.
    pub fn from_data(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Result<Self> {
        Self::check_geometry(width, height, channels)?;
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(Error::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    fn check_geometry(width: u32, height: u32, channels: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        if !(1..=4).contains(&channels) {
            return Err(Error::UnsupportedChannels(channels));
        }
        Ok(())
    }

    /// Get the width
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved channels per pixel
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw bytes
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes, mutable
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume into raw bytes
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Image rectangle at the origin
    pub fn bounds(&self) -> Bounds {
        Bounds::new_unchecked(0, 0, self.width as i32, self.height as i32)
    }

    /// Bytes of the pixel at `(x, y)`, `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    /// Mutable bytes of the pixel at `(x, y)`, `None` outside the image
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        Some(&mut self.data[start..start + self.channels])
    }

    /// Fill every byte with `value`
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Borrow as a frame with the given encoding
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedChannels`] if the channel count does not
    /// match the encoding's pixel size.
    pub fn as_frame(&self, encoding: PixelEncoding) -> Result<Frame<'_>> {
        if encoding.bytes_per_pixel() != self.channels {
            return Err(Error::UnsupportedChannels(self.channels));
        }
        Frame::new(&self.data, self.width, self.height, encoding)
    }
}
