//! Pixel encodings
//!
//! Frames and background images share one of a small, closed set of pixel
//! layouts. The encoding decides how many bytes a pixel occupies and how
//! many value channels the classifier reads from it.

use std::fmt;

/// Pixel layout of a frame, background or blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelEncoding {
    /// Foreground mask, one byte per pixel; non-zero means foreground.
    /// Carries no pixel values.
    Binary,
    /// 8-bit grayscale
    #[default]
    Gray,
    /// 8-bit per channel, three interleaved channels
    Rgb8,
    /// One byte per pixel, packed as 2 bits red, 3 bits green, 3 bits blue
    R3g3b2,
}

impl PixelEncoding {
    /// Number of bytes each pixel occupies in a buffer
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Binary | Self::Gray | Self::R3g3b2 => 1,
        }
    }

    /// Number of value channels the classifier reads
    ///
    /// Binary masks have no values and report 0.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Binary => 0,
            Self::Gray | Self::R3g3b2 => 1,
            Self::Rgb8 => 3,
        }
    }

    /// Whether pixels of this encoding carry values worth storing
    #[inline]
    pub const fn has_values(self) -> bool {
        self.channels() > 0
    }
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Gray => "gray",
            Self::Rgb8 => "rgb8",
            Self::R3g3b2 => "r3g3b2",
        };
        f.write_str(name)
    }
}

/// Expand a packed 3-3-2 byte into 8-bit channels
///
/// The top two bits scale by 64, the remaining two 3-bit fields by 32.
#[inline]
pub const fn r3g3b2_to_rgb(packed: u8) -> [u8; 3] {
    [
        ((packed >> 6) & 3) * 64,
        ((packed >> 3) & 7) * 32,
        (packed & 7) * 32,
    ]
}

/// Pack 8-bit channels into a 3-3-2 byte
#[inline]
pub const fn rgb_to_r3g3b2(rgb: [u8; 3]) -> u8 {
    ((rgb[0] / 64) << 6) | ((rgb[1] / 32) << 3) | (rgb[2] / 32)
}

/// Gray value of a packed 3-3-2 byte (mean of the expanded channels)
#[inline]
pub const fn r3g3b2_to_gray(packed: u8) -> u8 {
    let [r, g, b] = r3g3b2_to_rgb(packed);
    ((r as u16 + g as u16 + b as u16) / 3) as u8
}
