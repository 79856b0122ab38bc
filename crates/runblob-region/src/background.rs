//! Background model
//!
//! A [`Background`] is the read-only reference the classifier compares
//! frames against: an image in the frame's encoding plus an optional grid
//! of per-pixel threshold multipliers. Building the model (averaging sample
//! frames and so on) happens elsewhere; this crate only consumes it.

use crate::error::{RegionError, RegionResult};
use runblob_core::{Bounds, Image, PixelEncoding};

/// How the observed value is compared against the background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DifferenceMethod {
    /// `|background - value|`
    #[default]
    Absolute,
    /// `max(0, background - value)`: only pixels darker than the background
    Sign,
    /// The observed value itself, for plain brightness thresholding
    None,
}

/// Per-pixel multipliers applied to the global threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdGrid {
    width: u32,
    height: u32,
    multipliers: Vec<f32>,
}

impl ThresholdGrid {
    /// Create a grid from row-major multipliers
    ///
    /// # Errors
    ///
    /// Returns an error if `multipliers.len() != width * height`.
    pub fn new(width: u32, height: u32, multipliers: Vec<f32>) -> RegionResult<Self> {
        let expected = width as usize * height as usize;
        if multipliers.len() != expected {
            return Err(RegionError::InvalidParameters(format!(
                "threshold grid needs {} multipliers, got {}",
                expected,
                multipliers.len()
            )));
        }
        Ok(Self {
            width,
            height,
            multipliers,
        })
    }

    /// Grid with the same multiplier everywhere
    pub fn uniform(width: u32, height: u32, multiplier: f32) -> Self {
        Self {
            width,
            height,
            multipliers: vec![multiplier; width as usize * height as usize],
        }
    }

    /// Get the width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Multiplier at `(x, y)`, `None` outside the grid
    pub fn multiplier(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.multipliers[y as usize * self.width as usize + x as usize])
    }

    /// Multipliers of row `y` starting at column `x0`
    pub(crate) fn row_from(&self, x0: u32, y: u32) -> &[f32] {
        let start = y as usize * self.width as usize;
        &self.multipliers[start + x0 as usize..start + self.width as usize]
    }
}

/// Reference image plus optional adaptive threshold grid
#[derive(Debug, Clone)]
pub struct Background {
    image: Image,
    encoding: PixelEncoding,
    grid: Option<ThresholdGrid>,
}

impl Background {
    /// Create a background model from a reference image
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::UnsupportedEncoding`] for binary masks and
    /// an error if the image's channel count does not fit the encoding.
    pub fn new(image: Image, encoding: PixelEncoding) -> RegionResult<Self> {
        if !encoding.has_values() {
            return Err(RegionError::UnsupportedEncoding {
                operation: "background model",
                encoding,
            });
        }
        if image.channels() != encoding.bytes_per_pixel() {
            return Err(runblob_core::Error::UnsupportedChannels(image.channels()).into());
        }
        Ok(Self {
            image,
            encoding,
            grid: None,
        })
    }

    /// Attach an adaptive threshold grid
    ///
    /// # Errors
    ///
    /// Returns an error if the grid does not match the image dimensions.
    pub fn with_grid(mut self, grid: ThresholdGrid) -> RegionResult<Self> {
        if grid.width() != self.image.width() || grid.height() != self.image.height() {
            return Err(runblob_core::Error::DimensionMismatch {
                expected: (self.image.width(), self.image.height()),
                actual: (grid.width(), grid.height()),
            }
            .into());
        }
        self.grid = Some(grid);
        Ok(self)
    }

    /// Reference image
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Pixel layout of the reference image
    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    /// Adaptive threshold grid, if configured
    pub fn grid(&self) -> Option<&ThresholdGrid> {
        self.grid.as_ref()
    }

    /// Image rectangle
    pub fn bounds(&self) -> Bounds {
        self.image.bounds()
    }

    /// Threshold multiplier at `(x, y)`; 1 without a grid
    pub fn multiplier(&self, x: u32, y: u32) -> f32 {
        self.grid
            .as_ref()
            .and_then(|g| g.multiplier(x, y))
            .unwrap_or(1.0)
    }

    /// Reference bytes of row `y` from column `x0` to the row end
    pub(crate) fn row_from(&self, x0: u32, y: u32) -> &[u8] {
        let bpp = self.encoding.bytes_per_pixel();
        let stride = self.image.width() as usize * bpp;
        let start = y as usize * stride;
        &self.image.data()[start + x0 as usize * bpp..start + stride]
    }
}
