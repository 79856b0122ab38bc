//! Foreground classification
//!
//! A pixel is foreground when its difference from the background reaches
//! `multiplier(x, y) * threshold`. The difference depends on the pixel
//! encoding and the [`DifferenceMethod`].
//!
//! Every entry point resolves the (encoding, method, grid) combination
//! once, with a `match`, and then runs a row loop monomorphized for that
//! combination. The per-pixel loop never looks at the tags again and never
//! touches the threshold grid when none is configured.

use crate::background::{Background, DifferenceMethod};
use crate::error::{RegionError, RegionResult};
use runblob_core::{HorizontalLine, PixelEncoding, r3g3b2_to_gray};

/// Reads pixel bytes of one encoding and computes their difference
trait PixelReader {
    const BYTES: usize;
    /// Input without values: every pixel is foreground
    const EVERYTHING: bool = false;

    fn difference<M: DiffMethod>(reference: &[u8], value: &[u8]) -> i32;
}

/// Difference semantics
trait DiffMethod {
    fn apply(reference: i32, value: i32) -> i32;
}

/// Threshold test for one row
trait RowThreshold {
    fn passes(&self, index: usize, diff: i32) -> bool;
}

struct NoPixels;
struct GrayPixels;
struct RgbPixels;
struct PackedPixels;

impl PixelReader for NoPixels {
    const BYTES: usize = 1;
    const EVERYTHING: bool = true;

    #[inline(always)]
    fn difference<M: DiffMethod>(_: &[u8], _: &[u8]) -> i32 {
        u8::MAX as i32
    }
}

impl PixelReader for GrayPixels {
    const BYTES: usize = 1;

    #[inline(always)]
    fn difference<M: DiffMethod>(reference: &[u8], value: &[u8]) -> i32 {
        M::apply(reference[0] as i32, value[0] as i32)
    }
}

impl PixelReader for RgbPixels {
    const BYTES: usize = 3;

    #[inline(always)]
    fn difference<M: DiffMethod>(reference: &[u8], value: &[u8]) -> i32 {
        // foreground as soon as any channel differs enough
        M::apply(reference[0] as i32, value[0] as i32)
            .max(M::apply(reference[1] as i32, value[1] as i32))
            .max(M::apply(reference[2] as i32, value[2] as i32))
    }
}

impl PixelReader for PackedPixels {
    const BYTES: usize = 1;

    #[inline(always)]
    fn difference<M: DiffMethod>(reference: &[u8], value: &[u8]) -> i32 {
        M::apply(
            r3g3b2_to_gray(reference[0]) as i32,
            r3g3b2_to_gray(value[0]) as i32,
        )
    }
}

struct AbsoluteDiff;
struct SignDiff;
struct NoDiff;

impl DiffMethod for AbsoluteDiff {
    #[inline(always)]
    fn apply(reference: i32, value: i32) -> i32 {
        (reference - value).abs()
    }
}

impl DiffMethod for SignDiff {
    #[inline(always)]
    fn apply(reference: i32, value: i32) -> i32 {
        (reference - value).max(0)
    }
}

impl DiffMethod for NoDiff {
    #[inline(always)]
    fn apply(_: i32, value: i32) -> i32 {
        value
    }
}

struct Flat(i32);

struct Scaled<'g> {
    multipliers: &'g [f32],
    threshold: f32,
}

impl RowThreshold for Flat {
    #[inline(always)]
    fn passes(&self, _: usize, diff: i32) -> bool {
        diff >= self.0
    }
}

impl RowThreshold for Scaled<'_> {
    #[inline(always)]
    fn passes(&self, index: usize, diff: i32) -> bool {
        diff as f32 >= self.multipliers[index] * self.threshold
    }
}

/// One validated row segment ready for scanning
struct RowScan<'r> {
    reference: &'r [u8],
    values: &'r [u8],
    multipliers: Option<&'r [f32]>,
    threshold: i32,
    len: usize,
}

#[inline(always)]
fn scan_row<R, M, T, S>(scan: &RowScan<'_>, threshold: &T, mut sink: S)
where
    R: PixelReader,
    M: DiffMethod,
    T: RowThreshold,
    S: FnMut(usize, i32, bool),
{
    if R::EVERYTHING {
        for i in 0..scan.len {
            sink(i, u8::MAX as i32, true);
        }
        return;
    }
    let pairs = scan
        .reference
        .chunks_exact(R::BYTES)
        .zip(scan.values.chunks_exact(R::BYTES))
        .take(scan.len);
    for (i, (reference, value)) in pairs.enumerate() {
        let diff = R::difference::<M>(reference, value);
        sink(i, diff, threshold.passes(i, diff));
    }
}

fn scan_with_method<R, M, S>(scan: &RowScan<'_>, sink: S)
where
    R: PixelReader,
    M: DiffMethod,
    S: FnMut(usize, i32, bool),
{
    match scan.multipliers {
        Some(multipliers) => {
            let threshold = Scaled {
                multipliers,
                threshold: scan.threshold as f32,
            };
            scan_row::<R, M, _, S>(scan, &threshold, sink)
        }
        None => scan_row::<R, M, _, S>(scan, &Flat(scan.threshold), sink),
    }
}

fn scan_with_reader<R, S>(method: DifferenceMethod, scan: &RowScan<'_>, sink: S)
where
    R: PixelReader,
    S: FnMut(usize, i32, bool),
{
    match method {
        DifferenceMethod::Absolute => scan_with_method::<R, AbsoluteDiff, S>(scan, sink),
        DifferenceMethod::Sign => scan_with_method::<R, SignDiff, S>(scan, sink),
        DifferenceMethod::None => scan_with_method::<R, NoDiff, S>(scan, sink),
    }
}

fn dispatch<S>(input: PixelEncoding, method: DifferenceMethod, scan: &RowScan<'_>, sink: S)
where
    S: FnMut(usize, i32, bool),
{
    match input {
        PixelEncoding::Binary => scan_with_reader::<NoPixels, S>(method, scan, sink),
        PixelEncoding::Gray => scan_with_reader::<GrayPixels, S>(method, scan, sink),
        PixelEncoding::Rgb8 => scan_with_reader::<RgbPixels, S>(method, scan, sink),
        PixelEncoding::R3g3b2 => scan_with_reader::<PackedPixels, S>(method, scan, sink),
    }
}

/// Difference method and global threshold used by a [`Classifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Difference semantics
    pub method: DifferenceMethod,
    /// Global threshold, scaled per pixel by the background's grid
    pub threshold: i32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            method: DifferenceMethod::Absolute,
            threshold: 15,
        }
    }
}

impl ClassifierConfig {
    /// Create a configuration
    pub fn new(method: DifferenceMethod, threshold: i32) -> Self {
        Self { method, threshold }
    }

    /// Set the difference method
    pub fn with_method(mut self, method: DifferenceMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the global threshold
    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Classifies pixels against a [`Background`]
///
/// Holds only shared references, so one classifier can be used from many
/// extraction workers at once.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'b> {
    background: &'b Background,
    config: ClassifierConfig,
}

impl<'b> Classifier<'b> {
    /// Create a classifier
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is negative.
    pub fn new(background: &'b Background, config: ClassifierConfig) -> RegionResult<Self> {
        if config.threshold < 0 {
            return Err(RegionError::InvalidParameters(format!(
                "threshold must be non-negative, got {}",
                config.threshold
            )));
        }
        Ok(Self { background, config })
    }

    /// Background model
    pub fn background(&self) -> &'b Background {
        self.background
    }

    /// Configuration
    pub fn config(&self) -> ClassifierConfig {
        self.config
    }

    /// Check that input pixels can be compared against the background
    ///
    /// Inputs without values (binary masks) are always accepted; every
    /// other encoding must match the background's.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::EncodingMismatch`] otherwise.
    pub fn check_input(&self, input: PixelEncoding) -> RegionResult<()> {
        if input.has_values() && input != self.background.encoding() {
            return Err(RegionError::EncodingMismatch {
                background: self.background.encoding(),
                input,
            });
        }
        Ok(())
    }

    fn prepare<'r>(
        &'r self,
        input: PixelEncoding,
        y: u16,
        x0: u16,
        x1: u16,
        values: &'r [u8],
        threshold: i32,
    ) -> RegionResult<RowScan<'r>> {
        self.check_input(input)?;
        let bg = self.background.bounds();
        if y as i32 >= bg.h {
            return Err(runblob_core::Error::IndexOutOfBounds {
                index: y as usize,
                len: bg.h as usize,
            }
            .into());
        }
        if x0 > x1 || x1 as i32 >= bg.w {
            return Err(runblob_core::Error::IndexOutOfBounds {
                index: x1 as usize,
                len: bg.w as usize,
            }
            .into());
        }
        let len = (x1 - x0) as usize + 1;
        let needed = if input.has_values() {
            len * input.bytes_per_pixel()
        } else {
            0
        };
        if values.len() < needed {
            return Err(runblob_core::Error::BufferTooSmall {
                expected: needed,
                actual: values.len(),
            }
            .into());
        }
        Ok(RowScan {
            reference: self.background.row_from(x0 as u32, y as u32),
            values,
            multipliers: self
                .background
                .grid()
                .map(|grid| grid.row_from(x0 as u32, y as u32)),
            threshold,
            len,
        })
    }

    /// Difference magnitude of one pixel in the background's encoding
    ///
    /// # Errors
    ///
    /// Returns an error if `(x, y)` lies outside the background or `value`
    /// holds fewer bytes than one pixel.
    pub fn difference(&self, x: u16, y: u16, value: &[u8]) -> RegionResult<i32> {
        let encoding = self.background.encoding();
        let scan = self.prepare(encoding, y, x, x, value, self.config.threshold)?;
        let mut out = 0;
        dispatch(encoding, self.config.method, &scan, |_, diff, _| out = diff);
        Ok(out)
    }

    /// Whether one pixel is foreground
    ///
    /// # Errors
    ///
    /// Same as [`Classifier::difference`].
    pub fn classify(&self, x: u16, y: u16, value: &[u8]) -> RegionResult<bool> {
        let diff = self.difference(x, y, value)?;
        Ok(self.is_value_different(x, y, diff))
    }

    /// Whether a precomputed difference passes the threshold at `(x, y)`
    pub fn is_value_different(&self, x: u16, y: u16, diff: i32) -> bool {
        match self.background.grid() {
            Some(grid) => {
                let multiplier = grid.multiplier(x as u32, y as u32).unwrap_or(1.0);
                diff as f32 >= multiplier * self.config.threshold as f32
            }
            None => diff >= self.config.threshold,
        }
    }

    /// Count foreground pixels of the row segment `[x0, x1]` on row `y`
    ///
    /// `values` holds the observed pixels of that segment in `input`
    /// encoding. Uses the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns an error for mismatched encodings, out-of-range coordinates
    /// or a too-short `values` slice.
    pub fn count_above_threshold(
        &self,
        input: PixelEncoding,
        y: u16,
        x0: u16,
        x1: u16,
        values: &[u8],
    ) -> RegionResult<u32> {
        self.count_with_threshold(input, y, x0, x1, values, self.config.threshold)
    }

    /// [`Classifier::count_above_threshold`] with an explicit threshold
    pub fn count_with_threshold(
        &self,
        input: PixelEncoding,
        y: u16,
        x0: u16,
        x1: u16,
        values: &[u8],
        threshold: i32,
    ) -> RegionResult<u32> {
        let scan = self.prepare(input, y, x0, x1, values, threshold)?;
        let mut count = 0u32;
        dispatch(input, self.config.method, &scan, |_, _, fg| {
            count += fg as u32
        });
        Ok(count)
    }

    /// Visit every pixel of a run with its difference and decision
    ///
    /// `threshold` overrides the configured one.
    pub(crate) fn scan_line<S>(
        &self,
        input: PixelEncoding,
        line: &HorizontalLine,
        values: &[u8],
        threshold: i32,
        sink: S,
    ) -> RegionResult<()>
    where
        S: FnMut(usize, i32, bool),
    {
        let scan = self.prepare(input, line.y, line.x0, line.x1, values, threshold)?;
        dispatch(input, self.config.method, &scan, sink);
        Ok(())
    }
}

/// Row-level foreground decisions for the run extractor
pub trait RowClassifier: Sync {
    /// Fill `mask[x]` for every pixel of row `y`
    ///
    /// `row` holds the whole row in `input` encoding; `mask` has one entry
    /// per column.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` cannot be classified by this classifier.
    fn classify_row(
        &self,
        input: PixelEncoding,
        y: u16,
        row: &[u8],
        mask: &mut [bool],
    ) -> RegionResult<()>;
}

impl RowClassifier for Classifier<'_> {
    fn classify_row(
        &self,
        input: PixelEncoding,
        y: u16,
        row: &[u8],
        mask: &mut [bool],
    ) -> RegionResult<()> {
        if mask.is_empty() {
            return Ok(());
        }
        let x1 = u16::try_from(mask.len() - 1).map_err(|_| {
            RegionError::InvalidParameters(format!("row too wide: {}", mask.len()))
        })?;
        let scan = self.prepare(input, y, 0, x1, row, self.config.threshold)?;
        dispatch(input, self.config.method, &scan, |i, _, fg| mask[i] = fg);
        Ok(())
    }
}

/// Classifies a frame on its own: any non-zero channel is foreground
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskClassifier;

impl RowClassifier for MaskClassifier {
    fn classify_row(
        &self,
        input: PixelEncoding,
        _y: u16,
        row: &[u8],
        mask: &mut [bool],
    ) -> RegionResult<()> {
        match input.bytes_per_pixel() {
            1 => {
                for (m, &v) in mask.iter_mut().zip(row) {
                    *m = v != 0;
                }
            }
            bpp => {
                for (m, px) in mask.iter_mut().zip(row.chunks_exact(bpp)) {
                    *m = px.iter().any(|&v| v != 0);
                }
            }
        }
        Ok(())
    }
}

/// Classifiers that can count foreground pixels of a stored run
///
/// Used by blob recounting; implemented by [`Classifier`].
pub trait ThresholdCounter {
    /// Count pixels of `line` whose difference reaches `threshold`
    ///
    /// # Errors
    ///
    /// Implementation-defined; see [`Classifier::count_with_threshold`].
    fn count_line(
        &self,
        input: PixelEncoding,
        line: &HorizontalLine,
        values: &[u8],
        threshold: i32,
    ) -> RegionResult<u32>;
}

impl ThresholdCounter for Classifier<'_> {
    fn count_line(
        &self,
        input: PixelEncoding,
        line: &HorizontalLine,
        values: &[u8],
        threshold: i32,
    ) -> RegionResult<u32> {
        self.count_with_threshold(input, line.y, line.x0, line.x1, values, threshold)
    }
}
