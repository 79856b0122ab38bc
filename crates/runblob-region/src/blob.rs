//! Blobs
//!
//! A [`Blob`] owns the runs of one connected component together with a
//! copy of their pixel values, so it can outlive the frame it was found
//! in. Bounds, pixel count and center are computed on construction;
//! moments are computed on request.

use crate::background::Background;
use crate::classify::{Classifier, ThresholdCounter};
use crate::error::{RegionError, RegionResult};
use crate::merge::Component;
use runblob_core::{
    BlobId, Bounds, HorizontalLine, Image, PixelEncoding, count_pixels, is_well_ordered,
    r3g3b2_to_gray, r3g3b2_to_rgb,
};
use std::fmt;
use std::ops::BitOr;
use tracing::warn;

/// Status bits of a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlobFlags(u8);

impl BlobFlags {
    /// Produced by splitting a larger blob
    pub const SPLIT: Self = Self(1 << 0);
    /// Marker tag rather than a tracked object
    pub const IS_TAG: Self = Self(1 << 1);
    /// Comes from an instance segmentation
    pub const IS_INSTANCE_SEGMENTATION: Self = Self(1 << 2);
    /// A split was attempted
    pub const TRIED_TO_SPLIT: Self = Self(1 << 3);

    const ALL: u8 = 0x0F;

    /// No flags set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    /// Whether all bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Set or clear the bits of `other`
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for BlobFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Geometry derived from the runs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Properties {
    /// Bounding box
    pub bounds: Bounds,
    /// Σ(x1 - x0 + 1)
    pub num_pixels: u64,
    /// Center of the bounding box
    pub center: (f32, f32),
}

/// Per-pixel weight used for moments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MomentWeighting {
    /// Every pixel counts 1
    #[default]
    Uniform,
    /// Pixels weighted by their luminance
    Intensity,
}

/// Image moments up to order (2, 2)
///
/// Arrays are indexed `[p][q]` for the moment of `x^p * y^q`.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    /// Weighting the moments were computed with
    pub weighting: MomentWeighting,
    /// Raw moments `m[p][q]`
    pub raw: [[f64; 3]; 3],
    /// Central moments `mu[p][q]` around the centroid
    pub central: [[f64; 3]; 3],
    /// Central moments divided by `mu[0][0]`
    pub normalized: [[f64; 3]; 3],
    /// `(m10 / m00, m01 / m00)`
    pub centroid: (f64, f64),
    /// Principal axis angle in radians
    pub orientation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecountCache {
    threshold: i32,
    count: u64,
}

/// A materialized crop and the position of its origin in the frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crop {
    /// Frame coordinates of the image's top-left pixel
    pub offset: (i32, i32),
    /// Cropped raster
    pub image: Image,
}

/// A connected foreground region with owned pixels
#[derive(Debug, Clone)]
pub struct Blob {
    lines: Vec<HorizontalLine>,
    pixels: Option<Vec<u8>>,
    encoding: PixelEncoding,
    flags: BlobFlags,
    parent_id: Option<BlobId>,
    own_id: Option<BlobId>,
    properties: Properties,
    moments: Option<Moments>,
    recount: Option<RecountCache>,
}

impl Blob {
    /// Create a blob from owned runs and optional pixel values
    ///
    /// `pixels` holds the values of every run back to back, in run order.
    /// Runs that are not ordered by (y, x0) or that overlap within a row
    /// are sorted and combined, with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if pixel values are given for an encoding without
    /// values, or if their length does not match the runs.
    pub fn new(
        lines: Vec<HorizontalLine>,
        pixels: Option<Vec<u8>>,
        encoding: PixelEncoding,
    ) -> RegionResult<Self> {
        let bpp = encoding.bytes_per_pixel();
        if let Some(values) = &pixels {
            if !encoding.has_values() {
                return Err(RegionError::UnsupportedEncoding {
                    operation: "pixel values",
                    encoding,
                });
            }
            let expected = count_pixels(&lines) as usize * bpp;
            if values.len() != expected {
                return Err(RegionError::InvalidParameters(format!(
                    "expected {} pixel bytes, got {}",
                    expected,
                    values.len()
                )));
            }
        }

        Ok(Self::assemble(lines, pixels, encoding))
    }

    fn assemble(
        lines: Vec<HorizontalLine>,
        pixels: Option<Vec<u8>>,
        encoding: PixelEncoding,
    ) -> Self {
        let (lines, pixels) = if is_well_ordered(&lines) {
            (lines, pixels)
        } else {
            warn!(runs = lines.len(), "blob runs out of order, repairing");
            repair_lines(lines, pixels, encoding.bytes_per_pixel())
        };

        let mut blob = Self {
            lines,
            pixels,
            encoding,
            flags: BlobFlags::empty(),
            parent_id: None,
            own_id: None,
            properties: Properties::default(),
            moments: None,
            recount: None,
        };
        blob.calculate_properties();
        blob
    }

    /// Geometry-only blob; unordered runs are repaired as in [`Blob::new`]
    pub fn from_lines(lines: Vec<HorizontalLine>) -> Self {
        Self::assemble(lines, None, PixelEncoding::Binary)
    }

    /// Geometry-only blob that remembers the encoding its pixels had
    pub fn from_lines_with_encoding(lines: Vec<HorizontalLine>, encoding: PixelEncoding) -> Self {
        Self::assemble(lines, None, encoding)
    }

    /// Build a blob from a component, copying pixel values out of the frame
    ///
    /// Runs on the same row that touch are combined. Pixel values are
    /// kept only for encodings that carry them.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MissingPixels`] if a pixel slice is shorter
    /// than its run.
    pub fn from_component(component: &Component<'_>, encoding: PixelEncoding) -> RegionResult<Self> {
        let bpp = encoding.bytes_per_pixel();
        let mut lines: Vec<HorizontalLine> = Vec::with_capacity(component.len());
        let mut pixels = encoding
            .has_values()
            .then(|| Vec::with_capacity(component.num_pixels() as usize * bpp));

        for (line, src) in component.lines().iter().zip(component.pixels()) {
            if let Some(buffer) = pixels.as_mut() {
                let n = line.width() as usize * bpp;
                buffer.extend_from_slice(src.get(..n).ok_or(RegionError::MissingPixels)?);
            }
            match lines.last_mut() {
                Some(last) if last.y == line.y && last.x1 as u32 + 1 == line.x0 as u32 => {
                    last.x1 = line.x1;
                }
                _ => lines.push(*line),
            }
        }

        let mut blob = Self::new(lines, pixels, encoding)?;
        blob.parent_id = component.parent_id();
        Ok(blob)
    }

    /// Runs in (y, x0) order
    pub fn lines(&self) -> &[HorizontalLine] {
        &self.lines
    }

    /// Pixel values of all runs back to back, if kept
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// Pixel layout of the values
    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    /// Whether the blob has no runs
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Recompute bounds, pixel count and center
    pub fn calculate_properties(&mut self) {
        let num_pixels = count_pixels(&self.lines);
        let bounds = match (self.lines.first(), self.lines.last()) {
            (Some(first), Some(last)) => {
                let (min_x, max_x) = self
                    .lines
                    .iter()
                    .fold((u16::MAX, 0), |(lo, hi), l| (lo.min(l.x0), hi.max(l.x1)));
                Bounds::from_inclusive(min_x as i32, first.y as i32, max_x as i32, last.y as i32)
            }
            _ => Bounds::default(),
        };
        self.properties = Properties {
            bounds,
            num_pixels,
            center: bounds.center(),
        };
    }

    /// Bounds, pixel count and center
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Bounding box
    pub fn bounds(&self) -> Bounds {
        self.properties.bounds
    }

    /// Σ(x1 - x0 + 1) over all runs
    pub fn num_pixels(&self) -> u64 {
        self.properties.num_pixels
    }

    /// Center of the bounding box
    pub fn center(&self) -> (f32, f32) {
        self.properties.center
    }

    // Pixel values of every run, paired with the run
    pub(crate) fn segments<'s>(
        &'s self,
        pixels: &'s [u8],
    ) -> impl Iterator<Item = (&'s HorizontalLine, &'s [u8])> + 's {
        let bpp = self.encoding.bytes_per_pixel();
        let mut offset = 0;
        self.lines.iter().map(move |line| {
            let n = line.width() as usize * bpp;
            let values = &pixels[offset..offset + n];
            offset += n;
            (line, values)
        })
    }

    fn values(&self) -> RegionResult<&[u8]> {
        self.pixels.as_deref().ok_or(RegionError::MissingPixels)
    }

    /// Compute unweighted moments; does nothing if they already exist
    ///
    /// # Errors
    ///
    /// Returns an error for an empty blob.
    pub fn calculate_moments(&mut self) -> RegionResult<()> {
        self.calculate_moments_with(MomentWeighting::Uniform)
    }

    /// Compute moments with the given weighting
    ///
    /// Idempotent for the same weighting; asking for another weighting
    /// replaces the stored moments.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty blob, a blob whose weights sum to
    /// zero, or [`RegionError::MissingPixels`] for intensity weighting
    /// without pixel values.
    pub fn calculate_moments_with(&mut self, weighting: MomentWeighting) -> RegionResult<()> {
        if self.moments.as_ref().is_some_and(|m| m.weighting == weighting) {
            return Ok(());
        }
        self.moments = Some(self.compute_moments(weighting)?);
        Ok(())
    }

    fn visit_weighted(
        &self,
        weighting: MomentWeighting,
        mut visit: impl FnMut(f64, f64, f64),
    ) -> RegionResult<()> {
        match weighting {
            MomentWeighting::Uniform => {
                for line in &self.lines {
                    for x in line.x0..=line.x1 {
                        visit(x as f64, line.y as f64, 1.0);
                    }
                }
            }
            MomentWeighting::Intensity => {
                let bpp = self.encoding.bytes_per_pixel();
                for (line, values) in self.segments(self.values()?) {
                    for (x, px) in (line.x0..=line.x1).zip(values.chunks_exact(bpp)) {
                        visit(x as f64, line.y as f64, luminance(self.encoding, px) as f64);
                    }
                }
            }
        }
        Ok(())
    }

    fn compute_moments(&self, weighting: MomentWeighting) -> RegionResult<Moments> {
        let mut raw = [[0.0f64; 3]; 3];
        self.visit_weighted(weighting, |x, y, w| {
            let xs = [1.0, x, x * x];
            let ys = [1.0, y, y * y];
            for p in 0..3 {
                for q in 0..3 {
                    raw[p][q] += xs[p] * ys[q] * w;
                }
            }
        })?;

        let m00 = raw[0][0];
        if m00 <= 0.0 {
            return Err(RegionError::InvalidParameters(
                "moments need a non-empty blob with positive weight".to_string(),
            ));
        }
        let centroid = (raw[1][0] / m00, raw[0][1] / m00);

        let mut central = [[0.0f64; 3]; 3];
        self.visit_weighted(weighting, |x, y, w| {
            let dx = x - centroid.0;
            let dy = y - centroid.1;
            let xs = [1.0, dx, dx * dx];
            let ys = [1.0, dy, dy * dy];
            for p in 0..3 {
                for q in 0..3 {
                    central[p][q] += xs[p] * ys[q] * w;
                }
            }
        })?;

        let mut normalized = central;
        for row in normalized.iter_mut() {
            for v in row.iter_mut() {
                *v /= central[0][0];
            }
        }
        let orientation =
            0.5 * (2.0 * normalized[1][1]).atan2(normalized[2][0] - normalized[0][2]);

        Ok(Moments {
            weighting,
            raw,
            central,
            normalized,
            centroid,
            orientation,
        })
    }

    /// Moments, if calculated
    pub fn moments(&self) -> Option<&Moments> {
        self.moments.as_ref()
    }

    /// Intensity or area centroid
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MomentsNotReady`] before
    /// [`Blob::calculate_moments`].
    pub fn centroid(&self) -> RegionResult<(f64, f64)> {
        self.moments
            .as_ref()
            .map(|m| m.centroid)
            .ok_or(RegionError::MomentsNotReady)
    }

    /// Principal axis angle in radians
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MomentsNotReady`] before
    /// [`Blob::calculate_moments`].
    pub fn orientation(&self) -> RegionResult<f64> {
        self.moments
            .as_ref()
            .map(|m| m.orientation)
            .ok_or(RegionError::MomentsNotReady)
    }

    /// Number of pixels that pass an alternative threshold
    ///
    /// The result for the last threshold is cached; calling again with the
    /// same threshold returns it without counting unless `force` is set.
    /// A threshold of 0 returns [`Blob::num_pixels`].
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MissingPixels`] if the blob has no pixel
    /// values, or any error of the counter.
    pub fn recount<C>(&mut self, threshold: i32, counter: &C, force: bool) -> RegionResult<u64>
    where
        C: ThresholdCounter + ?Sized,
    {
        if threshold == 0 {
            return Ok(self.num_pixels());
        }
        if !force
            && let Some(cache) = self.recount
            && cache.threshold == threshold
        {
            return Ok(cache.count);
        }

        let mut count = 0u64;
        for (line, values) in self.segments(self.values()?) {
            count += counter.count_line(self.encoding, line, values, threshold)? as u64;
        }
        self.recount = Some(RecountCache { threshold, count });
        Ok(count)
    }

    /// Threshold of the last counting [`Blob::recount`]
    pub fn last_recount_threshold(&self) -> Option<i32> {
        self.recount.map(|c| c.threshold)
    }

    /// Status bits
    pub fn flags(&self) -> BlobFlags {
        self.flags
    }

    /// Replace all status bits
    pub fn set_flags(&mut self, flags: BlobFlags) {
        self.flags = flags;
    }

    /// Produced by splitting a larger blob
    pub fn is_split(&self) -> bool {
        self.flags.contains(BlobFlags::SPLIT)
    }

    /// Marker tag
    pub fn is_tag(&self) -> bool {
        self.flags.contains(BlobFlags::IS_TAG)
    }

    /// Set the tag flag
    pub fn set_tag(&mut self, value: bool) {
        self.flags.set(BlobFlags::IS_TAG, value);
    }

    /// From an instance segmentation
    pub fn is_instance_segmentation(&self) -> bool {
        self.flags.contains(BlobFlags::IS_INSTANCE_SEGMENTATION)
    }

    /// Set the instance segmentation flag
    pub fn set_instance_segmentation(&mut self, value: bool) {
        self.flags.set(BlobFlags::IS_INSTANCE_SEGMENTATION, value);
    }

    /// A split was attempted
    pub fn tried_to_split(&self) -> bool {
        self.flags.contains(BlobFlags::TRIED_TO_SPLIT)
    }

    /// Set the tried-to-split flag
    pub fn set_tried_to_split(&mut self, value: bool) {
        self.flags.set(BlobFlags::TRIED_TO_SPLIT, value);
    }

    /// Identity of the blob this one was split from
    pub fn parent_id(&self) -> Option<BlobId> {
        self.parent_id
    }

    /// Record the blob this one was split from
    pub fn set_parent_id(&mut self, parent: Option<BlobId>) {
        self.parent_id = parent;
    }

    /// Mark or unmark this blob as split off `parent`
    ///
    /// The recorded parent is the parent's own parent if it has one, so
    /// repeated splits always point at the original blob. Tag and instance
    /// segmentation flags are inherited from the parent.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MissingParent`] when `split` is set without a
    /// parent that has an identity.
    pub fn set_split(&mut self, split: bool, parent: Option<&Blob>) -> RegionResult<()> {
        let parent_id = parent.and_then(|p| p.parent_id.or_else(|| p.compute_id()));
        if split {
            let (parent, parent_id) = parent
                .zip(parent_id)
                .ok_or(RegionError::MissingParent)?;
            self.flags.set(BlobFlags::IS_TAG, parent.is_tag());
            self.flags
                .set(BlobFlags::IS_INSTANCE_SEGMENTATION, parent.is_instance_segmentation());
            self.parent_id = Some(parent_id);
        } else {
            self.parent_id = parent_id;
        }
        self.flags.set(BlobFlags::SPLIT, split);
        Ok(())
    }

    /// Identity computed from the current geometry, bypassing the cache
    pub fn compute_id(&self) -> Option<BlobId> {
        BlobId::from_lines(&self.lines)
    }

    /// Identity, computed on first use and cached
    pub fn blob_id(&mut self) -> Option<BlobId> {
        if self.own_id.is_none() {
            self.own_id = self.compute_id();
        }
        self.own_id
    }

    /// Cached identity without computing it
    pub fn cached_id(&self) -> Option<BlobId> {
        self.own_id
    }

    /// Recompute and cache the identity
    pub fn reset_id(&mut self) -> Option<BlobId> {
        self.own_id = self.compute_id();
        self.own_id
    }

    /// Shift the blob by `(dx, dy)`
    ///
    /// Runs are clipped at 0 (and at `u16::MAX`) together with their pixel
    /// values; runs that leave the coordinate range entirely are dropped.
    /// Properties are recomputed, moments too if they existed. The id
    /// cache and the recount cache are dropped.
    pub fn add_offset(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        let bpp = self.encoding.bytes_per_pixel();
        let limit = u16::MAX as i32;
        let old_pixels = self.pixels.take();
        let mut pixels = old_pixels.as_ref().map(|p| Vec::with_capacity(p.len()));
        let mut lines = Vec::with_capacity(self.lines.len());
        let mut offset = 0;
        let mut dropped = 0usize;

        for line in &self.lines {
            let width = line.width() as usize;
            let (y, x0, x1) = (
                line.y as i32 + dy,
                line.x0 as i32 + dx,
                line.x1 as i32 + dx,
            );
            if (0..=limit).contains(&y) && x1 >= 0 && x0 <= limit {
                let (cx0, cx1) = (x0.max(0), x1.min(limit));
                lines.push(HorizontalLine::new(y as u16, cx0 as u16, cx1 as u16));
                if let (Some(out), Some(src)) = (pixels.as_mut(), old_pixels.as_ref()) {
                    let from = offset + (cx0 - x0) as usize * bpp;
                    let to = offset + (cx1 - x0 + 1) as usize * bpp;
                    out.extend_from_slice(&src[from..to]);
                }
            } else {
                dropped += 1;
            }
            offset += width * bpp;
        }
        if dropped > 0 {
            warn!(dx, dy, dropped, "offset moved runs out of range");
        }

        self.lines = lines;
        self.pixels = pixels;
        self.own_id = None;
        self.recount = None;
        self.calculate_properties();
        if let Some(previous) = self.moments.take() {
            self.moments = self.compute_moments(previous.weighting).ok();
        }
    }

    /// Approximate heap and inline size in bytes
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.lines.capacity() * std::mem::size_of::<HorizontalLine>()
            + self.pixels.as_ref().map_or(0, Vec::capacity)
    }

    fn crop_area(&self, padding: u16, limits: Option<Bounds>) -> RegionResult<Bounds> {
        if self.is_empty() {
            return Err(RegionError::EmptyCrop);
        }
        let limits = limits.unwrap_or(Bounds::new_unchecked(0, 0, i32::MAX, i32::MAX));
        let area = self.bounds().expand(padding as i32).restrict_to(&limits);
        if area.is_empty() {
            return Err(RegionError::EmptyCrop);
        }
        Ok(area)
    }

    fn visit_differences(
        &self,
        classifier: &Classifier<'_>,
        mut visit: impl FnMut(u16, u16, &[u8], i32, bool),
    ) -> RegionResult<()> {
        let bpp = self.encoding.bytes_per_pixel();
        let threshold = classifier.config().threshold;
        for (line, values) in self.segments(self.values()?) {
            classifier.scan_line(self.encoding, line, values, threshold, |i, diff, fg| {
                let px = &values[i * bpp..(i + 1) * bpp];
                visit(line.x0 + i as u16, line.y, px, diff, fg)
            })?;
        }
        Ok(())
    }

    /// Raw pixel values inside the bounding box grown by `padding`
    ///
    /// With a background, the crop is clipped to it and pixels outside the
    /// blob show the background; without one they are 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob has no pixels, lies outside the
    /// background, or uses another encoding than the background.
    pub fn image(&self, background: Option<&Background>, padding: u16) -> RegionResult<Crop> {
        let pixels = self.values()?;
        let bpp = self.encoding.bytes_per_pixel();
        let area = self.crop_area(padding, background.map(Background::bounds))?;
        let mut image = Image::new(area.w as u32, area.h as u32, bpp)?;

        if let Some(bg) = background {
            if bg.encoding() != self.encoding {
                return Err(RegionError::EncodingMismatch {
                    background: bg.encoding(),
                    input: self.encoding,
                });
            }
            let stride = area.w as usize * bpp;
            for (r, row) in image.data_mut().chunks_exact_mut(stride).enumerate() {
                let src = bg.row_from(area.x as u32, (area.y + r as i32) as u32);
                row.copy_from_slice(&src[..stride]);
            }
        }

        for (line, values) in self.segments(pixels) {
            for (i, px) in values.chunks_exact(bpp).enumerate() {
                if let Some(dst) = pixel_in(&mut image, &area, line.x0 as i32 + i as i32, line.y)
                {
                    dst.copy_from_slice(px);
                }
            }
        }
        Ok(Crop {
            offset: (area.x, area.y),
            image,
        })
    }

    /// Difference magnitudes of foreground pixels, 1 channel
    ///
    /// # Errors
    ///
    /// Returns an error if the blob has no pixels or does not fit the
    /// classifier's background.
    pub fn difference_image(&self, classifier: &Classifier<'_>, padding: u16) -> RegionResult<Crop> {
        self.render(classifier, padding, 1, |dst, _, diff| {
            dst[0] = diff.clamp(0, 255) as u8;
        })
    }

    /// Original values of foreground pixels only
    ///
    /// # Errors
    ///
    /// See [`Blob::difference_image`].
    pub fn thresholded_image(&self, classifier: &Classifier<'_>, padding: u16) -> RegionResult<Crop> {
        let bpp = self.encoding.bytes_per_pixel();
        self.render(classifier, padding, bpp, |dst, px, _| {
            dst.copy_from_slice(px);
        })
    }

    /// 0/255 mask of foreground pixels
    ///
    /// # Errors
    ///
    /// See [`Blob::difference_image`].
    pub fn binary_image(&self, classifier: &Classifier<'_>, padding: u16) -> RegionResult<Crop> {
        self.render(classifier, padding, 1, |dst, _, _| dst[0] = 255)
    }

    /// RGBA crop: color of foreground pixels with their difference as opacity
    ///
    /// Opacity is stretched so that 60% of the strongest difference is
    /// already fully opaque.
    ///
    /// # Errors
    ///
    /// See [`Blob::difference_image`].
    pub fn alpha_image(&self, classifier: &Classifier<'_>, padding: u16) -> RegionResult<Crop> {
        let encoding = self.encoding;
        let mut maximum = 0i32;
        let mut crop = self.render(classifier, padding, 4, |dst, px, diff| {
            dst[..3].copy_from_slice(&to_rgb(encoding, px));
            dst[3] = diff.clamp(0, 255) as u8;
            maximum = maximum.max(diff);
        })?;
        if maximum > 0 {
            let scale = 255.0 / (maximum as f32 * 0.6);
            for px in crop.image.data_mut().chunks_exact_mut(4) {
                px[3] = (px[3] as f32 * scale).min(255.0) as u8;
            }
        }
        Ok(crop)
    }

    /// Luminance plus difference-derived alpha, 2 channels
    ///
    /// # Errors
    ///
    /// See [`Blob::difference_image`].
    pub fn luminance_alpha_image(&self, classifier: &Classifier<'_>, padding: u16) -> RegionResult<Crop> {
        let encoding = self.encoding;
        self.render(classifier, padding, 2, |dst, px, diff| {
            dst[0] = luminance(encoding, px);
            dst[1] = saturate((difference_alpha(diff) * 2) as f64);
        })
    }

    /// Luminance stretched into `[minimum, maximum]` plus alpha, 2 channels
    ///
    /// The lower bound is halved before stretching; if `maximum` is not
    /// positive or equals it, luminance is copied unchanged.
    ///
    /// # Errors
    ///
    /// See [`Blob::difference_image`].
    pub fn equalized_luminance_alpha_image(
        &self,
        classifier: &Classifier<'_>,
        minimum: f32,
        maximum: f32,
        padding: u16,
    ) -> RegionResult<Crop> {
        let mut minimum = minimum * 0.5;
        let factor = if maximum > 0.0 && maximum != minimum {
            255.0 / ((maximum - minimum) * 0.5)
        } else {
            minimum = 0.0;
            1.0
        };
        let encoding = self.encoding;
        self.render(classifier, padding, 2, |dst, px, diff| {
            dst[0] = saturate(((luminance(encoding, px) as f32 - minimum) * factor) as f64);
            dst[1] = saturate(difference_alpha(diff) as f64);
        })
    }

    /// 0/255 mask of every run, no classification
    ///
    /// The crop is only clipped at 0.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::EmptyCrop`] for an empty blob.
    pub fn binary_mask(&self, padding: u16) -> RegionResult<Crop> {
        let area = self.crop_area(padding, None)?;
        let mut image = Image::new(area.w as u32, area.h as u32, 1)?;
        for line in &self.lines {
            for x in line.x0..=line.x1 {
                if let Some(dst) = pixel_in(&mut image, &area, x as i32, line.y) {
                    dst[0] = 255;
                }
            }
        }
        Ok(Crop {
            offset: (area.x, area.y),
            image,
        })
    }

    fn render(
        &self,
        classifier: &Classifier<'_>,
        padding: u16,
        channels: usize,
        mut paint: impl FnMut(&mut [u8], &[u8], i32),
    ) -> RegionResult<Crop> {
        let area = self.crop_area(padding, Some(classifier.background().bounds()))?;
        let mut image = Image::new(area.w as u32, area.h as u32, channels)?;
        self.visit_differences(classifier, |x, y, px, diff, fg| {
            if fg && let Some(dst) = pixel_in(&mut image, &area, x as i32, y) {
                paint(dst, px, diff);
            }
        })?;
        Ok(Crop {
            offset: (area.x, area.y),
            image,
        })
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (cx, cy) = self.center();
        match self.own_id.or_else(|| self.compute_id()) {
            Some(id) => write!(f, "{} [{:.0},{:.0}]", id, cx, cy),
            None => write!(f, "null [{:.0},{:.0}]", cx, cy),
        }
    }
}

fn pixel_in<'i>(image: &'i mut Image, area: &Bounds, x: i32, y: u16) -> Option<&'i mut [u8]> {
    let (lx, ly) = (x - area.x, y as i32 - area.y);
    if lx < 0 || ly < 0 {
        return None;
    }
    image.pixel_mut(lx as u32, ly as u32)
}

fn saturate(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// `255 - (1 - d/255)^2 * 255`, truncated
fn difference_alpha(diff: i32) -> i32 {
    let d = 1.0 - diff as f64 / 255.0;
    (255.0 - d * d * 255.0) as i32
}

fn luminance(encoding: PixelEncoding, px: &[u8]) -> u8 {
    match encoding {
        PixelEncoding::Binary => 255,
        PixelEncoding::Gray => px[0],
        PixelEncoding::Rgb8 => ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8,
        PixelEncoding::R3g3b2 => r3g3b2_to_gray(px[0]),
    }
}

fn to_rgb(encoding: PixelEncoding, px: &[u8]) -> [u8; 3] {
    match encoding {
        PixelEncoding::Binary => [255; 3],
        PixelEncoding::Gray => [px[0]; 3],
        PixelEncoding::Rgb8 => [px[0], px[1], px[2]],
        PixelEncoding::R3g3b2 => r3g3b2_to_rgb(px[0]),
    }
}

/// Sort runs, combine overlapping or touching runs of a row and keep the
/// pixel values aligned. Where runs overlap the earlier values win.
fn repair_lines(
    lines: Vec<HorizontalLine>,
    pixels: Option<Vec<u8>>,
    bpp: usize,
) -> (Vec<HorizontalLine>, Option<Vec<u8>>) {
    let mut offset = 0;
    let mut order: Vec<(HorizontalLine, usize)> = lines
        .iter()
        .map(|line| {
            let start = offset;
            offset += line.width() as usize * bpp;
            (*line, start)
        })
        .collect();
    order.sort_by_key(|&(line, _)| line);

    let mut out_lines: Vec<HorizontalLine> = Vec::with_capacity(lines.len());
    let mut out_pixels = pixels.as_ref().map(|p| Vec::with_capacity(p.len()));

    for (line, start) in order {
        let (copy_from, extends) = match out_lines.last_mut() {
            Some(last) if last.y == line.y && line.x0 as u32 <= last.x1 as u32 + 1 => {
                if line.x1 <= last.x1 {
                    continue;
                }
                let skip = (last.x1 as usize + 1).saturating_sub(line.x0 as usize);
                last.x1 = line.x1;
                (start + skip * bpp, true)
            }
            _ => (start, false),
        };
        if !extends {
            out_lines.push(line);
        }
        if let (Some(out), Some(src)) = (out_pixels.as_mut(), pixels.as_ref()) {
            let end = start + line.width() as usize * bpp;
            out.extend_from_slice(&src[copy_from..end]);
        }
    }
    (out_lines, out_pixels)
}
