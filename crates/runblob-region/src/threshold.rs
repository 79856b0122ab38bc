//! Re-thresholding and splitting of blobs
//!
//! A blob found at one threshold can be tightened afterwards: its stored
//! pixels are classified again at a stricter threshold, and the surviving
//! pixels are optionally relabeled into separate pieces.

use crate::blob::Blob;
use crate::classify::Classifier;
use crate::error::{RegionError, RegionResult};
use crate::label::{ConnectivityType, label_components};
use crate::source::Source;
use runblob_core::HorizontalLine;
use std::ops::RangeInclusive;
use tracing::debug;

impl Blob {
    /// Keep only the pixels whose difference reaches `threshold`
    ///
    /// The result keeps flags and parent of this blob. It may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MissingPixels`] if the blob has no pixel
    /// values, or an error if it does not fit the classifier's background.
    pub fn threshold(&self, classifier: &Classifier<'_>, threshold: i32) -> RegionResult<Blob> {
        let pixels = self.pixels().ok_or(RegionError::MissingPixels)?;
        let encoding = self.encoding();
        let bpp = encoding.bytes_per_pixel();
        let mut lines: Vec<HorizontalLine> = Vec::new();
        let mut values = Vec::new();

        for (line, src) in self.segments(pixels) {
            classifier.scan_line(encoding, line, src, threshold, |i, _, foreground| {
                if !foreground {
                    return;
                }
                let x = line.x0 + i as u16;
                match lines.last_mut() {
                    Some(last) if last.y == line.y && last.x1 as u32 + 1 == x as u32 => {
                        last.x1 = x;
                    }
                    _ => lines.push(HorizontalLine::new(line.y, x, x)),
                }
                values.extend_from_slice(&src[i * bpp..(i + 1) * bpp]);
            })?;
        }

        let mut out = Blob::new(lines, Some(values), encoding)?;
        out.set_flags(self.flags());
        out.set_parent_id(self.parent_id());
        Ok(out)
    }

    /// Split into the connected pieces that survive `threshold`
    ///
    /// Every piece is marked split with this blob as parent; pieces whose
    /// pixel count falls outside `sizes` are discarded. This blob is marked
    /// as tried to split, whatever the outcome.
    ///
    /// # Errors
    ///
    /// See [`Blob::threshold`].
    pub fn split_by_threshold(
        &mut self,
        classifier: &Classifier<'_>,
        threshold: i32,
        connectivity: ConnectivityType,
        sizes: Option<RangeInclusive<u64>>,
    ) -> RegionResult<Vec<Blob>> {
        let survivors = self.threshold(classifier, threshold)?;
        self.set_tried_to_split(true);

        let source = Source::from_lines(survivors.lines(), survivors.pixels(), self.encoding())?;
        let components = label_components(&source, connectivity);
        let total = components.len();

        let mut pieces = Vec::with_capacity(total);
        for component in components
            .iter()
            .filter(|c| sizes.as_ref().is_none_or(|r| r.contains(&c.num_pixels())))
        {
            let mut piece = Blob::from_component(component, self.encoding())?;
            piece.set_split(true, Some(&*self))?;
            pieces.push(piece);
        }
        debug!(
            threshold,
            pieces = pieces.len(),
            discarded = total - pieces.len(),
            "split blob"
        );
        Ok(pieces)
    }
}
