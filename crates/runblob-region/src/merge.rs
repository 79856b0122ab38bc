//! Connected components and their merging
//!
//! A [`Component`] is a globally ordered run sequence (by row, then
//! column) with the pixel slice of every run. [`merge`] fuses two such
//! sequences into one, keeping the order and combining runs on the same
//! row that overlap or touch.

use runblob_core::{BlobId, Bounds, HorizontalLine, count_pixels};
use std::ops::Range;

/// Runs of one connected region, borrowed from a frame
#[derive(Debug, Clone, Default)]
pub struct Component<'a> {
    lines: Vec<HorizontalLine>,
    pixels: Vec<&'a [u8]>,
    parent_id: Option<BlobId>,
}

impl<'a> Component<'a> {
    /// Create an empty component
    pub fn new() -> Self {
        Self::default()
    }

    /// Component made of a single run
    pub fn from_run(line: HorizontalLine, pixels: &'a [u8]) -> Self {
        Self {
            lines: vec![line],
            pixels: vec![pixels],
            parent_id: None,
        }
    }

    /// Append a run that comes after every run already present
    pub fn push(&mut self, line: HorizontalLine, pixels: &'a [u8]) {
        debug_assert!(self.lines.last().is_none_or(|last| *last < line));
        self.lines.push(line);
        self.pixels.push(pixels);
    }

    /// Runs in (y, x0) order
    pub fn lines(&self) -> &[HorizontalLine] {
        &self.lines
    }

    /// Pixel slices, parallel to [`Component::lines`]
    pub fn pixels(&self) -> &[&'a [u8]] {
        &self.pixels
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether there are no runs
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Σ(x1 - x0 + 1) over all runs
    pub fn num_pixels(&self) -> u64 {
        count_pixels(&self.lines)
    }

    /// Bounding box, `None` when empty
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.lines.first()?;
        let last = self.lines.last()?;
        let (min_x, max_x) = self
            .lines
            .iter()
            .fold((u16::MAX, 0), |(lo, hi), l| (lo.min(l.x0), hi.max(l.x1)));
        Some(Bounds::from_inclusive(
            min_x as i32,
            first.y as i32,
            max_x as i32,
            last.y as i32,
        ))
    }

    /// Identity of the component this one was split from
    pub fn parent_id(&self) -> Option<BlobId> {
        self.parent_id
    }

    /// Record the component this one was split from
    pub fn set_parent_id(&mut self, parent: Option<BlobId>) {
        self.parent_id = parent;
    }

    fn extend_from(&mut self, other: &Component<'a>, range: Range<usize>) {
        self.lines.extend_from_slice(&other.lines[range.clone()]);
        self.pixels.extend_from_slice(&other.pixels[range]);
    }

    /// Append `other[range]`, coalescing runs that share the row of the
    /// last output run; runs on later rows are copied at once
    fn append_batch(&mut self, other: &Component<'a>, range: Range<usize>) {
        let mut k = range.start;
        while k < range.end
            && self
                .lines
                .last()
                .is_some_and(|last| last.y == other.lines[k].y)
        {
            self.push_coalesced(other.lines[k], other.pixels[k]);
            k += 1;
        }
        self.extend_from(other, k..range.end);
    }

    /// Append a run, widening the last run instead if both touch on one row
    fn push_coalesced(&mut self, line: HorizontalLine, pixels: &'a [u8]) {
        if let Some(last) = self.lines.last_mut()
            && last.touches_in_row(&line)
        {
            if line.x0 < last.x0 {
                // keep the slice of whichever run starts further left
                if let Some(p) = self.pixels.last_mut() {
                    *p = pixels;
                }
            }
            last.absorb(&line);
            return;
        }
        self.lines.push(line);
        self.pixels.push(pixels);
    }
}

/// Whether `a` lies strictly before `b` without touching it
#[inline]
fn strictly_before(a: &HorizontalLine, b: &HorizontalLine) -> bool {
    a.y < b.y || (a.y == b.y && (a.x1 as u32) + 1 < b.x0 as u32)
}

/// Index of the first run in `lines[from..]` that does not lie strictly
/// before `bound`
#[inline]
fn batch_end(lines: &[HorizontalLine], from: usize, bound: &HorizontalLine) -> usize {
    from + lines[from..]
        .iter()
        .take_while(|l| strictly_before(l, bound))
        .count()
}

/// Merge two ordered components into one
///
/// If every run of one side comes strictly after every run of the other,
/// the two are concatenated. Otherwise they are interleaved: whole batches
/// of runs from one side that precede the other side's current run are
/// copied at once, and runs on the same row that overlap or touch are
/// combined into one wider run.
///
/// Both inputs must already be ordered by (y, x0) with no overlapping runs
/// inside a row. Copied batches and the remainder of the exhausted side are
/// coalesced with the output while they stay on its last row; from the
/// next row on they are appended as is.
///
/// The parent id of `a` is kept, falling back to the one of `b`.
pub fn merge<'a>(a: Component<'a>, b: Component<'a>) -> Component<'a> {
    let parent_id = a.parent_id.or(b.parent_id);

    let (mut first, second) = match (a.lines.last(), b.lines.first()) {
        (None, _) => return with_parent(b, parent_id),
        (_, None) => return with_parent(a, parent_id),
        (Some(a_last), Some(b_first)) if strictly_before(a_last, b_first) => (a, b),
        _ => match (b.lines.last(), a.lines.first()) {
            (Some(b_last), Some(a_first)) if strictly_before(b_last, a_first) => (b, a),
            _ => return with_parent(interleave(&a, &b), parent_id),
        },
    };
    first.lines.extend_from_slice(&second.lines);
    first.pixels.extend_from_slice(&second.pixels);
    with_parent(first, parent_id)
}

fn with_parent(mut component: Component<'_>, parent_id: Option<BlobId>) -> Component<'_> {
    component.parent_id = parent_id;
    component
}

fn interleave<'a>(a: &Component<'a>, b: &Component<'a>) -> Component<'a> {
    let mut out = Component {
        lines: Vec::with_capacity(a.len() + b.len()),
        pixels: Vec::with_capacity(a.len() + b.len()),
        parent_id: None,
    };
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        let (la, lb) = (a.lines[i], b.lines[j]);
        if strictly_before(&lb, &la) {
            let end = batch_end(&b.lines, j, &la);
            out.append_batch(b, j..end);
            j = end;
        } else if strictly_before(&la, &lb) {
            let end = batch_end(&a.lines, i, &lb);
            out.append_batch(a, i..end);
            i = end;
        } else {
            // same row, overlapping or touching
            let mut combined = la;
            combined.absorb(&lb);
            let pixels = if la.x0 <= lb.x0 {
                a.pixels[i]
            } else {
                b.pixels[j]
            };
            out.push_coalesced(combined, pixels);
            i += 1;
            j += 1;
        }
    }

    for (side, from) in [(a, i), (b, j)] {
        out.append_batch(side, from..side.len());
    }
    out
}
