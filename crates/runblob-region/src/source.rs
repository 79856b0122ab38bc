//! Run batches
//!
//! A [`Source`] holds the runs extracted from one frame, ordered by row
//! and column, together with a slice into the frame buffer for each run.
//! Two side tables map every non-empty row to the offset of its first run,
//! so any row can be found with a binary search.

use crate::error::{RegionError, RegionResult};
use runblob_core::{HorizontalLine, MAX_RUN_SPAN, PixelEncoding};

/// Row-ordered runs with borrowed pixels
///
/// Each pixel slice starts at the first pixel of its run and extends at
/// least to the run's last pixel. Slices taken from a frame extend to the
/// end of the frame row, so runs that are later widened still see their
/// pixels.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    lines: Vec<HorizontalLine>,
    pixels: Vec<&'a [u8]>,
    row_y: Vec<u16>,
    row_offsets: Vec<usize>,
    encoding: PixelEncoding,
}

impl<'a> Source<'a> {
    /// Create an empty batch for pixels in `encoding`
    pub fn new(encoding: PixelEncoding) -> Self {
        Self {
            lines: Vec::new(),
            pixels: Vec::new(),
            row_y: Vec::new(),
            row_offsets: Vec::new(),
            encoding,
        }
    }

    /// Build a batch from owned runs
    ///
    /// `pixels` holds the values of all runs back to back; without it every
    /// run gets an empty slice. Runs wider than 2^15 pixels are split into
    /// touching pieces.
    ///
    /// # Errors
    ///
    /// Returns an error if the runs are not ordered or `pixels` is shorter
    /// than the runs need.
    pub fn from_lines(
        lines: &[HorizontalLine],
        pixels: Option<&'a [u8]>,
        encoding: PixelEncoding,
    ) -> RegionResult<Self> {
        let bpp = encoding.bytes_per_pixel();
        let mut source = Self::new(encoding);
        let mut offset = 0;
        for line in lines {
            let mut x0 = line.x0;
            loop {
                let x1 = line.x1.min(x0.saturating_add(MAX_RUN_SPAN));
                let n = (x1 - x0) as usize + 1;
                let slice = match pixels {
                    Some(values) if values.len() >= offset + n * bpp => &values[offset..],
                    Some(values) => {
                        return Err(runblob_core::Error::BufferTooSmall {
                            expected: offset + n * bpp,
                            actual: values.len(),
                        }
                        .into());
                    }
                    None => &[],
                };
                source.push_back(HorizontalLine::new(line.y, x0, x1), slice)?;
                offset += n * bpp;
                if x1 == line.x1 {
                    break;
                }
                x0 = x1 + 1;
            }
        }
        Ok(source)
    }

    /// Pixel layout of the borrowed slices
    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    /// All runs
    pub fn lines(&self) -> &[HorizontalLine] {
        &self.lines
    }

    /// Pixel slices, parallel to [`Source::lines`]
    pub fn pixels(&self) -> &[&'a [u8]] {
        &self.pixels
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the batch has no runs
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of non-empty rows
    pub fn num_rows(&self) -> usize {
        self.row_y.len()
    }

    /// Append a run
    ///
    /// # Errors
    ///
    /// Returns an error if the run does not come after the last one (same
    /// row with a larger, non-overlapping x0, or a later row).
    pub fn push_back(&mut self, line: HorizontalLine, pixels: &'a [u8]) -> RegionResult<()> {
        if let Some(last) = self.lines.last()
            && !(last.y < line.y || (last.y == line.y && last.x1 < line.x0))
        {
            return Err(RegionError::InvalidParameters(format!(
                "run {:?} does not follow {:?}",
                line, last
            )));
        }
        self.push_unchecked(line, pixels);
        Ok(())
    }

    /// Append a run known to be ordered
    #[inline]
    pub(crate) fn push_unchecked(&mut self, line: HorizontalLine, pixels: &'a [u8]) {
        if self.row_y.last().is_none_or(|&y| y < line.y) {
            self.row_y.push(line.y);
            self.row_offsets.push(self.lines.len());
        }
        self.lines.push(line);
        self.pixels.push(pixels);
    }

    /// Append every run of `other`, which must start on a later row
    ///
    /// Row offsets of `other` are rebased by the current run count.
    pub(crate) fn append(&mut self, other: Source<'a>) {
        debug_assert!(match (self.row_y.last(), other.row_y.first()) {
            (Some(&a), Some(&b)) => a < b,
            _ => true,
        });
        let base = self.lines.len();
        self.row_offsets
            .extend(other.row_offsets.iter().map(|offset| offset + base));
        self.row_y.extend_from_slice(&other.row_y);
        self.lines.extend_from_slice(&other.lines);
        self.pixels.extend_from_slice(&other.pixels);
    }

    /// Runs of row `y`
    ///
    /// Returns an invalid [`RowRef`] when the row has no runs.
    pub fn row(&self, y: u16) -> RowRef<'_, 'a> {
        // first row entry greater than y, then step back one
        let index = self.row_y.partition_point(|&row| row <= y);
        match index.checked_sub(1) {
            Some(i) if self.row_y[i] == y => RowRef {
                source: self,
                index: Some(i),
            },
            _ => RowRef {
                source: self,
                index: None,
            },
        }
    }

    /// Runs of the `index`-th non-empty row
    pub fn row_at(&self, index: usize) -> RowRef<'_, 'a> {
        RowRef {
            source: self,
            index: (index < self.row_y.len()).then_some(index),
        }
    }

    /// Iterate over all non-empty rows in order
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_, 'a>> + '_ {
        (0..self.row_y.len()).map(move |i| self.row_at(i))
    }

    fn row_range(&self, index: usize) -> std::ops::Range<usize> {
        let start = self.row_offsets[index];
        let end = self
            .row_offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.lines.len());
        start..end
    }
}

/// View of one row of a [`Source`]
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'s, 'a> {
    source: &'s Source<'a>,
    index: Option<usize>,
}

impl<'s, 'a> RowRef<'s, 'a> {
    /// Whether this refers to an existing row
    pub fn valid(&self) -> bool {
        self.index.is_some()
    }

    /// Row coordinate, `None` if invalid
    pub fn y(&self) -> Option<u16> {
        self.index.map(|i| self.source.row_y[i])
    }

    /// Runs on this row (empty if invalid)
    pub fn lines(&self) -> &'s [HorizontalLine] {
        match self.index {
            Some(i) => &self.source.lines[self.source.row_range(i)],
            None => &[],
        }
    }

    /// Pixel slices of the runs on this row (empty if invalid)
    pub fn pixels(&self) -> &'s [&'a [u8]] {
        match self.index {
            Some(i) => &self.source.pixels[self.source.row_range(i)],
            None => &[],
        }
    }

    /// Iterate over `(run, pixels)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'s HorizontalLine, &'a [u8])> + 's {
        self.lines().iter().zip(self.pixels().iter().copied())
    }

    /// Next non-empty row, invalid after the last
    pub fn next_row(&self) -> RowRef<'s, 'a> {
        match self.index {
            Some(i) => self.source.row_at(i + 1),
            None => *self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ROW: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    fn sample() -> Source<'static> {
        let mut source = Source::new(PixelEncoding::Gray);
        source.push_back(HorizontalLine::new(1, 0, 1), &ROW).unwrap();
        source.push_back(HorizontalLine::new(1, 4, 5), &ROW[4..]).unwrap();
        source.push_back(HorizontalLine::new(3, 2, 2), &ROW[2..]).unwrap();
        source
    }

    #[test]
    fn test_push_and_rows() {
        let source = sample();
        assert_eq!(source.len(), 3);
        assert_eq!(source.num_rows(), 2);
        let ys: Vec<_> = source.rows().filter_map(|r| r.y()).collect();
        assert_eq!(ys, vec![1, 3]);
    }

    #[test]
    fn test_push_rejects_unordered() {
        let mut source = sample();
        assert!(
            source
                .push_back(HorizontalLine::new(2, 0, 0), &ROW)
                .is_err()
        );
        assert!(
            source
                .push_back(HorizontalLine::new(3, 1, 4), &ROW)
                .is_err()
        );
        assert!(source.push_back(HorizontalLine::new(3, 4, 4), &ROW).is_ok());
    }

    #[test]
    fn test_row_lookup() {
        let source = sample();
        let row = source.row(1);
        assert!(row.valid());
        assert_eq!(row.lines().len(), 2);
        assert_eq!(row.pixels()[1][0], 5);

        let missing = source.row(2);
        assert!(!missing.valid());
        assert!(missing.lines().is_empty());
        assert!(!source.row(0).valid());
        assert!(!source.row(9).valid());

        let next = row.next_row();
        assert_eq!(next.y(), Some(3));
        assert!(!next.next_row().valid());
    }

    #[test]
    fn test_from_lines() {
        let values = [1u8, 2, 3, 4, 5];
        let lines = [HorizontalLine::new(0, 2, 3), HorizontalLine::new(2, 0, 2)];
        let source = Source::from_lines(&lines, Some(&values), PixelEncoding::Gray).unwrap();
        assert_eq!(source.num_rows(), 2);
        assert_eq!(source.row(2).pixels()[0][..3], [3, 4, 5]);

        assert!(Source::from_lines(&lines, Some(&values[..4]), PixelEncoding::Gray).is_err());
        let bare = Source::from_lines(&lines, None, PixelEncoding::Binary).unwrap();
        assert!(bare.pixels().iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_from_lines_splits_wide_runs() {
        let lines = [HorizontalLine::new(4, 10, 10 + 0x9000)];
        let source = Source::from_lines(&lines, None, PixelEncoding::Binary).unwrap();
        assert_eq!(
            source.lines(),
            &[
                HorizontalLine::new(4, 10, 10 + MAX_RUN_SPAN),
                HorizontalLine::new(4, 11 + MAX_RUN_SPAN, 10 + 0x9000),
            ]
        );
    }

    #[test]
    fn test_append_rebases_offsets() {
        let mut a = sample();
        let mut b = Source::new(PixelEncoding::Gray);
        b.push_back(HorizontalLine::new(5, 0, 7), &ROW).unwrap();
        b.push_back(HorizontalLine::new(6, 1, 1), &ROW[1..]).unwrap();
        a.append(b);
        assert_eq!(a.len(), 5);
        assert_eq!(a.num_rows(), 4);
        let row = a.row(6);
        assert_eq!(row.lines(), &[HorizontalLine::new(6, 1, 1)]);
        assert_eq!(row.iter().next().unwrap().1[0], 2);
    }
}
