//! Horizontal runs
//!
//! A [`HorizontalLine`] is one maximal run of foreground pixels on a row.
//! Every higher level structure (run batches, components, blobs and the
//! compressed form) is an ordered sequence of these.

use std::cmp::Ordering;

/// Longest span a single run may cover, `x1 - x0`
///
/// Runs produced from a frame are cut at this length so that their end
/// column survives the 15-bit packed representation.
pub const MAX_RUN_SPAN: u16 = 0x7FFF;

/// A run of pixels `[x0, x1]` on row `y` (both ends inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HorizontalLine {
    /// Row
    pub y: u16,
    /// First column
    pub x0: u16,
    /// Last column (inclusive)
    pub x1: u16,
}

impl HorizontalLine {
    /// Create a new run
    #[inline]
    pub const fn new(y: u16, x0: u16, x1: u16) -> Self {
        debug_assert!(x0 <= x1);
        Self { y, x0, x1 }
    }

    /// Number of pixels covered
    #[inline]
    pub const fn width(&self) -> u32 {
        self.x1 as u32 - self.x0 as u32 + 1
    }

    /// Whether the column ranges overlap or touch diagonally
    ///
    /// This is the 8-connected adjacency test between runs on
    /// neighbouring rows.
    #[inline]
    pub fn overlaps_x(&self, other: &HorizontalLine) -> bool {
        other.x1 as i32 >= self.x0 as i32 - 1 && other.x0 as i32 <= self.x1 as i32 + 1
    }

    /// Whether the column ranges share at least one column
    ///
    /// The 4-connected adjacency test between runs on neighbouring rows.
    #[inline]
    pub fn shares_column(&self, other: &HorizontalLine) -> bool {
        other.x1 >= self.x0 && other.x0 <= self.x1
    }

    /// Whether two runs on the same row overlap or are directly adjacent
    #[inline]
    pub fn touches_in_row(&self, other: &HorizontalLine) -> bool {
        self.y == other.y
            && other.x0 as u32 <= self.x1 as u32 + 1
            && self.x0 as u32 <= other.x1 as u32 + 1
    }

    /// Widen this run to also cover `other` (same row)
    #[inline]
    pub fn absorb(&mut self, other: &HorizontalLine) {
        debug_assert_eq!(self.y, other.y);
        self.x0 = self.x0.min(other.x0);
        self.x1 = self.x1.max(other.x1);
    }
}

impl Ord for HorizontalLine {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x0, self.x1).cmp(&(other.y, other.x0, other.x1))
    }
}

impl PartialOrd for HorizontalLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total number of pixels covered by a run sequence
pub fn count_pixels(lines: &[HorizontalLine]) -> u64 {
    lines.iter().map(|l| l.width() as u64).sum()
}

/// Check that runs are ordered by (y, x0) and do not overlap within a row
pub fn is_well_ordered(lines: &[HorizontalLine]) -> bool {
    lines
        .windows(2)
        .all(|w| w[0].y < w[1].y || (w[0].y == w[1].y && w[0].x1 < w[1].x0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let mut lines = vec![
            HorizontalLine::new(2, 0, 1),
            HorizontalLine::new(0, 5, 6),
            HorizontalLine::new(0, 1, 2),
        ];
        lines.sort();
        assert_eq!(
            lines,
            vec![
                HorizontalLine::new(0, 1, 2),
                HorizontalLine::new(0, 5, 6),
                HorizontalLine::new(2, 0, 1),
            ]
        );
        assert!(is_well_ordered(&lines));
    }

    #[test]
    fn test_overlap_tests() {
        let a = HorizontalLine::new(0, 4, 6);
        // diagonal neighbour counts for 8-connectivity only
        let diag = HorizontalLine::new(1, 7, 9);
        assert!(a.overlaps_x(&diag));
        assert!(!a.shares_column(&diag));

        let far = HorizontalLine::new(1, 8, 9);
        assert!(!a.overlaps_x(&far));

        let left_edge = HorizontalLine::new(1, 0, 0);
        assert!(HorizontalLine::new(0, 0, 0).overlaps_x(&left_edge));
    }

    #[test]
    fn test_touches_and_absorb() {
        let mut a = HorizontalLine::new(3, 0, 2);
        let b = HorizontalLine::new(3, 3, 5);
        assert!(a.touches_in_row(&b));
        assert!(!a.touches_in_row(&HorizontalLine::new(4, 3, 5)));
        assert!(!a.touches_in_row(&HorizontalLine::new(3, 4, 5)));
        a.absorb(&b);
        assert_eq!(a, HorizontalLine::new(3, 0, 5));
        assert_eq!(a.width(), 6);
    }

    #[test]
    fn test_count_and_order() {
        let lines = [HorizontalLine::new(0, 1, 2), HorizontalLine::new(1, 0, 3)];
        assert_eq!(count_pixels(&lines), 6);
        assert!(is_well_ordered(&lines));
        assert!(!is_well_ordered(&[
            HorizontalLine::new(0, 0, 4),
            HorizontalLine::new(0, 3, 6)
        ]));
    }
}
