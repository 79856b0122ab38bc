//! Packed runs
//!
//! A [`ShortHorizontalLine`] stores one run in 32 bits: `x0` in the low 16
//! bits, `x1` in the next 15 and an end-of-row flag in the top bit. The row
//! itself is not stored; it is recovered by counting end-of-row flags from
//! the first row of the blob.

use crate::error::{CodecError, CodecResult};
use runblob_core::HorizontalLine;

/// Largest `x1` a packed run can hold
pub const MAX_X1: u16 = 0x7FFF;

const X1_SHIFT: u32 = 16;
const EOL_BIT: u32 = 1 << 31;

/// A run packed into 32 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ShortHorizontalLine(u32);

impl ShortHorizontalLine {
    /// Pack a run
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::CoordinateOverflow`] if `x1` is 32768 or more,
    /// and [`CodecError::InvalidData`] if `x0 > x1`.
    pub fn new(x0: u16, x1: u16, eol: bool) -> CodecResult<Self> {
        if x1 > MAX_X1 {
            return Err(CodecError::CoordinateOverflow { x0, x1 });
        }
        if x0 > x1 {
            return Err(CodecError::InvalidData(format!(
                "run starts after its end: [{}, {}]",
                x0, x1
            )));
        }
        let eol = if eol { EOL_BIT } else { 0 };
        Ok(Self(x0 as u32 | (x1 as u32) << X1_SHIFT | eol))
    }

    /// Unpack a persisted value
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidData`] if the stored start lies after
    /// the stored end.
    pub fn from_packed(raw: u32) -> CodecResult<Self> {
        let line = Self(raw);
        if line.x0() > line.x1() {
            return Err(CodecError::InvalidData(format!(
                "packed run {:#010x} starts after its end",
                raw
            )));
        }
        Ok(line)
    }

    /// Packed value
    #[inline]
    pub const fn packed(self) -> u32 {
        self.0
    }

    /// First column
    #[inline]
    pub const fn x0(self) -> u16 {
        self.0 as u16
    }

    /// Last column (inclusive)
    #[inline]
    pub const fn x1(self) -> u16 {
        ((self.0 >> X1_SHIFT) & MAX_X1 as u32) as u16
    }

    /// Whether the next run lies on the following row
    #[inline]
    pub const fn eol(self) -> bool {
        self.0 & EOL_BIT != 0
    }

    /// Set or clear the end-of-row flag
    #[inline]
    pub fn set_eol(&mut self, eol: bool) {
        if eol {
            self.0 |= EOL_BIT;
        } else {
            self.0 &= !EOL_BIT;
        }
    }

    /// Number of pixels covered
    #[inline]
    pub const fn width(self) -> u32 {
        self.x1() as u32 - self.x0() as u32 + 1
    }

    /// Pack an ordered run sequence
    ///
    /// A run gets the end-of-row flag when the next run lies on the
    /// following row; the last run never has it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::CoordinateOverflow`] for a run ending at column
    /// 32768 or later, and [`CodecError::RowGap`] when consecutive runs are
    /// neither on the same nor on adjacent rows.
    pub fn compress(lines: &[HorizontalLine]) -> CodecResult<Vec<Self>> {
        let mut packed = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let eol = match lines.get(i + 1) {
                None => false,
                Some(next) if next.y == line.y => false,
                Some(next) if next.y as u32 == line.y as u32 + 1 => true,
                Some(next) => {
                    return Err(CodecError::RowGap {
                        previous: line.y,
                        next: next.y,
                    });
                }
            };
            packed.push(Self::new(line.x0, line.x1, eol)?);
        }
        Ok(packed)
    }

    /// Restore runs, starting on row `start_y`
    pub fn uncompress(start_y: u16, compressed: &[Self]) -> Vec<HorizontalLine> {
        let mut y = start_y;
        compressed
            .iter()
            .map(|c| {
                let line = HorizontalLine::new(y, c.x0(), c.x1());
                if c.eol() {
                    y = y.saturating_add(1);
                }
                line
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout() {
        let line = ShortHorizontalLine::new(0x1234, 0x7FFF, true).unwrap();
        assert_eq!(line.packed(), 0x1234 | 0x7FFF << 16 | 1 << 31);
        assert_eq!(line.x0(), 0x1234);
        assert_eq!(line.x1(), 0x7FFF);
        assert!(line.eol());
        assert_eq!(line.width(), 0x7FFF - 0x1234 + 1);
    }

    #[test]
    fn test_x1_limit() {
        assert!(ShortHorizontalLine::new(0, 32767, false).is_ok());
        assert!(matches!(
            ShortHorizontalLine::new(0, 32768, false),
            Err(CodecError::CoordinateOverflow { x0: 0, x1: 32768 })
        ));
        assert!(ShortHorizontalLine::new(5, 4, false).is_err());
    }

    #[test]
    fn test_set_eol() {
        let mut line = ShortHorizontalLine::new(3, 9, false).unwrap();
        line.set_eol(true);
        assert!(line.eol());
        assert_eq!((line.x0(), line.x1()), (3, 9));
        line.set_eol(false);
        assert_eq!(line, ShortHorizontalLine::new(3, 9, false).unwrap());
    }

    #[test]
    fn test_from_packed_validates() {
        let line = ShortHorizontalLine::new(2, 8, true).unwrap();
        assert_eq!(ShortHorizontalLine::from_packed(line.packed()).unwrap(), line);
        assert!(ShortHorizontalLine::from_packed(9 | 2 << 16).is_err());
    }

    #[test]
    fn test_compress_eol_flags() {
        let lines = [
            HorizontalLine::new(4, 0, 1),
            HorizontalLine::new(4, 5, 6),
            HorizontalLine::new(5, 2, 3),
            HorizontalLine::new(6, 0, 9),
        ];
        let packed = ShortHorizontalLine::compress(&lines).unwrap();
        let flags: Vec<bool> = packed.iter().map(|l| l.eol()).collect();
        assert_eq!(flags, vec![false, true, true, false]);
        assert_eq!(ShortHorizontalLine::uncompress(4, &packed), lines);
    }

    #[test]
    fn test_compress_rejects_row_gap() {
        let lines = [HorizontalLine::new(0, 0, 1), HorizontalLine::new(2, 0, 1)];
        assert!(matches!(
            ShortHorizontalLine::compress(&lines),
            Err(CodecError::RowGap { previous: 0, next: 2 })
        ));
    }

    #[test]
    fn test_compress_empty() {
        assert!(ShortHorizontalLine::compress(&[]).unwrap().is_empty());
        assert!(ShortHorizontalLine::uncompress(7, &[]).is_empty());
    }
}
