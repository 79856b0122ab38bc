//! Content-derived blob identifiers

use crate::line::HorizontalLine;
use std::fmt;

/// Identity of a blob, derived from its geometry
///
/// Packs the center column of the first run (12 bits), the first row
/// (12 bits) and the number of runs (8 bits). Two blobs with identical
/// geometry always share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId(u32);

impl BlobId {
    /// Raw value persisted for "no id"
    pub const INVALID_RAW: u32 = u32::MAX;

    /// Wrap a raw value
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Decode a persisted value, mapping the invalid marker to `None`
    #[inline]
    pub const fn from_persisted(raw: u32) -> Option<Self> {
        if raw == Self::INVALID_RAW {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw value
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Build an id from the first run of a blob and its run count
    pub const fn from_data(x0: u16, x1: u16, y0: u16, line_count: usize) -> Self {
        let center = (x0 as u32 + (x1 as u32 - x0 as u32) / 2) & 0xFFF;
        Self((center << 20) | ((y0 as u32 & 0xFFF) << 8) | (line_count as u32 & 0xFF))
    }

    /// Id of a run sequence, `None` when empty
    pub fn from_lines(lines: &[HorizontalLine]) -> Option<Self> {
        lines
            .first()
            .map(|first| Self::from_data(first.x0, first.x1, first.y, lines.len()))
    }

    /// Approximate position encoded in the id: (center of first run, first row)
    pub const fn position(self) -> (u16, u16) {
        (
            ((self.0 >> 20) & 0xFFF) as u16,
            ((self.0 >> 8) & 0xFFF) as u16,
        )
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted form of an optional id
#[inline]
pub fn persisted_raw(id: Option<BlobId>) -> u32 {
    id.map_or(BlobId::INVALID_RAW, BlobId::raw)
}
