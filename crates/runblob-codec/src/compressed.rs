//! Compressed blobs
//!
//! A [`CompressedBlob`] keeps only what is needed to rebuild a blob's
//! geometry: a status byte, the parent and own ids, the first row and the
//! packed runs. Pixel values are not part of it.

use crate::error::CodecResult;
use crate::line::ShortHorizontalLine;
use runblob_core::{BlobId, Bounds, PixelEncoding};
use runblob_region::{Blob, BlobFlags};

const SPLIT: u8 = 1 << 0;
const HAS_PARENT: u8 = 1 << 1;
const TRIED_TO_SPLIT: u8 = 1 << 2;
const IS_TAG: u8 = 1 << 3;
const IS_INSTANCE_SEGMENTATION: u8 = 1 << 4;
const RGB: u8 = 1 << 5;
const R3G3B2: u8 = 1 << 6;
const BINARY: u8 = 1 << 7;

/// Geometry and flags of a blob in packed form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlob {
    status: u8,
    parent_id: Option<BlobId>,
    own_id: Option<BlobId>,
    start_y: u16,
    lines: Vec<ShortHorizontalLine>,
}

impl CompressedBlob {
    /// Pack a blob
    ///
    /// Takes the blob mutably because its id is computed and cached on the
    /// way.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::CoordinateOverflow`](crate::CodecError) if a run
    /// ends at column 32768 or later, and
    /// [`CodecError::RowGap`](crate::CodecError) if the runs skip a row.
    pub fn encode(blob: &mut Blob) -> CodecResult<Self> {
        let lines = ShortHorizontalLine::compress(blob.lines())?;
        Ok(Self {
            status: status_byte(blob),
            parent_id: blob.parent_id(),
            own_id: blob.blob_id(),
            start_y: blob.lines().first().map_or(0, |l| l.y),
            lines,
        })
    }

    /// Rebuild the blob's geometry and flags
    ///
    /// The result carries no pixel values; its encoding is the one the
    /// packed blob was taken from.
    pub fn decode(&self) -> Blob {
        let lines = ShortHorizontalLine::uncompress(self.start_y, &self.lines);
        let mut blob = Blob::from_lines_with_encoding(lines, self.encoding());

        let mut flags = BlobFlags::empty();
        flags.set(BlobFlags::SPLIT, self.is_split());
        flags.set(BlobFlags::TRIED_TO_SPLIT, self.tried_to_split());
        flags.set(BlobFlags::IS_TAG, self.is_tag());
        flags.set(BlobFlags::IS_INSTANCE_SEGMENTATION, self.is_instance_segmentation());
        blob.set_flags(flags);
        blob.set_parent_id(self.parent_id);
        blob
    }

    pub(crate) fn from_parts(
        status: u8,
        parent_id: Option<BlobId>,
        own_id: Option<BlobId>,
        start_y: u16,
        lines: Vec<ShortHorizontalLine>,
    ) -> Self {
        Self {
            status,
            parent_id,
            own_id,
            start_y,
            lines,
        }
    }

    /// Status byte
    pub fn status_byte(&self) -> u8 {
        self.status
    }

    /// Row of the first run
    pub fn start_y(&self) -> u16 {
        self.start_y
    }

    /// Packed runs
    pub fn lines(&self) -> &[ShortHorizontalLine] {
        &self.lines
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether there are no runs
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Id of the blob this one was split from
    pub fn parent_id(&self) -> Option<BlobId> {
        self.parent_id
    }

    /// Whether the blob was split from another one
    pub fn is_split(&self) -> bool {
        self.status & SPLIT != 0
    }

    /// Whether a parent id is stored
    pub fn has_parent(&self) -> bool {
        self.status & HAS_PARENT != 0
    }

    /// Whether splitting the blob was attempted
    pub fn tried_to_split(&self) -> bool {
        self.status & TRIED_TO_SPLIT != 0
    }

    /// Whether the blob is marked as a tag
    pub fn is_tag(&self) -> bool {
        self.status & IS_TAG != 0
    }

    /// Whether the blob comes from instance segmentation
    pub fn is_instance_segmentation(&self) -> bool {
        self.status & IS_INSTANCE_SEGMENTATION != 0
    }

    /// Pixel encoding of the blob this was packed from
    pub fn encoding(&self) -> PixelEncoding {
        encoding_from_status(self.status)
    }

    /// Σ(x1 - x0 + 1) over the packed runs
    pub fn num_pixels(&self) -> u64 {
        self.lines.iter().map(|l| l.width() as u64).sum()
    }

    /// Bounding box, computed from the packed runs
    ///
    /// Empty bounds at `(0, start_y)` for a blob without runs.
    pub fn calculate_bounds(&self) -> Bounds {
        if self.lines.is_empty() {
            return Bounds::new_unchecked(0, self.start_y as i32, 0, 0);
        }
        let (mut min_x, mut max_x, mut rows) = (u16::MAX, 0u16, 1i32);
        for line in &self.lines {
            min_x = min_x.min(line.x0());
            max_x = max_x.max(line.x1());
            rows += line.eol() as i32;
        }
        Bounds::new_unchecked(
            min_x as i32,
            self.start_y as i32,
            (max_x - min_x) as i32 + 1,
            rows,
        )
    }

    /// Cached id
    pub fn blob_id(&self) -> Option<BlobId> {
        self.own_id
    }

    /// Recompute the id from the packed geometry
    pub fn reset_id(&mut self) -> Option<BlobId> {
        self.own_id = self.lines.first().map(|first| {
            BlobId::from_data(first.x0(), first.x1(), self.start_y, self.lines.len())
        });
        self.own_id
    }

    /// Approximate heap and inline size in bytes
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.lines.capacity() * std::mem::size_of::<ShortHorizontalLine>()
    }
}

fn status_byte(blob: &Blob) -> u8 {
    let flags = blob.flags();
    let mut status = 0;
    for (flag, bit) in [
        (BlobFlags::SPLIT, SPLIT),
        (BlobFlags::TRIED_TO_SPLIT, TRIED_TO_SPLIT),
        (BlobFlags::IS_TAG, IS_TAG),
        (BlobFlags::IS_INSTANCE_SEGMENTATION, IS_INSTANCE_SEGMENTATION),
    ] {
        if flags.contains(flag) {
            status |= bit;
        }
    }
    if blob.parent_id().is_some() {
        status |= HAS_PARENT;
    }
    status
        | match blob.encoding() {
            PixelEncoding::Gray => 0,
            PixelEncoding::Rgb8 => RGB,
            PixelEncoding::R3g3b2 => R3G3B2,
            PixelEncoding::Binary => BINARY,
        }
}

fn encoding_from_status(status: u8) -> PixelEncoding {
    if status & BINARY != 0 {
        PixelEncoding::Binary
    } else if status & R3G3B2 != 0 {
        PixelEncoding::R3g3b2
    } else if status & RGB != 0 {
        PixelEncoding::Rgb8
    } else {
        PixelEncoding::Gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use runblob_core::HorizontalLine;

    fn example() -> Blob {
        Blob::from_lines(vec![
            HorizontalLine::new(0, 1, 2),
            HorizontalLine::new(1, 0, 3),
            HorizontalLine::new(2, 2, 2),
        ])
    }

    fn tuples(blob: &Blob) -> Vec<(u16, u16, u16)> {
        blob.lines().iter().map(|l| (l.y, l.x0, l.x1)).collect()
    }

    #[test]
    fn test_encode_example() {
        let mut blob = example();
        let packed = CompressedBlob::encode(&mut blob).unwrap();
        assert_eq!(packed.start_y(), 0);
        assert_eq!(packed.len(), 3);
        assert_eq!(packed.num_pixels(), 7);
        assert_eq!(packed.status_byte(), BINARY);
        assert_eq!(packed.encoding(), PixelEncoding::Binary);
        assert_eq!(packed.blob_id(), blob.cached_id());

        let decoded = packed.decode();
        assert_eq!(tuples(&decoded), vec![(0, 1, 2), (1, 0, 3), (2, 2, 2)]);
        assert!(decoded.pixels().is_none());
    }

    #[test]
    fn test_status_bits() {
        let mut blob = Blob::new(
            vec![HorizontalLine::new(9, 4, 6)],
            Some(vec![1, 2, 3, 4, 5, 6, 7, 8, 9]),
            PixelEncoding::Rgb8,
        )
        .unwrap();
        blob.set_tag(true);
        blob.set_tried_to_split(true);
        let packed = CompressedBlob::encode(&mut blob).unwrap();
        assert_eq!(packed.status_byte(), TRIED_TO_SPLIT | IS_TAG | RGB);
        assert!(!packed.has_parent());

        let mut parent = example();
        let mut child = Blob::from_lines(vec![HorizontalLine::new(1, 0, 3)]);
        child.set_split(true, Some(&parent)).unwrap();
        child.set_instance_segmentation(true);
        let packed = CompressedBlob::encode(&mut child).unwrap();
        assert_eq!(
            packed.status_byte(),
            SPLIT | HAS_PARENT | IS_INSTANCE_SEGMENTATION | BINARY
        );
        assert_eq!(packed.parent_id(), parent.blob_id());

        let decoded = packed.decode();
        assert_eq!(decoded.flags(), child.flags());
        assert_eq!(decoded.parent_id(), child.parent_id());
    }

    #[test]
    fn test_encode_overflow() {
        let mut blob = Blob::from_lines(vec![HorizontalLine::new(0, 32700, 32768)]);
        assert!(matches!(
            CompressedBlob::encode(&mut blob),
            Err(CodecError::CoordinateOverflow { x1: 32768, .. })
        ));
    }

    #[test]
    fn test_calculate_bounds() {
        let mut blob = Blob::from_lines(vec![
            HorizontalLine::new(5, 3, 4),
            HorizontalLine::new(5, 8, 9),
            HorizontalLine::new(6, 1, 2),
        ]);
        let packed = CompressedBlob::encode(&mut blob).unwrap();
        assert_eq!(packed.calculate_bounds(), blob.bounds());
        assert_eq!(packed.calculate_bounds(), Bounds::new_unchecked(1, 5, 9, 2));
    }

    #[test]
    fn test_reset_id_matches_blob() {
        let mut blob = example();
        let mut packed = CompressedBlob::encode(&mut blob).unwrap();
        let cached = packed.blob_id();
        assert_eq!(packed.reset_id(), cached);
        assert_eq!(packed.reset_id(), blob.compute_id());
    }

    #[test]
    fn test_empty_blob() {
        let mut blob = Blob::from_lines(Vec::new());
        let packed = CompressedBlob::encode(&mut blob).unwrap();
        assert!(packed.is_empty());
        assert_eq!(packed.blob_id(), None);
        assert_eq!(packed.num_pixels(), 0);
        assert!(packed.calculate_bounds().is_empty());
        assert!(packed.decode().is_empty());
    }
}
