//! Binary persistence for compressed blobs
//!
//! # Record format
//!
//! All integers little-endian:
//!
//! ```text
//! u8        status byte
//! u32       parent id   (0xFFFFFFFF = none)
//! u32       own id      (0xFFFFFFFF = none)
//! u16       start_y
//! u32       run count N
//! N x u32   packed runs: bits 0..16 x0, bits 16..31 x1, bit 31 end of row
//! ```
//!
//! A blob list is a `u32` record count followed by the records.

use crate::compressed::CompressedBlob;
use crate::error::{CodecError, CodecResult};
use crate::line::ShortHorizontalLine;
use runblob_core::BlobId;
use runblob_core::id::persisted_raw;
use std::io::{ErrorKind, Read, Write};
use tracing::debug;

/// Largest run count accepted when reading a record
const MAX_RUNS: u32 = 1 << 24;

/// Largest record count accepted when reading a blob list
const MAX_BLOBS: u32 = 1 << 24;

/// Runs reserved up front when reading; the rest grows as runs arrive
const INITIAL_RUN_CAPACITY: u32 = 4096;

/// Bytes of a record without its runs
pub const RECORD_HEADER_SIZE: usize = 1 + 4 + 4 + 2 + 4;

fn read_array<const N: usize>(reader: &mut impl Read, what: &'static str) -> CodecResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => CodecError::Truncated(what),
        _ => CodecError::Io(err),
    })?;
    Ok(buf)
}

fn read_u32(reader: &mut impl Read, what: &'static str) -> CodecResult<u32> {
    read_array::<4>(reader, what).map(u32::from_le_bytes)
}

// ============================================================================
// Single records
// ============================================================================

impl CompressedBlob {
    /// Size of the persisted record in bytes
    pub fn record_size(&self) -> usize {
        RECORD_HEADER_SIZE + 4 * self.len()
    }

    /// Write the record to a writer
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to_writer(&self, writer: &mut impl Write) -> CodecResult<()> {
        writer.write_all(&[self.status_byte()])?;
        writer.write_all(&persisted_raw(self.parent_id()).to_le_bytes())?;
        writer.write_all(&persisted_raw(self.blob_id()).to_le_bytes())?;
        writer.write_all(&self.start_y().to_le_bytes())?;
        writer.write_all(&(self.len() as u32).to_le_bytes())?;
        for line in self.lines() {
            writer.write_all(&line.packed().to_le_bytes())?;
        }
        Ok(())
    }

    /// Write the record to a byte vector
    ///
    /// # Errors
    ///
    /// Never fails for in-memory output; kept fallible like
    /// [`CompressedBlob::write_to_writer`].
    pub fn write_to_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.record_size());
        self.write_to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Read one record from a reader
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if the input ends inside the
    /// record, and [`CodecError::InvalidData`] for a run count above the
    /// supported maximum, a parent flag without a parent id, or a run that
    /// starts after its end.
    pub fn read_from_reader(reader: &mut impl Read) -> CodecResult<Self> {
        let [status] = read_array::<1>(reader, "status byte")?;
        let parent = read_u32(reader, "parent id")?;
        let own = read_u32(reader, "own id")?;
        let start_y = u16::from_le_bytes(read_array::<2>(reader, "start row")?);
        let count = read_u32(reader, "run count")?;
        if count > MAX_RUNS {
            return Err(CodecError::InvalidData(format!(
                "run count {count} exceeds maximum {MAX_RUNS}"
            )));
        }

        let mut lines = Vec::with_capacity(count.min(INITIAL_RUN_CAPACITY) as usize);
        for _ in 0..count {
            lines.push(ShortHorizontalLine::from_packed(read_u32(reader, "runs")?)?);
        }

        let parent_id = BlobId::from_persisted(parent);
        let blob = Self::from_parts(status, parent_id, BlobId::from_persisted(own), start_y, lines);
        if blob.has_parent() && parent_id.is_none() {
            return Err(CodecError::InvalidData(
                "parent flag set without a parent id".to_string(),
            ));
        }
        Ok(blob)
    }

    /// Read one record from a byte slice
    ///
    /// Trailing bytes after the record are ignored.
    ///
    /// # Errors
    ///
    /// See [`CompressedBlob::read_from_reader`].
    pub fn read_from_bytes(data: &[u8]) -> CodecResult<Self> {
        let mut cursor = data;
        Self::read_from_reader(&mut cursor)
    }
}

// ============================================================================
// Blob lists
// ============================================================================

/// Write a record count followed by every record
///
/// # Errors
///
/// Returns an error if writing fails or there are more than `u32::MAX`
/// records.
pub fn write_blobs(writer: &mut impl Write, blobs: &[CompressedBlob]) -> CodecResult<()> {
    let count = u32::try_from(blobs.len())
        .map_err(|_| CodecError::InvalidData(format!("too many blobs: {}", blobs.len())))?;
    writer.write_all(&count.to_le_bytes())?;
    for blob in blobs {
        blob.write_to_writer(writer)?;
    }
    Ok(())
}

/// Read a list written by [`write_blobs`]
///
/// # Errors
///
/// Returns an error for truncated or invalid records, or a record count
/// above the supported maximum.
pub fn read_blobs(reader: &mut impl Read) -> CodecResult<Vec<CompressedBlob>> {
    let count = read_u32(reader, "blob count")?;
    if count > MAX_BLOBS {
        return Err(CodecError::InvalidData(format!(
            "blob count {count} exceeds maximum {MAX_BLOBS}"
        )));
    }
    let blobs = (0..count)
        .map(|_| CompressedBlob::read_from_reader(reader))
        .collect::<CodecResult<Vec<_>>>()?;
    debug!(
        blobs = blobs.len(),
        runs = blobs.iter().map(CompressedBlob::len).sum::<usize>(),
        "read compressed blobs"
    );
    Ok(blobs)
}
