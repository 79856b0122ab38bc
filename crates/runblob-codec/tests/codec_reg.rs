//! Compressed blob regression test
//!
//! Packs blobs found in synthetic masks, checks the packed runs and the
//! persisted records, and rebuilds the blobs from them.
//!
//! Run with:
//! ```
//! cargo test -p runblob-codec --test codec_reg
//! ```
//!
//! Generate golden files:
//! ```
//! REGTEST_MODE=generate cargo test -p runblob-codec --test codec_reg
//! ```

use runblob_codec::{CodecError, CompressedBlob, RECORD_HEADER_SIZE, read_blobs, write_blobs};
use runblob_core::{Frame, HorizontalLine, PixelEncoding};
use runblob_region::{Blob, ExtractOptions, find_blobs};
use runblob_test::RegParams;
use runblob_test::frames::noise_mask;

#[test]
fn codec_reg() {
    let mut rp = RegParams::new("codec");

    // -----------------------------------------------------------
    // Small mask through the codec
    // -----------------------------------------------------------
    #[rustfmt::skip]
    let mask = [
        0, 1, 1, 0,
        1, 1, 1, 1,
        0, 0, 1, 0,
    ];
    let frame = Frame::new(&mask, 4, 3, PixelEncoding::Binary).expect("small frame");
    let options = ExtractOptions::default().with_threads(false);
    let mut blobs = find_blobs(&frame, None, &options).expect("find blobs");
    let packed = CompressedBlob::encode(&mut blobs[0]).expect("encode");

    rp.compare_values(0.0, packed.start_y() as f64, 0.0);
    rp.compare_values(3.0, packed.len() as f64, 0.0);
    rp.compare_values(7.0, packed.num_pixels() as f64, 0.0);
    let eols: Vec<u8> = packed.lines().iter().map(|l| l.eol() as u8).collect();
    rp.compare_strings(&[1, 1, 0], &eols);
    rp.compare_lines(&[(0, 1, 2), (1, 0, 3), (2, 2, 2)], packed.decode().lines());
    rp.write_data_and_check(&packed.write_to_bytes().expect("record"), "blob")
        .expect("write record");

    // -----------------------------------------------------------
    // Every blob of a noise mask survives packing
    // -----------------------------------------------------------
    let (w, h) = (200u32, 150u32);
    let noise = noise_mask(w, h, 45, 21);
    let frame = Frame::new(&noise, w, h, PixelEncoding::Binary).expect("noise frame");
    let mut blobs = find_blobs(&frame, None, &options).expect("find blobs in noise");
    let mut packed = Vec::with_capacity(blobs.len());
    let mut mismatches = 0;
    for (i, blob) in blobs.iter_mut().enumerate() {
        if i % 3 == 0 {
            blob.set_tag(true);
        }
        let p = CompressedBlob::encode(blob).expect("encode noise blob");
        let decoded = p.decode();
        if decoded.lines() != blob.lines()
            || decoded.flags() != blob.flags()
            || decoded.num_pixels() != blob.num_pixels()
            || p.calculate_bounds() != blob.bounds()
            || p.blob_id() != blob.cached_id()
        {
            mismatches += 1;
        }
        packed.push(p);
    }
    rp.compare_values(0.0, mismatches as f64, 0.0);

    // -----------------------------------------------------------
    // Blob lists persist and reload unchanged
    // -----------------------------------------------------------
    let mut bytes = Vec::new();
    write_blobs(&mut bytes, &packed).expect("write blobs");
    let expected_len = 4 + packed.iter().map(CompressedBlob::record_size).sum::<usize>();
    rp.compare_values(expected_len as f64, bytes.len() as f64, 0.0);
    let restored = read_blobs(&mut bytes.as_slice()).expect("read blobs");
    rp.compare_values(1.0, (restored == packed) as u8 as f64, 0.0);

    let truncated = read_blobs(&mut &bytes[..bytes.len() - 1]);
    rp.compare_values(
        1.0,
        matches!(truncated, Err(CodecError::Truncated(_))) as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup(), "codec regression test failed");
}

#[test]
fn codec_limits_reg() {
    let mut rp = RegParams::new("codec_limits");

    // -----------------------------------------------------------
    // Column limit of the packed format
    // -----------------------------------------------------------
    let mut widest = Blob::from_lines(vec![HorizontalLine::new(5, 32000, 32767)]);
    let packed = CompressedBlob::encode(&mut widest).expect("x1 = 32767 fits");
    rp.compare_values(768.0, packed.num_pixels() as f64, 0.0);
    rp.compare_values(5.0, packed.start_y() as f64, 0.0);

    let mut too_wide = Blob::from_lines(vec![HorizontalLine::new(5, 32000, 32768)]);
    let overflow = CompressedBlob::encode(&mut too_wide);
    rp.compare_values(
        1.0,
        matches!(overflow, Err(CodecError::CoordinateOverflow { .. })) as u8 as f64,
        0.0,
    );

    // -----------------------------------------------------------
    // Split children keep flags and parent through persistence
    // -----------------------------------------------------------
    let parent = Blob::from_lines(vec![
        HorizontalLine::new(0, 0, 9),
        HorizontalLine::new(1, 0, 9),
    ]);
    let mut child = Blob::from_lines(vec![HorizontalLine::new(1, 0, 4)]);
    child.set_split(true, Some(&parent)).expect("split child");
    child.set_instance_segmentation(true);

    let record = CompressedBlob::encode(&mut child)
        .and_then(|p| p.write_to_bytes())
        .expect("persist child");
    rp.compare_values(
        (RECORD_HEADER_SIZE + 4) as f64,
        record.len() as f64,
        0.0,
    );
    let restored = CompressedBlob::read_from_bytes(&record)
        .expect("reload child")
        .decode();
    rp.compare_values(1.0, restored.is_split() as u8 as f64, 0.0);
    rp.compare_values(1.0, restored.is_instance_segmentation() as u8 as f64, 0.0);
    rp.compare_values(
        1.0,
        (restored.parent_id() == parent.compute_id()) as u8 as f64,
        0.0,
    );
    rp.compare_lines(&[(1, 0, 4)], restored.lines());

    assert!(rp.cleanup(), "codec_limits regression test failed");
}
