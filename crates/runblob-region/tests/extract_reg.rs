//! Run extraction and labeling regression test
//!
//! Checks the extracted runs of a small mask, agreement between banded and
//! single-threaded extraction, and pixel totals of labeled blobs.
//!
//! Run with:
//! ```
//! cargo test -p runblob-region --test extract_reg
//! ```
//!
//! Generate golden files:
//! ```
//! REGTEST_MODE=generate cargo test -p runblob-region --test extract_reg
//! ```

use runblob_core::{Frame, HorizontalLine, Image, PixelEncoding};
use runblob_region::{
    Background, ConnectivityType, ExtractOptions, Source, find_blobs, label_components,
};
use runblob_test::RegParams;
use runblob_test::frames::{noise_mask, noisy_gray, paint_disc, paint_rect};

fn tuples(lines: &[HorizontalLine]) -> Vec<(u16, u16, u16)> {
    lines.iter().map(|l| (l.y, l.x0, l.x1)).collect()
}

#[test]
fn extract_reg() {
    let mut rp = RegParams::new("extract");

    // -----------------------------------------------------------
    // Small mask: runs in row order
    // -----------------------------------------------------------
    #[rustfmt::skip]
    let mask = [
        0, 1, 1, 0,
        1, 1, 1, 1,
        0, 0, 1, 0,
    ];
    let frame = Frame::new(&mask, 4, 3, PixelEncoding::Binary).expect("small frame");
    let sequential = ExtractOptions::default().with_threads(false);
    let source = Source::from_frame(&frame, &sequential).expect("extract small mask");
    rp.compare_lines(&[(0, 1, 2), (1, 0, 3), (2, 2, 2)], source.lines());

    let blobs = find_blobs(&frame, None, &sequential).expect("find blobs");
    rp.compare_values(1.0, blobs.len() as f64, 0.0);
    rp.compare_values(7.0, blobs[0].num_pixels() as f64, 0.0);

    // -----------------------------------------------------------
    // Banded extraction matches single-threaded extraction
    // -----------------------------------------------------------
    let (w, h) = (320u32, 240u32);
    let noise = noise_mask(w, h, 30, 7);
    let frame = Frame::new(&noise, w, h, PixelEncoding::Binary).expect("noise frame");
    let banded = ExtractOptions::default()
        .with_threads(true)
        .with_num_threads(4)
        .with_parallel_min_area(0);

    let single = Source::from_frame(&frame, &sequential).expect("single-threaded");
    let parallel = Source::from_frame(&frame, &banded).expect("banded");
    rp.compare_values(single.len() as f64, parallel.len() as f64, 0.0);
    rp.compare_lines(&tuples(single.lines()), parallel.lines());
    rp.compare_values(single.num_rows() as f64, parallel.num_rows() as f64, 0.0);

    // -----------------------------------------------------------
    // Labeling keeps every foreground pixel
    // -----------------------------------------------------------
    let ones = noise.iter().filter(|&&v| v != 0).count() as f64;
    for connectivity in [ConnectivityType::FourWay, ConnectivityType::EightWay] {
        let components = label_components(&parallel, connectivity);
        let total: u64 = components.iter().map(|c| c.num_pixels()).sum();
        rp.compare_values(ones, total as f64, 0.0);
    }
    let four = label_components(&single, ConnectivityType::FourWay).len();
    let eight = label_components(&single, ConnectivityType::EightWay).len();
    rp.compare_values(1.0, (four >= eight) as u8 as f64, 0.0);

    let blobs = find_blobs(&frame, None, &banded).expect("find blobs in noise");
    let total: u64 = blobs.iter().map(|b| b.num_pixels()).sum();
    rp.compare_values(ones, total as f64, 0.0);
    rp.compare_values(eight as f64, blobs.len() as f64, 0.0);

    assert!(rp.cleanup(), "extract regression test failed");
}

#[test]
fn extract_background_reg() {
    let mut rp = RegParams::new("extract_background");

    // -----------------------------------------------------------
    // Gray frame with sensor noise below the threshold
    // -----------------------------------------------------------
    let (w, h) = (320u32, 240u32);
    let mut pixels = noisy_gray(w, h, 10, 5, 11);
    paint_rect(&mut pixels, w, 20, 20, 40, 30, 200);
    paint_disc(&mut pixels, w, 200, 150, 25, 150);
    let rect_area = (40 * 30) as f64;
    let disc_area = pixels.iter().filter(|&&v| v == 150).count() as f64;

    let background = Background::new(
        Image::from_data(w, h, 1, vec![10; (w * h) as usize]).expect("background image"),
        PixelEncoding::Gray,
    )
    .expect("background");
    let frame = Frame::new(&pixels, w, h, PixelEncoding::Gray).expect("gray frame");

    for threads in [false, true] {
        let options = ExtractOptions::default()
            .with_threshold(15)
            .with_threads(threads)
            .with_num_threads(3)
            .with_parallel_min_area(0);
        let blobs = find_blobs(&frame, Some(&background), &options).expect("find blobs");
        rp.compare_values(2.0, blobs.len() as f64, 0.0);
        rp.compare_values(rect_area, blobs[0].num_pixels() as f64, 0.0);
        rp.compare_values(disc_area, blobs[1].num_pixels() as f64, 0.0);

        let bounds = blobs[0].bounds();
        rp.compare_values(20.0, bounds.x as f64, 0.0);
        rp.compare_values(20.0, bounds.y as f64, 0.0);
        rp.compare_values(40.0, bounds.w as f64, 0.0);
        rp.compare_values(30.0, bounds.h as f64, 0.0);

        let values = blobs[0].pixels().expect("gray blobs keep pixels");
        rp.compare_values(1.0, values.iter().all(|&v| v == 200) as u8 as f64, 0.0);
    }

    // A stricter threshold than the disc's difference drops it
    let options = ExtractOptions::default().with_threshold(160).with_threads(false);
    let blobs = find_blobs(&frame, Some(&background), &options).expect("strict threshold");
    rp.compare_values(1.0, blobs.len() as f64, 0.0);

    assert!(rp.cleanup(), "extract_background regression test failed");
}
