//! Row-run extraction
//!
//! Walks every row of a frame and records maximal runs of foreground
//! pixels. Large frames are split into row bands that are extracted on
//! scoped worker threads; the bands are appended to the result strictly in
//! band order, whatever order the workers finish in.

use crate::background::{Background, DifferenceMethod};
use crate::classify::{Classifier, ClassifierConfig, MaskClassifier, RowClassifier};
use crate::error::{RegionError, RegionResult};
use crate::label::ConnectivityType;
use crate::source::Source;
use runblob_core::{Frame, HorizontalLine, MAX_RUN_SPAN};
use std::ops::Range;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use tracing::debug;

/// Frames with more pixels than this are extracted in parallel by default
pub const DEFAULT_PARALLEL_MIN_AREA: usize = 100 * 100;

/// Options for run extraction and blob finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Global classification threshold (ignored for binary masks)
    pub threshold: i32,
    /// Difference method against the background
    pub method: DifferenceMethod,
    /// Allow splitting large frames into parallel row bands
    pub enable_threads: bool,
    /// Minimum `width * height` before bands are used
    pub parallel_min_area: usize,
    /// Number of bands (and threads, including the caller's)
    pub num_threads: usize,
    /// Connectivity used when runs are assembled into components
    pub connectivity: ConnectivityType,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            threshold: 15,
            method: DifferenceMethod::Absolute,
            enable_threads: true,
            parallel_min_area: DEFAULT_PARALLEL_MIN_AREA,
            num_threads: thread::available_parallelism().map_or(1, |n| n.get()),
            connectivity: ConnectivityType::EightWay,
        }
    }
}

impl ExtractOptions {
    /// Set the threshold
    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the difference method
    pub fn with_method(mut self, method: DifferenceMethod) -> Self {
        self.method = method;
        self
    }

    /// Enable or disable parallel bands
    pub fn with_threads(mut self, enable: bool) -> Self {
        self.enable_threads = enable;
        self
    }

    /// Set the number of bands used in parallel mode
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the area above which parallel bands are used
    pub fn with_parallel_min_area(mut self, area: usize) -> Self {
        self.parallel_min_area = area;
        self
    }

    /// Set the connectivity
    pub fn with_connectivity(mut self, connectivity: ConnectivityType) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Classifier configuration derived from these options
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.method, self.threshold)
    }

    fn use_threads(&self, frame: &Frame<'_>) -> bool {
        self.enable_threads && self.num_threads > 1 && frame.area() > self.parallel_min_area
    }
}

/// Extract runs of `rows` into `source`
///
/// The single-threaded core: each row is classified into `mask`, then
/// walked left to right. A run closes at the first background pixel, at
/// the row end, or when it would span more than [`MAX_RUN_SPAN`] columns;
/// in the last case the next run starts right after it.
///
/// # Errors
///
/// Returns an error if `rows` leaves the frame or the classifier rejects
/// the frame's encoding.
pub fn extract_lines<'a, C>(
    frame: &Frame<'a>,
    classifier: &C,
    rows: Range<u16>,
    source: &mut Source<'a>,
    mask: &mut Vec<bool>,
) -> RegionResult<()>
where
    C: RowClassifier + ?Sized,
{
    let width = frame.width();
    let bpp = frame.encoding().bytes_per_pixel();
    mask.resize(width as usize, false);

    for y in rows {
        let row = frame.row(y)?;
        classifier.classify_row(frame.encoding(), y, row, mask)?;

        let mut start: Option<u16> = None;
        for (x, &foreground) in mask.iter().enumerate() {
            let x = x as u16;
            match (start, foreground) {
                (None, true) => start = Some(x),
                (Some(x0), true) if x - x0 > MAX_RUN_SPAN => {
                    source.push_unchecked(
                        HorizontalLine::new(y, x0, x - 1),
                        &row[x0 as usize * bpp..],
                    );
                    start = Some(x);
                }
                (Some(x0), false) => {
                    source.push_unchecked(
                        HorizontalLine::new(y, x0, x - 1),
                        &row[x0 as usize * bpp..],
                    );
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(x0) = start {
            source.push_unchecked(
                HorizontalLine::new(y, x0, width - 1),
                &row[x0 as usize * bpp..],
            );
        }
    }
    Ok(())
}

/// Split `0..height` into at most `bands` contiguous row ranges
pub fn distribute_rows(height: u16, bands: usize) -> Vec<Range<u16>> {
    let bands = bands.clamp(1, height.max(1) as usize);
    let per_band = (height as usize).div_ceil(bands);
    (0..bands)
        .map(|i| {
            let start = (i * per_band).min(height as usize) as u16;
            let end = ((i + 1) * per_band).min(height as usize) as u16;
            start..end
        })
        .filter(|rows| !rows.is_empty())
        .collect()
}

struct MergeState<'a> {
    next_band: usize,
    source: Source<'a>,
    error: Option<RegionError>,
}

fn run_band<'a, C>(
    index: usize,
    rows: Range<u16>,
    frame: &Frame<'a>,
    classifier: &C,
    state: &Mutex<MergeState<'a>>,
    turn: &Condvar,
) where
    C: RowClassifier + ?Sized,
{
    let mut local = Source::new(frame.encoding());
    let mut mask = Vec::new();
    let result = extract_lines(frame, classifier, rows, &mut local, &mut mask);

    let guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    let mut guard = turn
        .wait_while(guard, |s| s.next_band != index)
        .unwrap_or_else(PoisonError::into_inner);
    match result {
        Ok(()) => guard.source.append(local),
        Err(err) => {
            if guard.error.is_none() {
                guard.error = Some(err);
            }
        }
    }
    guard.next_band += 1;
    turn.notify_all();
}

/// Extract all rows with one worker per band
///
/// The caller's thread extracts the last band. Workers wait on `turn`
/// until `next_band` equals their own index, so the bands are appended in
/// row order.
fn extract_parallel<'a, C>(
    frame: &Frame<'a>,
    classifier: &C,
    bands: &[Range<u16>],
) -> RegionResult<Source<'a>>
where
    C: RowClassifier + ?Sized,
{
    let state = Mutex::new(MergeState {
        next_band: 0,
        source: Source::new(frame.encoding()),
        error: None,
    });
    let turn = Condvar::new();

    thread::scope(|scope| {
        if let Some((last, rest)) = bands.split_last() {
            for (index, rows) in rest.iter().enumerate() {
                let (state, turn) = (&state, &turn);
                let rows = rows.clone();
                scope.spawn(move || run_band(index, rows, frame, classifier, state, turn));
            }
            run_band(rest.len(), last.clone(), frame, classifier, &state, &turn);
        }
    });

    let state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
    match state.error {
        Some(err) => Err(err),
        None => Ok(state.source),
    }
}

/// Extract runs of a whole frame, in parallel bands when it is large enough
///
/// # Errors
///
/// Returns an error if the classifier rejects the frame.
pub fn extract<'a, C>(
    frame: &Frame<'a>,
    classifier: &C,
    options: &ExtractOptions,
) -> RegionResult<Source<'a>>
where
    C: RowClassifier + ?Sized,
{
    if options.use_threads(frame) {
        let bands = distribute_rows(frame.height(), options.num_threads);
        debug!(
            bands = bands.len(),
            width = frame.width(),
            height = frame.height(),
            "extracting runs in parallel"
        );
        let source = extract_parallel(frame, classifier, &bands)?;
        debug!(runs = source.len(), rows = source.num_rows(), "bands merged");
        return Ok(source);
    }

    let mut source = Source::new(frame.encoding());
    let mut mask = Vec::new();
    extract_lines(frame, classifier, 0..frame.height(), &mut source, &mut mask)?;
    debug!(runs = source.len(), rows = source.num_rows(), "extracted runs");
    Ok(source)
}

impl<'a> Source<'a> {
    /// Runs of a mask frame: every pixel with a non-zero channel is
    /// foreground
    ///
    /// # Errors
    ///
    /// See [`extract`].
    pub fn from_frame(frame: &Frame<'a>, options: &ExtractOptions) -> RegionResult<Self> {
        extract(frame, &MaskClassifier, options)
    }

    /// Runs of pixels that differ from `background`
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::EncodingMismatch`] if the frame and the
    /// background use different encodings.
    pub fn from_background(
        frame: &Frame<'a>,
        background: &Background,
        options: &ExtractOptions,
    ) -> RegionResult<Self> {
        let classifier = Classifier::new(background, options.classifier_config())?;
        classifier.check_input(frame.encoding())?;
        extract(frame, &classifier, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runblob_core::{Image, PixelEncoding};

    fn sequential() -> ExtractOptions {
        ExtractOptions::default().with_threads(false)
    }

    #[test]
    fn test_small_example() {
        #[rustfmt::skip]
        let data = [
            0, 1, 1, 0,
            1, 1, 1, 1,
            0, 0, 1, 0,
        ];
        let frame = Frame::new(&data, 4, 3, PixelEncoding::Binary).unwrap();
        let source = Source::from_frame(&frame, &sequential()).unwrap();
        assert_eq!(
            source.lines(),
            &[
                HorizontalLine::new(0, 1, 2),
                HorizontalLine::new(1, 0, 3),
                HorizontalLine::new(2, 2, 2),
            ]
        );
        assert_eq!(source.num_rows(), 3);
    }

    #[test]
    fn test_pixels_point_into_frame() {
        let data = [0, 7, 8, 0, 9];
        let frame = Frame::new(&data, 5, 1, PixelEncoding::Gray).unwrap();
        let source = Source::from_frame(&frame, &sequential()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.pixels()[0], &[7, 8, 0, 9]);
        assert_eq!(source.pixels()[1], &[9]);
        assert_eq!(source.lines()[1], HorizontalLine::new(0, 4, 4));
    }

    #[test]
    fn test_long_runs_are_split() {
        let width = 0x8000 + 10;
        let data = vec![1u8; width];
        let frame = Frame::new(&data, width as u32, 1, PixelEncoding::Binary).unwrap();
        let source = Source::from_frame(&frame, &sequential()).unwrap();
        assert_eq!(
            source.lines(),
            &[
                HorizontalLine::new(0, 0, MAX_RUN_SPAN),
                HorizontalLine::new(0, MAX_RUN_SPAN + 1, width as u16 - 1),
            ]
        );
    }

    #[test]
    fn test_distribute_rows() {
        assert_eq!(distribute_rows(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(distribute_rows(2, 8), vec![0..1, 1..2]);
        assert_eq!(distribute_rows(5, 0), vec![0..5]);
    }

    #[test]
    fn test_background_mismatch() {
        let image = Image::new(4, 1, 3).unwrap();
        let bg = Background::new(image, PixelEncoding::Rgb8).unwrap();
        let data = [0u8; 4];
        let frame = Frame::new(&data, 4, 1, PixelEncoding::Gray).unwrap();
        let err = Source::from_background(&frame, &bg, &sequential()).unwrap_err();
        assert!(matches!(err, RegionError::EncodingMismatch { .. }));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (width, height) = (64u32, 48u32);
        let data: Vec<u8> = (0..width * height)
            .map(|i| ((i.wrapping_mul(2_654_435_761) >> 13) % 3 == 0) as u8)
            .collect();
        let frame = Frame::new(&data, width, height, PixelEncoding::Binary).unwrap();

        let seq = Source::from_frame(&frame, &sequential()).unwrap();
        let par = Source::from_frame(
            &frame,
            &ExtractOptions::default()
                .with_num_threads(5)
                .with_parallel_min_area(0),
        )
        .unwrap();
        assert_eq!(seq.lines(), par.lines());
        assert_eq!(seq.num_rows(), par.num_rows());
        for row in par.rows() {
            let y = row.y().unwrap();
            assert_eq!(seq.row(y).lines(), row.lines());
        }
    }

    // Stalls the first row of every band, earlier bands longest, and logs
    // the last row of each band as it is classified.
    struct StaggeredMask {
        band_rows: u16,
        bands: u16,
        finished: Mutex<Vec<u16>>,
    }

    impl RowClassifier for StaggeredMask {
        fn classify_row(
            &self,
            input: PixelEncoding,
            y: u16,
            row: &[u8],
            mask: &mut [bool],
        ) -> RegionResult<()> {
            let band = y / self.band_rows;
            if y % self.band_rows == 0 {
                let delay = (self.bands - band) as u64 * 40;
                thread::sleep(std::time::Duration::from_millis(delay));
            }
            if y % self.band_rows == self.band_rows - 1 {
                self.finished.lock().unwrap().push(band);
            }
            MaskClassifier.classify_row(input, y, row, mask)
        }
    }

    #[test]
    fn test_bands_appended_in_row_order() {
        let (width, height) = (40u32, 48u32);
        let data: Vec<u8> = (0..width * height)
            .map(|i| ((i.wrapping_mul(2_654_435_761) >> 11) % 4 == 0) as u8)
            .collect();
        let frame = Frame::new(&data, width, height, PixelEncoding::Binary).unwrap();
        assert_eq!(distribute_rows(48, 4), vec![0..12, 12..24, 24..36, 36..48]);

        let staggered = StaggeredMask {
            band_rows: 12,
            bands: 4,
            finished: Mutex::new(Vec::new()),
        };
        let options = ExtractOptions::default()
            .with_threads(true)
            .with_num_threads(4)
            .with_parallel_min_area(0);
        let par = extract(&frame, &staggered, &options).unwrap();

        let finished = staggered.finished.into_inner().unwrap();
        assert_eq!(finished.len(), 4);
        assert_eq!(finished.last(), Some(&0));

        let seq = Source::from_frame(&frame, &sequential()).unwrap();
        assert_eq!(seq.lines(), par.lines());
        assert_eq!(seq.pixels(), par.pixels());
        assert_eq!(seq.num_rows(), par.num_rows());
        for index in 0..seq.num_rows() {
            let (s, p) = (seq.row_at(index), par.row_at(index));
            assert_eq!(s.y(), p.y());
            assert_eq!(s.lines(), p.lines());
        }
    }
}
