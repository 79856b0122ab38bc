//! Connected-component labeling over run batches
//!
//! Components are assembled row by row without a label image: every run
//! of a row is compared with the runs of the previous row using a
//! two-pointer walk. A run touching one earlier component joins it, a run
//! touching two different components merges them (the smaller into the
//! larger), and a run touching nothing starts a new component.

use crate::background::Background;
use crate::blob::Blob;
use crate::error::RegionResult;
use crate::extract::ExtractOptions;
use crate::merge::{Component, merge};
use crate::source::Source;
use runblob_core::{Frame, HorizontalLine};
use tracing::debug;

/// Connectivity type for component analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityType {
    /// 4-way connectivity (up, down, left, right)
    FourWay,
    /// 8-way connectivity (includes diagonals)
    #[default]
    EightWay,
}

impl ConnectivityType {
    #[inline]
    fn connects(self, above: &HorizontalLine, below: &HorizontalLine) -> bool {
        match self {
            Self::FourWay => above.shares_column(below),
            Self::EightWay => above.overlaps_x(below),
        }
    }

    /// Columns a run reaches beyond its ends on the neighbouring row
    #[inline]
    fn reach(self) -> u32 {
        match self {
            Self::FourWay => 0,
            Self::EightWay => 1,
        }
    }
}

struct Labeler<'a> {
    components: Vec<Option<Component<'a>>>,
    connectivity: ConnectivityType,
}

impl<'a> Labeler<'a> {
    fn create(&mut self, line: HorizontalLine, pixels: &'a [u8]) -> usize {
        self.components
            .push(Some(Component::from_run(line, pixels)));
        self.components.len() - 1
    }

    fn len_of(&self, label: usize) -> usize {
        self.components[label].as_ref().map_or(0, Component::len)
    }

    /// Merge two components; returns the surviving label
    fn union(&mut self, x: usize, y: usize, labels: &mut [&mut [usize]]) -> usize {
        let (keep, gone) = if self.len_of(x) >= self.len_of(y) {
            (x, y)
        } else {
            (y, x)
        };
        let kept = self.components[keep].take().unwrap_or_default();
        let absorbed = self.components[gone].take().unwrap_or_default();
        self.components[keep] = Some(merge(kept, absorbed));
        for row in labels.iter_mut() {
            for label in row.iter_mut().filter(|l| **l == gone) {
                *label = keep;
            }
        }
        keep
    }

    fn push(&mut self, label: usize, line: HorizontalLine, pixels: &'a [u8]) {
        if let Some(component) = self.components[label].as_mut() {
            component.push(line, pixels);
        }
    }
}

/// Assemble the runs of `source` into connected components
///
/// Runs on the same row that touch (pieces of an over-long run) always
/// belong together. Rows that are not adjacent never connect. Components
/// are returned ordered by their first run.
pub fn label_components<'a>(
    source: &Source<'a>,
    connectivity: ConnectivityType,
) -> Vec<Component<'a>> {
    let mut labeler = Labeler {
        components: Vec::new(),
        connectivity,
    };
    let reach = connectivity.reach();

    let mut prev_y: Option<u16> = None;
    let mut prev_lines: &[HorizontalLine] = &[];
    let mut prev_labels: Vec<usize> = Vec::new();
    let mut cur_labels: Vec<usize> = Vec::new();

    for row in source.rows() {
        let Some(y) = row.y() else { continue };
        let lines = row.lines();
        let adjacent = prev_y.is_some_and(|p| p as u32 + 1 == y as u32);
        cur_labels.clear();

        let mut i = 0;
        for (j, (line, pixels)) in row.iter().enumerate() {
            let mut assigned: Option<usize> = None;
            if j > 0 && lines[j - 1].touches_in_row(line) {
                assigned = Some(cur_labels[j - 1]);
            }

            if adjacent {
                // skip runs above that end before this one can reach them
                while i < prev_lines.len() && prev_lines[i].x1 as u32 + reach < line.x0 as u32 {
                    i += 1;
                }
                let mut k = i;
                while k < prev_lines.len()
                    && prev_lines[k].x0 as u32 <= line.x1 as u32 + reach
                {
                    if labeler.connectivity.connects(&prev_lines[k], line) {
                        let label = prev_labels[k];
                        assigned = Some(match assigned {
                            None => label,
                            Some(current) if current == label => current,
                            Some(current) => labeler.union(
                                current,
                                label,
                                &mut [prev_labels.as_mut_slice(), cur_labels.as_mut_slice()],
                            ),
                        });
                    }
                    k += 1;
                }
            }

            let label = match assigned {
                Some(label) => {
                    labeler.push(label, *line, pixels);
                    label
                }
                None => labeler.create(*line, pixels),
            };
            cur_labels.push(label);
        }

        prev_y = Some(y);
        prev_lines = lines;
        std::mem::swap(&mut prev_labels, &mut cur_labels);
    }

    let mut components: Vec<Component<'a>> = labeler.components.into_iter().flatten().collect();
    components.sort_by_key(|c| c.lines().first().copied());
    debug!(
        runs = source.len(),
        components = components.len(),
        "labeled components"
    );
    components
}

/// Find all blobs of a frame
///
/// With a background, pixels are classified against it using the
/// threshold and method of `options`; without one the frame is treated as
/// a mask. Blobs copy their pixel values out of the frame.
///
/// # Errors
///
/// Returns an error if the frame cannot be classified against the
/// background.
pub fn find_blobs(
    frame: &Frame<'_>,
    background: Option<&Background>,
    options: &ExtractOptions,
) -> RegionResult<Vec<Blob>> {
    let source = match background {
        Some(bg) => Source::from_background(frame, bg, options)?,
        None => Source::from_frame(frame, options)?,
    };
    label_components(&source, options.connectivity)
        .iter()
        .map(|component| Blob::from_component(component, frame.encoding()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use runblob_core::PixelEncoding;

    fn mask_source(data: &[u8], width: u32, height: u32) -> Source<'_> {
        let frame = Frame::new(data, width, height, PixelEncoding::Binary).unwrap();
        Source::from_frame(&frame, &ExtractOptions::default().with_threads(false)).unwrap()
    }

    fn tuples(c: &Component<'_>) -> Vec<(u16, u16, u16)> {
        c.lines().iter().map(|l| (l.y, l.x0, l.x1)).collect()
    }

    #[test]
    fn test_single_component() {
        #[rustfmt::skip]
        let data = [
            0, 1, 1, 0,
            1, 1, 1, 1,
            0, 0, 1, 0,
        ];
        let source = mask_source(&data, 4, 3);
        let components = label_components(&source, ConnectivityType::EightWay);
        assert_eq!(components.len(), 1);
        assert_eq!(
            tuples(&components[0]),
            vec![(0, 1, 2), (1, 0, 3), (2, 2, 2)]
        );
        assert_eq!(components[0].num_pixels(), 7);
    }

    #[test]
    fn test_diagonal_connectivity() {
        #[rustfmt::skip]
        let data = [
            1, 0, 0,
            0, 1, 0,
            0, 0, 1,
        ];
        let source = mask_source(&data, 3, 3);
        assert_eq!(label_components(&source, ConnectivityType::EightWay).len(), 1);
        assert_eq!(label_components(&source, ConnectivityType::FourWay).len(), 3);
    }

    #[test]
    fn test_u_shape_merges() {
        #[rustfmt::skip]
        let data = [
            1, 0, 0, 1,
            1, 0, 0, 1,
            1, 1, 1, 1,
        ];
        let source = mask_source(&data, 4, 3);
        let components = label_components(&source, ConnectivityType::FourWay);
        assert_eq!(components.len(), 1);
        assert_eq!(
            tuples(&components[0]),
            vec![(0, 0, 0), (0, 3, 3), (1, 0, 0), (1, 3, 3), (2, 0, 3)]
        );
    }

    #[test]
    fn test_gap_rows_do_not_connect() {
        #[rustfmt::skip]
        let data = [
            1, 1, 1,
            0, 0, 0,
            1, 1, 1,
        ];
        let source = mask_source(&data, 3, 3);
        let components = label_components(&source, ConnectivityType::EightWay);
        assert_eq!(components.len(), 2);
        assert_eq!(tuples(&components[0]), vec![(0, 0, 2)]);
        assert_eq!(tuples(&components[1]), vec![(2, 0, 2)]);
    }

    #[test]
    fn test_separate_objects() {
        #[rustfmt::skip]
        let data = [
            1, 1, 0, 0, 0, 1,
            1, 0, 0, 0, 1, 1,
            0, 0, 1, 0, 0, 0,
        ];
        let source = mask_source(&data, 6, 3);
        let components = label_components(&source, ConnectivityType::EightWay);
        assert_eq!(components.len(), 3);
        let total: u64 = components.iter().map(Component::num_pixels).sum();
        assert_eq!(total, 7);
        // components come back in order of their first run
        assert_eq!(tuples(&components[0])[0], (0, 0, 1));
        assert_eq!(tuples(&components[1])[0], (0, 5, 5));
        assert_eq!(tuples(&components[2]), vec![(2, 2, 2)]);
    }

    #[test]
    fn test_split_long_run_stays_connected() {
        let width = 0x8000 + 4;
        let data = vec![1u8; width];
        let source = mask_source(&data, width as u32, 1);
        assert_eq!(source.len(), 2);
        let components = label_components(&source, ConnectivityType::FourWay);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].num_pixels(), width as u64);
    }

    #[test]
    fn test_find_blobs_mask() {
        #[rustfmt::skip]
        let data = [
            1, 0, 1,
            1, 0, 1,
        ];
        let frame = Frame::new(&data, 3, 2, PixelEncoding::Binary).unwrap();
        let blobs = find_blobs(&frame, None, &ExtractOptions::default()).unwrap();
        assert_eq!(blobs.len(), 2);
        assert!(blobs.iter().all(|b| b.num_pixels() == 2));
    }
}
