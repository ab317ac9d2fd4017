use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tgv_image::{Image, ImageSize, MAX_LUMINANCE};
use tgv_imgproc::parallel::ExecutionStrategy;

use crate::errors::BlobError;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
/// Class of a pixel after thresholding.
pub enum RunClass {
    /// Luminance at or below the threshold.
    #[default]
    Background = 0,
    /// Luminance strictly above the threshold.
    Foreground = 1,
}

impl RunClass {
    /// Classifies a luminance sample against `threshold`.
    #[inline]
    pub fn classify(luminance: u16, threshold: u16) -> Self {
        if luminance > threshold {
            RunClass::Foreground
        } else {
            RunClass::Background
        }
    }

    /// Returns the numeric value of the class.
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// A maximal horizontal span of same-class pixels on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// First column of the run.
    pub start: usize,
    /// One past the last column of the run.
    pub end: usize,
    /// Row index, starting at 0 for the top row.
    pub row: usize,
    /// Class shared by every pixel of the run.
    pub class: RunClass,
    /// Mean luminance of the run's pixels, rounded down.
    pub luminance: u16,
}

impl Run {
    /// Number of pixels covered by the run.
    #[inline]
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// Column of the rightmost pixel of the run.
    #[inline]
    pub fn last(&self) -> usize {
        self.end - 1
    }

    /// Whether the column ranges of `self` and `other` share a column.
    #[inline]
    pub fn overlaps(&self, other: &Run) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the column ranges share a column or touch at a corner.
    #[inline]
    pub fn touches(&self, other: &Run) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Run-length representation of a thresholded luminance image.
///
/// The runs of all rows are stored back to back in row order; row `y` owns
/// the runs in `row_offsets[y]..row_offsets[y + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLengthImage {
    size: ImageSize,
    threshold: u16,
    runs: Vec<Run>,
    row_offsets: Vec<usize>,
}

impl RunLengthImage {
    /// The size of the encoded image.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The threshold used to classify the pixels.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Number of encoded rows.
    pub fn num_rows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// All runs, row by row and left to right within a row.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Total number of runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the image holds no runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The runs of row `y`, or `None` past the last row.
    pub fn row(&self, y: usize) -> Option<&[Run]> {
        let range = self.row_range(y)?;
        Some(&self.runs[range])
    }

    /// Index range of the runs of row `y` within [`RunLengthImage::runs`].
    pub fn row_range(&self, y: usize) -> Option<std::ops::Range<usize>> {
        let start = *self.row_offsets.get(y)?;
        let end = *self.row_offsets.get(y + 1)?;
        Some(start..end)
    }

    /// Iterates the rows as run slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Run]> + '_ {
        self.row_offsets
            .windows(2)
            .map(move |w| &self.runs[w[0]..w[1]])
    }
}

/// Encodes every row of a luminance image into runs of foreground and
/// background pixels.
///
/// A pixel is foreground when its luminance is strictly greater than
/// `threshold`. Adjacent pixels of the same class merge into one run, so the
/// runs of a row alternate class and their widths add up to the image width.
///
/// # Arguments
///
/// * `src` - The filtered luminance image.
/// * `threshold` - The classification threshold, `0..=765`.
///
/// # Errors
///
/// Returns [`BlobError::InvalidThreshold`] when `threshold` exceeds
/// [`MAX_LUMINANCE`].
///
/// # Example
///
/// ```
/// use tgv_blob::run_length::{run_length_encode, RunClass};
/// use tgv_image::{Image, ImageSize};
///
/// let src = Image::<u16, 1>::new(
///     ImageSize { width: 5, height: 1 },
///     vec![0, 600, 600, 0, 0],
/// )
/// .unwrap();
///
/// let rle = run_length_encode(&src, 300).unwrap();
/// let row = rle.row(0).unwrap();
/// assert_eq!(row.len(), 3);
/// assert_eq!((row[1].start, row[1].end, row[1].class), (1, 3, RunClass::Foreground));
/// ```
pub fn run_length_encode(
    src: &Image<u16, 1>,
    threshold: u16,
) -> Result<RunLengthImage, BlobError> {
    run_length_encode_with_strategy(src, threshold, ExecutionStrategy::default())
}

/// Same as [`run_length_encode`] with an explicit execution strategy.
///
/// Rows are encoded independently and concatenated in row order, so the
/// result does not depend on the strategy.
pub fn run_length_encode_with_strategy(
    src: &Image<u16, 1>,
    threshold: u16,
    strategy: ExecutionStrategy,
) -> Result<RunLengthImage, BlobError> {
    if threshold > MAX_LUMINANCE {
        return Err(BlobError::InvalidThreshold(threshold));
    }

    let width = src.width();
    let rows: Vec<Vec<Run>> = match strategy {
        ExecutionStrategy::Serial => src
            .as_slice()
            .chunks_exact(width)
            .enumerate()
            .map(|(y, row)| encode_row(row, y, threshold))
            .collect(),
        ExecutionStrategy::ParallelRows => src
            .as_slice()
            .par_chunks_exact(width)
            .enumerate()
            .map(|(y, row)| encode_row(row, y, threshold))
            .collect(),
    };

    let mut runs = Vec::with_capacity(rows.iter().map(Vec::len).sum());
    let mut row_offsets = Vec::with_capacity(rows.len() + 1);
    row_offsets.push(0);
    for row in rows {
        runs.extend(row);
        row_offsets.push(runs.len());
    }

    Ok(RunLengthImage {
        size: src.size(),
        threshold,
        runs,
        row_offsets,
    })
}

fn encode_row(row: &[u16], y: usize, threshold: u16) -> Vec<Run> {
    let mut runs = Vec::new();
    let Some(&first) = row.first() else {
        return runs;
    };

    let mut start = 0;
    let mut class = RunClass::classify(first, threshold);
    let mut sum = 0u64;

    for (x, &luminance) in row.iter().enumerate() {
        let pixel_class = RunClass::classify(luminance, threshold);
        if pixel_class != class {
            runs.push(close_run(start, x, y, class, sum));
            start = x;
            class = pixel_class;
            sum = 0;
        }
        sum += luminance as u64;
    }
    runs.push(close_run(start, row.len(), y, class, sum));

    runs
}

#[inline]
fn close_run(start: usize, end: usize, row: usize, class: RunClass, sum: u64) -> Run {
    Run {
        start,
        end,
        row,
        class,
        luminance: (sum / (end - start) as u64) as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_encode_row_alternates_class() -> Result<(), BlobError> {
        let src = Image::new([8, 1].into(), vec![10, 500, 520, 10, 10, 10, 700, 700])?;
        let rle = run_length_encode(&src, 100)?;

        let spans: Vec<_> = rle
            .runs()
            .iter()
            .map(|r| (r.start, r.end, r.class.value(), r.luminance))
            .collect();
        assert_eq!(
            spans,
            vec![(0, 1, 0, 10), (1, 3, 1, 510), (3, 6, 0, 10), (6, 8, 1, 700)]
        );
        Ok(())
    }

    #[test]
    fn test_threshold_is_exclusive() -> Result<(), BlobError> {
        let src = Image::new([2, 1].into(), vec![100, 101])?;
        let rle = run_length_encode(&src, 100)?;
        let classes: Vec<_> = rle.runs().iter().map(|r| r.class).collect();
        assert_eq!(classes, vec![RunClass::Background, RunClass::Foreground]);
        Ok(())
    }

    #[test]
    fn test_monochrome_rows_have_one_run() -> Result<(), BlobError> {
        let src = Image::from_size_val([9, 4].into(), 765u16)?;
        for threshold in [0, 764, 765] {
            let rle = run_length_encode(&src, threshold)?;
            assert_eq!(rle.num_rows(), 4);
            for (y, row) in rle.rows().enumerate() {
                assert_eq!(row.len(), 1);
                assert_eq!((row[0].start, row[0].end, row[0].row), (0, 9, y));
            }
        }
        Ok(())
    }

    #[test]
    fn test_run_widths_cover_each_row() -> Result<(), BlobError> {
        let mut rng = StdRng::seed_from_u64(42);
        for (width, height) in [(1, 1), (1, 6), (17, 1), (23, 19)] {
            let size = ImageSize { width, height };
            let data = (0..size.area())
                .map(|_| rng.random_range(0..=MAX_LUMINANCE))
                .collect();
            let src = Image::new(size, data)?;

            for threshold in [0, 1, 200, 383, 700, MAX_LUMINANCE] {
                let rle = run_length_encode(&src, threshold)?;
                assert_eq!(rle.num_rows(), height);
                for (y, row) in rle.rows().enumerate() {
                    assert_eq!(row.iter().map(Run::width).sum::<usize>(), width);
                    assert_eq!(row[0].start, 0);
                    for pair in row.windows(2) {
                        assert_eq!(pair[0].end, pair[1].start);
                        assert_ne!(pair[0].class, pair[1].class);
                    }
                    assert!(row.iter().all(|r| r.row == y));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_serial_and_parallel_agree() -> Result<(), BlobError> {
        let size = ImageSize {
            width: 31,
            height: 27,
        };
        let data = (0..size.area()).map(|i| (i * 97 % 766) as u16).collect();
        let src = Image::new(size, data)?;

        let serial = run_length_encode_with_strategy(&src, 380, ExecutionStrategy::Serial)?;
        let parallel = run_length_encode_with_strategy(&src, 380, ExecutionStrategy::ParallelRows)?;
        assert_eq!(serial, parallel);
        Ok(())
    }

    #[test]
    fn test_invalid_threshold() -> Result<(), BlobError> {
        let src = Image::from_size_val([2, 2].into(), 0u16)?;
        assert_eq!(
            run_length_encode(&src, 766),
            Err(BlobError::InvalidThreshold(766))
        );
        Ok(())
    }

    #[test]
    fn test_row_lookup() -> Result<(), BlobError> {
        let src = Image::new([3, 2].into(), vec![0, 0, 0, 0, 765, 0])?;
        let rle = run_length_encode(&src, 10)?;
        assert_eq!(rle.row_range(0), Some(0..1));
        assert_eq!(rle.row_range(1), Some(1..4));
        assert_eq!(rle.row(1).map(<[Run]>::len), Some(3));
        assert!(rle.row(2).is_none());
        assert_eq!(rle.len(), 4);
        Ok(())
    }

    #[test]
    fn test_overlap_and_touch() {
        let run = |start, end| Run {
            start,
            end,
            row: 0,
            class: RunClass::Foreground,
            luminance: 0,
        };
        assert!(run(0, 3).overlaps(&run(2, 5)));
        assert!(!run(0, 2).overlaps(&run(2, 5)));
        assert!(run(0, 2).touches(&run(2, 5)));
        assert!(!run(0, 2).touches(&run(3, 5)));
        assert_eq!(run(3, 7).last(), 6);
    }
}
