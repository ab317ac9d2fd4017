use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};

use crate::{
    run_length::{Run, RunClass, RunLengthImage},
    union_find::UnionFind,
};

/// Rule deciding which runs of consecutive rows belong to the same blob.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectivity {
    /// Runs connect when their column ranges share at least one column.
    #[default]
    Four,
    /// Foreground runs also connect when they touch at a corner. Background
    /// runs stay 4-connected so both classes keep a consistent topology.
    Eight,
}

impl Connectivity {
    /// Whether `run` connects to the run `above` it on the previous row.
    #[inline]
    pub fn connects(&self, run: &Run, above: &Run) -> bool {
        if run.class != above.class {
            return false;
        }
        match (self, run.class) {
            (Connectivity::Eight, RunClass::Foreground) => run.touches(above),
            _ => run.overlaps(above),
        }
    }
}

/// A connected component of same-class runs.
///
/// Coordinates are inclusive pixel positions: `max_x` is the rightmost column
/// and `max_y` the bottom row covered by the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// Index of the representative run, the run that created the blob.
    pub root: usize,
    /// Class shared by all the runs of the blob.
    pub class: RunClass,
    /// Leftmost column.
    pub min_x: usize,
    /// Rightmost column.
    pub max_x: usize,
    /// Top row.
    pub min_y: usize,
    /// Bottom row.
    pub max_y: usize,
    /// Number of runs in the blob.
    pub run_count: usize,
    /// Number of gradation changes seen while runs joined the blob.
    pub slope_count: usize,
}

impl Blob {
    fn new(root: usize, run: &Run) -> Self {
        Self {
            root,
            class: run.class,
            min_x: run.start,
            max_x: run.last(),
            min_y: run.row,
            max_y: run.row,
            run_count: 1,
            slope_count: 0,
        }
    }

    fn extend(&mut self, run: &Run) {
        self.min_x = self.min_x.min(run.start);
        self.max_x = self.max_x.max(run.last());
        self.min_y = self.min_y.min(run.row);
        self.max_y = self.max_y.max(run.row);
        self.run_count += 1;
    }

    fn absorb(&mut self, other: &Blob) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        self.run_count += other.run_count;
        self.slope_count += other.slope_count;
    }

    /// Width of the bounding box in pixels.
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    /// Height of the bounding box in pixels.
    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Area of the bounding box in pixels.
    pub fn area_bbox(&self) -> usize {
        self.width() * self.height()
    }

    /// Whether the blob is made of foreground runs.
    pub fn is_foreground(&self) -> bool {
        self.class == RunClass::Foreground
    }
}

/// The finalized blobs of one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSet {
    blobs: Vec<Blob>,
    labels: Vec<usize>,
}

impl BlobSet {
    /// All live blobs, in creation order.
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    /// Number of blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the set holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Iterates the blobs in creation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Blob> {
        self.blobs.iter()
    }

    /// Iterates the foreground blobs.
    pub fn foreground(&self) -> impl Iterator<Item = &Blob> + '_ {
        self.blobs.iter().filter(|b| b.is_foreground())
    }

    /// Iterates the background blobs.
    pub fn background(&self) -> impl Iterator<Item = &Blob> + '_ {
        self.blobs.iter().filter(|b| !b.is_foreground())
    }

    /// Index into [`BlobSet::blobs`] of the blob owning run `run_index`.
    pub fn label_of(&self, run_index: usize) -> Option<usize> {
        self.labels.get(run_index).copied()
    }

    /// The blob owning run `run_index`.
    pub fn blob_of(&self, run_index: usize) -> Option<&Blob> {
        self.blobs.get(self.label_of(run_index)?)
    }
}

impl<'a> IntoIterator for &'a BlobSet {
    type Item = &'a Blob;
    type IntoIter = std::slice::Iter<'a, Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.blobs.iter()
    }
}

// a run of the previous row, as seen by the row below it
#[derive(Debug, Clone, Copy)]
struct OpenRun {
    run: usize,
    blob: usize,
    trend: Ordering,
}

/// Row-by-row blob extractor with reusable scratch state.
///
/// Blobs live in an arena indexed by creation id; absorbed blobs point at
/// their survivor through a [`UnionFind`]. Only the runs of the previous row
/// are kept while scanning.
#[derive(Debug, Default)]
pub struct BlobExtractor {
    uf: UnionFind,
    stats: Vec<Blob>,
    run_blob: Vec<usize>,
    prev: Vec<OpenRun>,
    curr: Vec<OpenRun>,
    bridged: Vec<usize>,
}

impl BlobExtractor {
    /// Creates an extractor with empty scratch buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the blobs of a run-length image, scanning rows top to bottom.
    ///
    /// Each run joins the blobs of the same-class runs it connects to on the
    /// row above. When it connects to several blobs they unify: the survivor
    /// is the blob with the most runs, then the lowest `min_x`, then the
    /// lowest `min_y`, then the earliest created.
    ///
    /// The slope count of a blob grows by one whenever a joining run reverses
    /// the luminance trend of the leftmost run it connects to.
    pub fn extract(&mut self, rle: &RunLengthImage, connectivity: Connectivity) -> BlobSet {
        self.clear();

        let runs = rle.runs();
        self.run_blob.reserve(runs.len());

        for y in 0..rle.num_rows() {
            let Some(range) = rle.row_range(y) else {
                continue;
            };
            let num_runs = range.len();
            let (mut created, mut unified) = (0usize, 0usize);
            let mut cursor = 0;

            for i in range {
                let run = &runs[i];

                // runs above that end left of this one cannot reach later runs either
                while cursor < self.prev.len() && runs[self.prev[cursor].run].end < run.start {
                    cursor += 1;
                }

                let mut leftmost: Option<OpenRun> = None;
                self.bridged.clear();
                for open in &self.prev[cursor..] {
                    let above = &runs[open.run];
                    if above.start > run.end {
                        break;
                    }
                    if !connectivity.connects(run, above) {
                        continue;
                    }
                    if leftmost.is_none() {
                        leftmost = Some(*open);
                    }
                    let root = self.uf.find(open.blob);
                    if !self.bridged.contains(&root) {
                        self.bridged.push(root);
                    }
                }

                let (blob, trend) = match leftmost {
                    Some(above) => {
                        unified += self.bridged.len() - 1;
                        let first = self.uf.find(above.blob);
                        let blob = self.unify_bridged(first);

                        let step = run.luminance.cmp(&runs[above.run].luminance);
                        let reversed = step != Ordering::Equal
                            && above.trend != Ordering::Equal
                            && step != above.trend;

                        let stats = &mut self.stats[blob];
                        stats.extend(run);
                        if reversed {
                            stats.slope_count += 1;
                        }

                        let trend = if step == Ordering::Equal {
                            above.trend
                        } else {
                            step
                        };
                        (blob, trend)
                    }
                    None => {
                        created += 1;
                        let blob = self.uf.push();
                        self.stats.push(Blob::new(i, run));
                        (blob, Ordering::Equal)
                    }
                };

                self.run_blob.push(blob);
                self.curr.push(OpenRun {
                    run: i,
                    blob,
                    trend,
                });
            }

            log::trace!("row {y}: {num_runs} runs, {created} new blobs, {unified} unified");

            std::mem::swap(&mut self.prev, &mut self.curr);
            self.curr.clear();
        }

        let blob_set = self.finish();
        log::debug!(
            "extracted {} blobs ({} foreground) from {} runs",
            blob_set.len(),
            blob_set.foreground().count(),
            runs.len()
        );
        blob_set
    }

    /// Resets the scratch state, keeping the allocations.
    pub fn clear(&mut self) {
        self.uf.clear();
        self.stats.clear();
        self.run_blob.clear();
        self.prev.clear();
        self.curr.clear();
        self.bridged.clear();
    }

    // merges every bridged root into the highest ranked one and returns it,
    // `first` being the root of the leftmost connected run
    fn unify_bridged(&mut self, first: usize) -> usize {
        let stats = &self.stats;
        let rank = |id: usize| {
            let blob = &stats[id];
            (Reverse(blob.run_count), blob.min_x, blob.min_y, id)
        };
        let survivor = self
            .bridged
            .iter()
            .copied()
            .fold(first, |best, id| if rank(id) < rank(best) { id } else { best });

        for &id in &self.bridged {
            if id != survivor {
                let absorbed = self.stats[id];
                self.stats[survivor].absorb(&absorbed);
                self.uf.absorb(id, survivor);
            }
        }

        survivor
    }

    fn finish(&mut self) -> BlobSet {
        let mut index_of = vec![usize::MAX; self.stats.len()];
        let mut blobs = Vec::new();
        for (id, stats) in self.stats.iter().enumerate() {
            if self.uf.is_root(id) {
                index_of[id] = blobs.len();
                blobs.push(*stats);
            }
        }

        let mut labels = Vec::with_capacity(self.run_blob.len());
        for &blob in &self.run_blob {
            labels.push(index_of[self.uf.find(blob)]);
        }

        BlobSet { blobs, labels }
    }
}

/// Extracts the blobs of a run-length image.
///
/// Convenience wrapper over [`BlobExtractor::extract`] with fresh scratch
/// buffers. Background blobs are returned alongside foreground blobs.
///
/// # Example
///
/// ```
/// use tgv_blob::extractor::{extract_blobs, Connectivity};
/// use tgv_blob::run_length::run_length_encode;
/// use tgv_image::{Image, ImageSize};
///
/// let src = Image::<u16, 1>::new(ImageSize { width: 3, height: 2 }, vec![0; 6]).unwrap();
/// let rle = run_length_encode(&src, 100).unwrap();
///
/// let blobs = extract_blobs(&rle, Connectivity::Four);
/// assert_eq!(blobs.len(), 1);
/// assert_eq!(blobs.blobs()[0].area_bbox(), 6);
/// ```
pub fn extract_blobs(rle: &RunLengthImage, connectivity: Connectivity) -> BlobSet {
    BlobExtractor::new().extract(rle, connectivity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::BlobError, run_length::run_length_encode};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use tgv_image::{Image, ImageSize};

    const THRESHOLD: u16 = 100;
    const FG: u16 = 600;

    // builds a binary luminance image from '#' (foreground) and '.' rows
    fn mask(rows: &[&str]) -> Result<Image<u16, 1>, BlobError> {
        let size = ImageSize {
            width: rows[0].len(),
            height: rows.len(),
        };
        let data = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| if b == b'#' { FG } else { 0 }))
            .collect();
        Ok(Image::new(size, data)?)
    }

    fn blobs_of(rows: &[&str], connectivity: Connectivity) -> Result<BlobSet, BlobError> {
        let rle = run_length_encode(&mask(rows)?, THRESHOLD)?;
        Ok(extract_blobs(&rle, connectivity))
    }

    #[test]
    fn test_bridging_run_unifies_blob() -> Result<(), BlobError> {
        let blobs = blobs_of(&["..####.", "###.###"], Connectivity::Four)?;

        let fg: Vec<_> = blobs.foreground().collect();
        assert_eq!(fg.len(), 1);
        let blob = fg[0];
        assert_eq!(
            (blob.min_x, blob.max_x, blob.min_y, blob.max_y),
            (0, 6, 0, 1)
        );
        assert_eq!(blob.run_count, 3);
        assert_eq!(blob.root, 1);

        // left and right background of the top row, the gap below
        assert_eq!(blobs.background().count(), 3);
        Ok(())
    }

    #[test]
    fn test_uniform_background_is_one_blob() -> Result<(), BlobError> {
        let src = Image::from_size_val([11, 7].into(), 42u16)?;
        let rle = run_length_encode(&src, THRESHOLD)?;
        let blobs = extract_blobs(&rle, Connectivity::Four);

        assert_eq!(blobs.len(), 1);
        let blob = blobs.blobs()[0];
        assert_eq!(blob.class, RunClass::Background);
        assert_eq!(
            (blob.min_x, blob.max_x, blob.min_y, blob.max_y),
            (0, 10, 0, 6)
        );
        assert_eq!(blob.run_count, 7);
        assert_eq!(blob.area_bbox(), 77);
        Ok(())
    }

    #[test]
    fn test_equal_blobs_keep_leftmost_root() -> Result<(), BlobError> {
        let rows = ["##..##", "######"];
        let first = blobs_of(&rows, Connectivity::Four)?;
        let second = blobs_of(&rows, Connectivity::Four)?;
        assert_eq!(first, second);

        let fg: Vec<_> = first.foreground().collect();
        assert_eq!(fg.len(), 1);
        // runs: row 0 = [##][..][##], the left one is run 0
        assert_eq!(fg[0].root, 0);
        assert_eq!(fg[0].run_count, 3);
        Ok(())
    }

    #[test]
    fn test_larger_blob_survives() -> Result<(), BlobError> {
        let blobs = blobs_of(&["....##", "##..##", "######"], Connectivity::Four)?;

        let fg: Vec<_> = blobs.foreground().collect();
        assert_eq!(fg.len(), 1);
        // the right blob has two runs when the bottom row bridges, so its
        // creating run (run 1 on the top row) stays the root
        assert_eq!(fg[0].root, 1);
        assert_eq!(fg[0].run_count, 4);
        assert_eq!((fg[0].min_x, fg[0].max_x), (0, 5));
        Ok(())
    }

    #[test]
    fn test_eight_connectivity_joins_diagonal_foreground() -> Result<(), BlobError> {
        let rows = ["#.", ".#"];

        let four = blobs_of(&rows, Connectivity::Four)?;
        assert_eq!(four.foreground().count(), 2);
        assert_eq!(four.background().count(), 2);

        let eight = blobs_of(&rows, Connectivity::Eight)?;
        assert_eq!(eight.foreground().count(), 1);
        assert_eq!(eight.background().count(), 2);
        Ok(())
    }

    #[test]
    fn test_labels_cover_every_run() -> Result<(), BlobError> {
        let mut rng = StdRng::seed_from_u64(5);
        let size = ImageSize {
            width: 29,
            height: 23,
        };
        let data = (0..size.area())
            .map(|_| if rng.random_bool(0.45) { FG } else { 0 })
            .collect();
        let rle = run_length_encode(&Image::new(size, data)?, THRESHOLD)?;

        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let blobs = extract_blobs(&rle, connectivity);

            let mut counts = vec![0usize; blobs.len()];
            for (i, run) in rle.runs().iter().enumerate() {
                let label = blobs.label_of(i).expect("every run is labelled");
                let blob = blobs.blobs()[label];
                assert_eq!(blob.class, run.class);
                assert!(blob.min_x <= run.start && run.last() <= blob.max_x);
                assert!(blob.min_y <= run.row && run.row <= blob.max_y);
                counts[label] += 1;
            }

            for (blob, count) in blobs.iter().zip(counts) {
                assert_eq!(blob.run_count, count);
                assert_eq!(blobs.blob_of(blob.root), Some(blob));
            }
            assert_eq!(
                blobs.iter().map(|b| b.run_count).sum::<usize>(),
                rle.len()
            );
        }
        Ok(())
    }

    #[test]
    fn test_slope_count_follows_trend_reversals() -> Result<(), BlobError> {
        // two identical columns, one foreground run per row
        let column = |values: &[u16]| -> Result<BlobSet, BlobError> {
            let data = values.iter().flat_map(|&v| [v, v]).collect();
            let src = Image::new([2, values.len()].into(), data)?;
            let rle = run_length_encode(&src, THRESHOLD)?;
            Ok(extract_blobs(&rle, Connectivity::Four))
        };

        let slope = |values: &[u16]| -> Result<usize, BlobError> {
            let blobs = column(values)?;
            assert_eq!(blobs.len(), 1);
            Ok(blobs.blobs()[0].slope_count)
        };

        let monotone = slope(&[200, 300, 400, 500, 600])?;
        let flat = slope(&[300, 300, 300, 300, 300])?;
        let single_peak = slope(&[200, 300, 400, 300, 200])?;
        let plateau_peak = slope(&[200, 300, 300, 300, 200])?;
        let zigzag = slope(&[200, 300, 200, 300, 200])?;

        assert_eq!(monotone, 0);
        assert_eq!(flat, 0);
        assert_eq!(single_peak, 1);
        assert_eq!(plateau_peak, 1);
        assert_eq!(zigzag, 3);
        assert!(monotone < single_peak && single_peak < zigzag);
        Ok(())
    }

    #[test]
    fn test_slope_counts_add_up_on_unify() -> Result<(), BlobError> {
        // two columns with one reversal each, bridged by the bottom row
        #[rustfmt::skip]
        let data = vec![
            200, 0, 200,
            400, 0, 400,
            200, 0, 200,
            300, 300, 300,
        ];
        let src = Image::new([3, 4].into(), data)?;
        let rle = run_length_encode(&src, THRESHOLD)?;
        let blobs = extract_blobs(&rle, Connectivity::Four);

        let fg: Vec<_> = blobs.foreground().collect();
        assert_eq!(fg.len(), 1);
        // 1 + 1 from the columns, and the bottom run reverses the left trend
        assert_eq!(fg[0].slope_count, 3);
        assert_eq!(fg[0].run_count, 7);
        Ok(())
    }

    #[test]
    fn test_unify_only_touches_bridged_roots() -> Result<(), BlobError> {
        // blob 0 outranks both bridged blobs but is not connected to them
        let rle = run_length_encode(&mask(&["###.#.#", "......."])?, THRESHOLD)?;
        let mut extractor = BlobExtractor::new();
        let foreground = rle
            .runs()
            .iter()
            .enumerate()
            .filter(|(_, run)| run.class == RunClass::Foreground);
        for (i, run) in foreground {
            extractor.uf.push();
            extractor.stats.push(Blob::new(i, run));
        }
        assert_eq!(extractor.stats.len(), 3);

        extractor.bridged.extend([2, 1]);
        let survivor = extractor.unify_bridged(2);
        assert_eq!(survivor, 1);
        assert_eq!(extractor.uf.find(2), 1);
        assert!(extractor.uf.is_root(0));
        assert_eq!(extractor.stats[0].run_count, 1);
        assert_eq!(extractor.stats[1].run_count, 2);

        extractor.bridged.clear();
        extractor.bridged.push(1);
        assert_eq!(extractor.unify_bridged(1), 1);
        assert_eq!(extractor.stats[1].run_count, 2);
        Ok(())
    }

    #[test]
    fn test_extractor_reuse_matches_fresh() -> Result<(), BlobError> {
        let a = run_length_encode(&mask(&["#.#", "###", "..."])?, THRESHOLD)?;
        let b = run_length_encode(&mask(&["...", ".#.", "..."])?, THRESHOLD)?;

        let mut extractor = BlobExtractor::new();
        let first = extractor.extract(&a, Connectivity::Four);
        let second = extractor.extract(&b, Connectivity::Four);

        assert_eq!(first, extract_blobs(&a, Connectivity::Four));
        assert_eq!(second, extract_blobs(&b, Connectivity::Four));
        assert_eq!(second.foreground().count(), 1);
        assert_eq!(second.background().count(), 1);
        Ok(())
    }
}
