use rayon::prelude::*;
use tgv_image::{Image, LUMINANCES};

use crate::parallel::ExecutionStrategy;

/// Pixel counts per luminance value.
///
/// Always holds [`LUMINANCES`] buckets, bucket `i` counting the pixels whose
/// luminance is exactly `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    bins: Vec<usize>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            bins: vec![0; LUMINANCES],
        }
    }
}

impl Histogram {
    /// The bucket counts, indexed by luminance.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// Count for a single luminance value; zero past the last bucket.
    pub fn count(&self, luminance: u16) -> usize {
        self.bins.get(luminance as usize).copied().unwrap_or(0)
    }

    /// Total number of pixels counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Mean luminance of the counted pixels, `None` for an empty histogram.
    pub fn mean(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(value, &count)| value as f64 * count as f64)
            .sum();
        Some(weighted / total as f64)
    }

    /// Split point maximising the between-class variance (Otsu's method).
    ///
    /// Pixels with luminance strictly greater than the returned value form the
    /// foreground class. When several consecutive split points reach the same
    /// maximum, as happens across the empty gap of a two-level image, the
    /// middle of that plateau is returned; a separate maximum of equal height
    /// further right is ignored. When no split separates two non-empty classes
    /// (a uniform image) the floored mean is returned, which classifies every
    /// pixel as background. An empty histogram yields `0`.
    ///
    /// # Example
    ///
    /// ```
    /// use tgv_image::{Image, ImageSize};
    /// use tgv_imgproc::histogram::compute_histogram;
    ///
    /// let image = Image::<u16, 1>::new(
    ///     ImageSize { width: 4, height: 1 },
    ///     vec![30, 40, 600, 700],
    /// )
    /// .unwrap();
    ///
    /// let threshold = compute_histogram(&image).otsu_threshold();
    /// assert!((40..600).contains(&threshold));
    /// ```
    pub fn otsu_threshold(&self) -> u16 {
        let total = self.total();
        if total == 0 {
            return 0;
        }

        let total_f = total as f64;
        let weighted_total: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(value, &count)| value as f64 * count as f64)
            .sum();

        let mut best: Option<(usize, usize)> = None;
        let mut best_variance = 0.0;
        let mut on_plateau = false;
        let mut w0 = 0.0;
        let mut sum0 = 0.0;

        for (t, &count) in self.bins.iter().enumerate() {
            w0 += count as f64;
            sum0 += t as f64 * count as f64;
            if w0 == 0.0 {
                continue;
            }
            let w1 = total_f - w0;
            if w1 == 0.0 {
                break;
            }
            let m0 = sum0 / w0;
            let m1 = (weighted_total - sum0) / w1;
            let variance = w0 * w1 * (m0 - m1) * (m0 - m1);
            if variance > best_variance {
                best_variance = variance;
                best = Some((t, t));
                on_plateau = true;
            } else if variance == best_variance && on_plateau {
                if let Some((_, last)) = best.as_mut() {
                    *last = t;
                }
            } else {
                on_plateau = false;
            }
        }

        match best {
            Some((first, last)) => ((first + last) / 2) as u16,
            None => (weighted_total / total_f) as u16,
        }
    }
}

/// Compute the luminance histogram of an image.
///
/// # Arguments
///
/// * `src` - The input luminance image.
///
/// # Returns
///
/// A [`Histogram`] whose total equals the number of pixels of `src`.
///
/// Samples above [`tgv_image::MAX_LUMINANCE`] violate the luminance contract;
/// they are counted in the last bucket.
///
/// # Example
///
/// ```
/// use tgv_image::{Image, ImageSize};
/// use tgv_imgproc::histogram::compute_histogram;
///
/// let image = Image::<u16, 1>::new(
///   ImageSize {
///     width: 3,
///     height: 3,
///   },
///   vec![0, 2, 4, 128, 130, 132, 765, 765, 765],
/// ).unwrap();
///
/// let histogram = compute_histogram(&image);
/// assert_eq!(histogram.total(), 9);
/// assert_eq!(histogram.count(765), 3);
/// ```
pub fn compute_histogram(src: &Image<u16, 1>) -> Histogram {
    compute_histogram_with_strategy(src, ExecutionStrategy::default())
}

/// Same as [`compute_histogram`] with an explicit execution strategy.
pub fn compute_histogram_with_strategy(
    src: &Image<u16, 1>,
    strategy: ExecutionStrategy,
) -> Histogram {
    let accumulate = |mut local: Vec<usize>, chunk: &[u16]| {
        for &px in chunk {
            local[(px as usize).min(LUMINANCES - 1)] += 1;
        }
        local
    };

    let bins = match strategy {
        ExecutionStrategy::Serial => accumulate(vec![0usize; LUMINANCES], src.as_slice()),
        ExecutionStrategy::ParallelRows => src
            .as_slice()
            .par_chunks(4096)
            .fold(|| vec![0usize; LUMINANCES], accumulate)
            .reduce(
                || vec![0usize; LUMINANCES],
                |mut a, b| {
                    for (i, val) in b.iter().enumerate() {
                        a[i] += val;
                    }
                    a
                },
            ),
    };

    Histogram { bins }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgv_image::{ImageError, ImageSize, MAX_LUMINANCE};

    #[test]
    fn test_compute_histogram() -> Result<(), ImageError> {
        let image = Image::new(
            ImageSize {
                width: 3,
                height: 3,
            },
            vec![0, 2, 2, 128, 130, 130, 765, 765, 765],
        )?;

        let histogram = compute_histogram(&image);
        assert_eq!(histogram.bins().len(), LUMINANCES);
        assert_eq!(histogram.count(0), 1);
        assert_eq!(histogram.count(2), 2);
        assert_eq!(histogram.count(130), 2);
        assert_eq!(histogram.count(MAX_LUMINANCE), 3);
        assert_eq!(histogram.count(1), 0);

        Ok(())
    }

    #[test]
    fn test_histogram_total_matches_area() -> Result<(), ImageError> {
        for (width, height) in [(1, 1), (7, 3), (64, 129)] {
            let size = ImageSize { width, height };
            let data = (0..size.area()).map(|i| (i * 131 % 766) as u16).collect();
            let image = Image::new(size, data)?;

            let parallel = compute_histogram(&image);
            let serial = compute_histogram_with_strategy(&image, ExecutionStrategy::Serial);
            assert_eq!(parallel.total(), width * height);
            assert_eq!(parallel, serial);
        }
        Ok(())
    }

    #[test]
    fn test_out_of_range_sample_is_clamped() -> Result<(), ImageError> {
        let image = Image::new([2, 1].into(), vec![u16::MAX, 3])?;
        let histogram = compute_histogram(&image);
        assert_eq!(histogram.total(), 2);
        assert_eq!(histogram.count(MAX_LUMINANCE), 1);
        Ok(())
    }

    #[test]
    fn test_otsu_bimodal() -> Result<(), ImageError> {
        let mut data = vec![100u16; 50];
        data.extend(vec![600u16; 50]);
        data.extend([90, 110, 590, 610]);
        let image = Image::new([104, 1].into(), data)?;

        let histogram = compute_histogram(&image);
        let threshold = histogram.otsu_threshold();
        assert!((110..590).contains(&threshold), "threshold {threshold}");
        Ok(())
    }

    #[test]
    fn test_otsu_two_levels_splits_the_gap() -> Result<(), ImageError> {
        let mut data = vec![0u16; 16];
        data.extend(vec![MAX_LUMINANCE; 48]);
        let image = Image::new([8, 8].into(), data)?;

        let histogram = compute_histogram(&image);
        assert_eq!(histogram.otsu_threshold(), 382);
        Ok(())
    }

    // between-class variance of splitting at `t`, brute force
    fn split_variance(histogram: &Histogram, t: usize) -> f64 {
        let (mut w0, mut s0, mut w1, mut s1) = (0.0, 0.0, 0.0, 0.0);
        for (value, &count) in histogram.bins().iter().enumerate() {
            let (w, s) = if value <= t {
                (&mut w0, &mut s0)
            } else {
                (&mut w1, &mut s1)
            };
            *w += count as f64;
            *s += value as f64 * count as f64;
        }
        if w0 == 0.0 || w1 == 0.0 {
            return 0.0;
        }
        let diff = s0 / w0 - s1 / w1;
        w0 * w1 * diff * diff
    }

    #[test]
    fn test_otsu_separate_maxima_do_not_merge() -> Result<(), ImageError> {
        // one dark and one bright pixel around a large two-level middle cluster
        for middle in 1..=3 {
            let mut data = vec![0u16, MAX_LUMINANCE];
            data.extend(vec![382u16; middle]);
            data.extend(vec![383u16; middle]);
            let image = Image::new([data.len(), 1].into(), data)?;

            let histogram = compute_histogram(&image);
            let threshold = histogram.otsu_threshold();
            assert_ne!(threshold, 382, "middle cluster split in half");

            let best = (0..MAX_LUMINANCE as usize)
                .map(|t| split_variance(&histogram, t))
                .fold(0.0, f64::max);
            let found = split_variance(&histogram, threshold as usize);
            assert!(
                (best - found).abs() <= best * 1e-9,
                "threshold {threshold}: {found} < {best}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_otsu_uniform_is_all_background() -> Result<(), ImageError> {
        let image = Image::from_size_val([4, 4].into(), 300u16)?;
        let histogram = compute_histogram(&image);
        assert_eq!(histogram.otsu_threshold(), 300);
        assert_eq!(histogram.mean(), Some(300.0));
        Ok(())
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = Histogram::default();
        assert_eq!(histogram.total(), 0);
        assert_eq!(histogram.mean(), None);
        assert_eq!(histogram.otsu_threshold(), 0);
    }
}
