use tgv_image::{Image, ImageError};

use crate::{
    core::{check_same_size, clamped_window},
    parallel::{self, ExecutionStrategy},
};

/// Applies grey-level dilation with a square window of the given radius.
///
/// Each output pixel is the maximum over the `(2 * radius + 1)²` window centred
/// on it; only in-bounds neighbours are considered. Radius 0 is an identity copy.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image.
/// * `radius` - The window radius in pixels.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
///
/// # Example
///
/// ```
/// use tgv_image::{Image, ImageSize};
/// use tgv_imgproc::morphology::dilate;
///
/// let src = Image::<u16, 1>::new(ImageSize { width: 4, height: 1 }, vec![0, 9, 0, 0]).unwrap();
/// let mut dst = Image::from_size_val(src.size(), 0).unwrap();
///
/// dilate(&src, &mut dst, 1).unwrap();
/// assert_eq!(dst.as_slice(), &[9, 9, 9, 0]);
/// ```
pub fn dilate<T>(src: &Image<T, 1>, dst: &mut Image<T, 1>, radius: usize) -> Result<(), ImageError>
where
    T: Copy + Ord + Default + Send + Sync,
{
    dilate_with_strategy(src, dst, radius, ExecutionStrategy::default())
}

/// Same as [`dilate`] with an explicit execution strategy.
///
/// The square window maximum separates into a row maximum followed by a
/// column maximum over the row results, which gives the same value as the
/// direct 2D window.
pub fn dilate_with_strategy<T>(
    src: &Image<T, 1>,
    dst: &mut Image<T, 1>,
    radius: usize,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError>
where
    T: Copy + Ord + Default + Send + Sync,
{
    check_same_size(src, dst)?;

    if radius == 0 {
        dst.as_slice_mut().copy_from_slice(src.as_slice());
        return Ok(());
    }

    let (width, height) = (src.width(), src.height());
    let src_data = src.as_slice();

    // horizontal pass
    let mut row_max = vec![T::default(); width * height];
    parallel::par_iter_rows_indexed(&mut row_max, width, strategy, |y, max_row| {
        let row = &src_data[y * width..(y + 1) * width];
        for (x, out) in max_row.iter_mut().enumerate() {
            let (lo, hi) = clamped_window(x, radius, width);
            *out = window_max(&row[lo..=hi]);
        }
    });

    // vertical pass
    let row_max = &row_max;
    parallel::par_iter_rows_indexed(dst.as_slice_mut(), width, strategy, |y, dst_row| {
        let (lo, hi) = clamped_window(y, radius, height);
        dst_row.copy_from_slice(&row_max[lo * width..(lo + 1) * width]);
        for k in lo + 1..=hi {
            let above = &row_max[k * width..(k + 1) * width];
            dst_row
                .iter_mut()
                .zip(above.iter())
                .for_each(|(d, &s)| *d = (*d).max(s));
        }
    });

    Ok(())
}

// the window is never empty since it always holds its center
#[inline]
fn window_max<T: Copy + Ord>(window: &[T]) -> T {
    let mut max = window[0];
    for &v in &window[1..] {
        max = max.max(v);
    }
    max
}
