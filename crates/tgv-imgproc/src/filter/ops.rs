use tgv_image::{Image, ImageError};

use crate::{
    core::{check_same_size, clamped_window},
    parallel::{self, ExecutionStrategy},
};

/// Blur a luminance image with a square box filter.
///
/// Each output pixel is the mean of the `(2 * radius + 1)²` window centred on
/// it, clamped to the image bounds, rounded half up:
/// `(sum + count / 2) / count`. Radius 0 copies the input.
///
/// # Arguments
///
/// * `src` - The source luminance image.
/// * `dst` - The destination luminance image.
/// * `radius` - The window radius in pixels.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
///
/// # Example
///
/// ```
/// use tgv_image::{Image, ImageSize};
/// use tgv_imgproc::filter::box_blur;
///
/// let src = Image::<u16, 1>::new(ImageSize { width: 3, height: 1 }, vec![0, 30, 60]).unwrap();
/// let mut dst = Image::from_size_val(src.size(), 0).unwrap();
///
/// box_blur(&src, &mut dst, 1).unwrap();
/// assert_eq!(dst.as_slice(), &[15, 30, 45]);
/// ```
pub fn box_blur(
    src: &Image<u16, 1>,
    dst: &mut Image<u16, 1>,
    radius: usize,
) -> Result<(), ImageError> {
    box_blur_with_strategy(src, dst, radius, ExecutionStrategy::default())
}

/// Same as [`box_blur`] with an explicit execution strategy.
///
/// Runs as two 1D passes: a running sum along each row produces exact integer
/// window sums, then each output row adds up the row sums of the rows in its
/// vertical window and divides once by the 2D pixel count. Dividing only at the
/// end keeps the result identical to evaluating the 2D window directly.
pub fn box_blur_with_strategy(
    src: &Image<u16, 1>,
    dst: &mut Image<u16, 1>,
    radius: usize,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    if radius == 0 {
        dst.as_slice_mut().copy_from_slice(src.as_slice());
        return Ok(());
    }

    let (width, height) = (src.width(), src.height());
    let src_data = src.as_slice();

    // horizontal pass: exact row sums of the clamped window
    let mut row_sums = vec![0u64; width * height];
    parallel::par_iter_rows_indexed(&mut row_sums, width, strategy, |y, sums_row| {
        let row = &src_data[y * width..(y + 1) * width];
        let mut prefix = Vec::with_capacity(width + 1);
        prefix.push(0u64);
        let mut acc = 0u64;
        for &px in row {
            acc += px as u64;
            prefix.push(acc);
        }
        for (x, sum) in sums_row.iter_mut().enumerate() {
            let (lo, hi) = clamped_window(x, radius, width);
            *sum = prefix[hi + 1] - prefix[lo];
        }
    });

    let col_counts: Vec<u64> = (0..width)
        .map(|x| {
            let (lo, hi) = clamped_window(x, radius, width);
            (hi - lo + 1) as u64
        })
        .collect();

    // vertical pass: sum the row sums and divide by the window area
    let row_sums = &row_sums;
    parallel::par_iter_rows_indexed(dst.as_slice_mut(), width, strategy, |y, dst_row| {
        let (lo, hi) = clamped_window(y, radius, height);
        let row_count = (hi - lo + 1) as u64;
        for (x, out) in dst_row.iter_mut().enumerate() {
            let sum: u64 = (lo..=hi).map(|k| row_sums[k * width + x]).sum();
            let count = col_counts[x] * row_count;
            *out = ((sum + count / 2) / count) as u16;
        }
    });

    Ok(())
}
