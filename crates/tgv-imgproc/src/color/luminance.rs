use crate::{
    core::check_same_size,
    parallel::{self, ExecutionStrategy},
};
use tgv_image::{Image, ImageError, ImageSize, BPP};

/// Convert an RGBA image to luminance using the unweighted sum:
///
/// L = R + G + B
///
/// The alpha channel is ignored, so the output covers exactly `0..=765`.
///
/// # Arguments
///
/// * `src` - The input RGBA image.
/// * `dst` - The output luminance image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use tgv_image::{Image, ImageSize};
/// use tgv_imgproc::color::luminance_from_rgba;
///
/// let image = Image::<u8, 4>::new(
///     ImageSize {
///         width: 2,
///         height: 1,
///     },
///     vec![255, 255, 255, 0, 10, 20, 30, 255],
/// )
/// .unwrap();
///
/// let mut lumi = Image::<u16, 1>::from_size_val(image.size(), 0).unwrap();
///
/// luminance_from_rgba(&image, &mut lumi).unwrap();
/// assert_eq!(lumi.as_slice(), &[765, 60]);
/// ```
pub fn luminance_from_rgba(src: &Image<u8, 4>, dst: &mut Image<u16, 1>) -> Result<(), ImageError> {
    luminance_from_rgba_with_strategy(src, dst, ExecutionStrategy::default())
}

/// Same as [`luminance_from_rgba`] with an explicit execution strategy.
pub fn luminance_from_rgba_with_strategy(
    src: &Image<u8, 4>,
    dst: &mut Image<u16, 1>,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    parallel::par_iter_rows(src, dst, strategy, sum_rgb);

    Ok(())
}

/// Convert a raw RGBA byte buffer borrowed from the capture layer.
///
/// # Arguments
///
/// * `data` - Interleaved RGBA bytes, row-major, `size.width * size.height * 4` long.
/// * `size` - The frame dimensions.
/// * `dst` - The output luminance image, of size `size`.
///
/// # Errors
///
/// Returns [`ImageError::InvalidChannelShape`] when the buffer length does not
/// match the dimensions and [`ImageError::InvalidImageSize`] when `dst` has a
/// different size.
pub fn luminance_from_rgba_slice(
    data: &[u8],
    size: ImageSize,
    dst: &mut Image<u16, 1>,
) -> Result<(), ImageError> {
    if data.len() != size.area() * BPP {
        return Err(ImageError::InvalidChannelShape(data.len(), size.area() * BPP));
    }

    if dst.size() != size {
        return Err(ImageError::InvalidImageSize(
            size.width,
            size.height,
            dst.cols(),
            dst.rows(),
        ));
    }

    parallel::par_iter_pixels::<u8, BPP, u16, 1>(
        data,
        dst.as_slice_mut(),
        size.width,
        ExecutionStrategy::default(),
        sum_rgb,
    );

    Ok(())
}

#[inline]
fn sum_rgb(src_pixel: &[u8], dst_pixel: &mut [u16]) {
    dst_pixel[0] = src_pixel[0] as u16 + src_pixel[1] as u16 + src_pixel[2] as u16;
}
