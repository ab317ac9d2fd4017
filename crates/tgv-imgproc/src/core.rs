use tgv_image::{Image, ImageError};

/// Inclusive bounds of the window of `radius` around `center`, clamped to `0..len`.
///
/// Only in-bounds neighbours take part in a window, so pixels near the border
/// use the intersection of the full window with the image.
///
/// PRECONDITION: `center < len`.
///
/// # Example
///
/// ```
/// use tgv_imgproc::core::clamped_window;
///
/// assert_eq!(clamped_window(0, 2, 10), (0, 2));
/// assert_eq!(clamped_window(5, 2, 10), (3, 7));
/// assert_eq!(clamped_window(9, 2, 10), (7, 9));
/// ```
#[inline]
pub fn clamped_window(center: usize, radius: usize, len: usize) -> (usize, usize) {
    (
        center.saturating_sub(radius),
        center.saturating_add(radius).min(len - 1),
    )
}

/// Check that two images have the same size.
pub(crate) fn check_same_size<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &Image<T2, C2>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_window() {
        assert_eq!(clamped_window(0, 0, 1), (0, 0));
        assert_eq!(clamped_window(3, 1, 4), (2, 3));
        assert_eq!(clamped_window(1, usize::MAX, 4), (0, 3));
    }

    #[test]
    fn test_check_same_size() -> Result<(), ImageError> {
        let a = Image::<u8, 4>::from_size_val([3, 2].into(), 0)?;
        let b = Image::<u16, 1>::from_size_val([3, 2].into(), 0)?;
        let c = Image::<u16, 1>::from_size_val([2, 3].into(), 0)?;
        assert!(check_same_size(&a, &b).is_ok());
        assert_eq!(
            check_same_size(&a, &c),
            Err(ImageError::InvalidImageSize(3, 2, 2, 3))
        );
        Ok(())
    }
}
