/// Errors that can occur when encoding runs or extracting blobs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlobError {
    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] tgv_image::ImageError),

    /// The threshold is outside the luminance range `0..=765`.
    #[error("Threshold {0} is outside the luminance range 0..=765")]
    InvalidThreshold(u16),
}
