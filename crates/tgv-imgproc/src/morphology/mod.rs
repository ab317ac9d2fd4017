// Morphological image processing operations.

/// Dilation operations for luminance images.
pub mod dilation;

/// Core dilation functions:
/// - `dilate`: square window maximum, clamped to the image bounds.
/// - `dilate_with_strategy`: same, with an explicit execution strategy.
pub use dilation::{dilate, dilate_with_strategy};
