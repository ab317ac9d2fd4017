#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image representation for frame analysis purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize, LuminanceImage, RgbaImage};

/// Number of bytes per RGBA pixel.
pub const BPP: usize = 4;

/// Largest luminance value, reached by a white pixel: `255 * 3`.
pub const MAX_LUMINANCE: u16 = 255 * 3;

/// Number of distinct luminance values, `0..=MAX_LUMINANCE`.
pub const LUMINANCES: usize = MAX_LUMINANCE as usize + 1;
