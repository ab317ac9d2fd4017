#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access and PNG encoding/decoding failures.
pub mod error;

/// PNG image encoding and decoding.
///
/// Read RGBA frames from PNG files and dump luminance buffers for inspection.
pub mod png;

pub use crate::error::IoError;
