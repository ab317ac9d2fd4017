#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// luminance extraction module.
pub mod color;

/// neighbourhood window helpers shared by the filters.
pub mod core;

/// image filtering module.
pub mod filter;

/// compute luminance histogram module.
pub mod histogram;

/// morphological operations module.
pub mod morphology;

/// module containing parallization utilities.
pub mod parallel;
