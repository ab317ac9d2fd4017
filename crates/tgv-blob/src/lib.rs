#![deny(missing_docs)]
//! # TGV Blob
//!
//! Run-length encoding of thresholded luminance images and extraction of
//! connected foreground and background blobs.

/// Error types for run-length encoding and blob extraction.
pub mod errors;

/// Run-length encoding of thresholded rows.
pub mod run_length;

/// Union-find utilities for blob unification.
pub mod union_find;

/// Row-by-row blob extraction.
pub mod extractor;

/// Frame scanning pipeline and its configuration.
pub mod scanner;

pub use crate::errors::BlobError;
pub use crate::extractor::{extract_blobs, Blob, BlobExtractor, BlobSet, Connectivity};
pub use crate::run_length::{run_length_encode, Run, RunClass, RunLengthImage};
pub use crate::scanner::{BlobScanner, ScanConfig, ScanResult, ThresholdMode};
