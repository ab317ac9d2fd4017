//! Filter operations
//!
//! This module provides window filters over luminance images.

/// Filter operations
mod ops;
pub use ops::*;
