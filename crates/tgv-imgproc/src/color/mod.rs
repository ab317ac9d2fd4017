mod luminance;

pub use luminance::{
    luminance_from_rgba, luminance_from_rgba_slice, luminance_from_rgba_with_strategy,
};
