#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use tgv_image as image;

#[doc(inline)]
pub use tgv_imgproc as imgproc;

#[doc(inline)]
pub use tgv_io as io;

#[doc(inline)]
pub use tgv_blob as blob;
