#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use stipple_image as image;

#[doc(inline)]
pub use stipple_imgproc as imgproc;
