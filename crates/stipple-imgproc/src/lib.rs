#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// optional accelerated implementations tried before the reference filters.
pub mod accelerate;

/// canny edge detection module.
pub mod canny;

/// color to gray projection module.
pub mod color;

/// execution context shared by the filters.
pub mod context;

/// numerical helpers.
pub mod core;

/// error types of the filters.
pub mod error;

/// image filtering module.
pub mod filter;

/// compute image histogram module.
pub mod histogram;

/// operations to normalize images.
pub mod normalize;

/// module containing parallization utilities.
pub mod parallel;

/// random generators for the filters that draw noise.
pub mod random;
