//! Spatial filters
//!
//! Kernel construction, the convolution executor and the filters built on it.

/// Filter kernels
pub mod kernels;

mod channels;

mod convolution;
pub use convolution::convolve;

mod ops;
pub use ops::*;

mod adaptive;
pub use adaptive::{adaptive_blur, adaptive_sharpen};

mod despeckle;
pub use despeckle::despeckle;

mod motion;
pub use motion::{motion_blur, OffsetTable};

mod rotational;
pub use rotational::rotational_blur;

mod selective;
pub use selective::selective_blur;

mod unsharp;
pub use unsharp::unsharp_mask;

mod shade;
pub use shade::shade;

mod spread;
pub use spread::spread;
