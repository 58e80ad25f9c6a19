#![deny(missing_docs)]
//! Image types, sample traits and boundary-extended pixel access

/// fallible buffer allocation.
pub mod allocator;

/// colorspaces, channel roles and channel masks.
pub mod color_spaces;

/// Error types for the image module.
pub mod error;

/// image representation for image processing purposes.
pub mod image;

/// sample types an image can store.
pub mod sample;

/// boundary-extended read access to images.
pub mod view;

pub use crate::color_spaces::{ChannelKind, ChannelMask, ColorSpace};
pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
pub use crate::sample::Sample;
pub use crate::view::{PaddingMode, PixelView};
