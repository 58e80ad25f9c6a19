use crate::color_spaces::ColorSpace;

/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images that must agree in size do not.
    #[error("Image size ({0}x{1}) does not match the expected size ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index ({0}) is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when the pixel coordinates are out of bounds.
    #[error("Pixel coordinates ({0}, {1}) are out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when a colorspace cannot describe the channel layout.
    #[error("Colorspace {0:?} cannot describe an image with {1} channels")]
    IncompatibleColorSpace(ColorSpace, usize),

    /// Error when a pixel window is empty or the destination buffer has the wrong length.
    #[error("Invalid window of {0}x{1} pixels for a buffer of {2} samples")]
    InvalidWindow(usize, usize, usize),

    /// Error when a sample cannot be represented by the target type.
    #[error("Failed to cast image data")]
    CastError,

    /// Error when a pixel buffer cannot be allocated.
    #[error("Failed to allocate a buffer of {0} samples")]
    AllocationFailed(usize),
}
