use stipple_image::ImageError;

use crate::parallel::ParallelError;

/// An error type for the filters of this crate.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FilterError {
    /// Error raised by the image layer, including allocation failures.
    #[error(transparent)]
    ImageError(#[from] ImageError),

    /// Error raised while setting up parallel execution.
    #[error(transparent)]
    ParallelError(#[from] ParallelError),

    /// Kernel width must be odd.
    #[error("Kernel width must be an odd number, got {0}")]
    KernelWidthNotOdd(usize),

    /// Kernel height must be odd.
    #[error("Kernel height must be an odd number, got {0}")]
    KernelHeightNotOdd(usize),

    /// The number of kernel weights does not match its dimensions.
    #[error("Kernel has {0} weights but its dimensions need {1}")]
    InvalidKernelLength(usize, usize),

    /// The kernel anchor lies outside the kernel.
    #[error("Kernel anchor ({0}, {1}) lies outside the kernel")]
    InvalidKernelAnchor(usize, usize),

    /// The image has zero columns or rows.
    #[error("Image has no pixels")]
    EmptyImage,

    /// A numeric parameter is out of its domain.
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A row could not be processed; no output is produced.
    #[error("Failed to process row {row}")]
    RowFailed {
        /// Index of the first failing row.
        row: usize,
        /// What made the row fail.
        #[source]
        source: Box<FilterError>,
    },

    /// The progress monitor asked the operation to stop.
    #[error("{0} was cancelled")]
    Cancelled(&'static str),
}

/// Reject images without pixels.
pub(crate) fn ensure_not_empty<T, const C: usize>(
    src: &stipple_image::Image<T, C>,
) -> Result<(), FilterError> {
    if src.size().is_empty() {
        return Err(FilterError::EmptyImage);
    }
    Ok(())
}

/// Reject parameters that are not finite numbers.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<(), FilterError> {
    if !value.is_finite() {
        return Err(FilterError::InvalidParameter { name, value });
    }
    Ok(())
}

/// Reject fractions outside `[0, 1]`.
pub(crate) fn ensure_unit(name: &'static str, value: f64) -> Result<(), FilterError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(FilterError::InvalidParameter { name, value });
    }
    Ok(())
}
