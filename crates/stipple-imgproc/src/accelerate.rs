//! Optional accelerated implementations of the filters.
//!
//! An [`Accelerator`] is asked first by every filter that has an accelerated
//! form. It may decline by returning `None`, in which case the reference
//! implementation of this crate runs. Accelerated results are not required to
//! be bit-identical to the reference ones.

use std::any::Any;

use stipple_image::{ChannelMask, Image, Sample};

use crate::{context::ExecutionContext, filter::kernels::Kernel};

/// A filter request handed to an [`Accelerator`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum FilterOp<'a> {
    /// Correlate with an arbitrary kernel (gaussian, sharpen, edge, emboss, user kernels).
    Convolve {
        /// Channels to filter.
        channels: ChannelMask,
        /// The kernel.
        kernel: &'a Kernel,
    },
    /// Separable gaussian blur.
    Blur {
        /// Channels to filter.
        channels: ChannelMask,
        /// Blur radius in pixels, 0 to derive it from sigma.
        radius: f64,
        /// Standard deviation of the gaussian.
        sigma: f64,
    },
    /// Speckle removal.
    Despeckle {
        /// Channels to filter.
        channels: ChannelMask,
    },
    /// Blur along a line.
    MotionBlur {
        /// Channels to filter.
        channels: ChannelMask,
        /// Blur radius in pixels, 0 to derive it from sigma.
        radius: f64,
        /// Standard deviation of the gaussian.
        sigma: f64,
        /// Direction of the motion in degrees.
        angle: f64,
    },
    /// Blur along arcs around the image center.
    RotationalBlur {
        /// Channels to filter.
        channels: ChannelMask,
        /// Angle of the arc in degrees.
        angle: f64,
    },
    /// Unsharp masking.
    UnsharpMask {
        /// Channels to filter.
        channels: ChannelMask,
        /// Blur radius in pixels, 0 to derive it from sigma.
        radius: f64,
        /// Standard deviation of the gaussian.
        sigma: f64,
        /// Fraction of the difference added back.
        gain: f64,
        /// Minimum difference, as a fraction of the sample range, to sharpen.
        threshold: f64,
    },
}

impl FilterOp<'_> {
    /// Short name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Convolve { .. } => "convolve",
            FilterOp::Blur { .. } => "blur",
            FilterOp::Despeckle { .. } => "despeckle",
            FilterOp::MotionBlur { .. } => "motion_blur",
            FilterOp::RotationalBlur { .. } => "rotational_blur",
            FilterOp::UnsharpMask { .. } => "unsharp_mask",
        }
    }
}

/// An alternative implementation of some filters.
///
/// The source image is passed type-erased as `&Image<T, C>`; an
/// implementation downcasts it to the sample types and channel counts it
/// supports and must return a boxed `Image<T, C>` of the same type and size.
pub trait Accelerator: Send + Sync {
    /// Try to run `op` on `src`; `None` lets the reference implementation run.
    fn try_filter(&self, op: &FilterOp<'_>, src: &dyn Any) -> Option<Box<dyn Any>>;
}

/// Run `op` on the context's accelerator, if any, and recover the typed result.
pub(crate) fn try_accelerated<T: Sample, const C: usize>(
    ctx: &ExecutionContext<'_>,
    op: &FilterOp<'_>,
    src: &Image<T, C>,
) -> Option<Image<T, C>> {
    let accelerator = ctx.accelerator()?;
    let Some(out) = accelerator.try_filter(op, src) else {
        log::debug!("{} declined by accelerator, using reference path", op.name());
        return None;
    };

    match out.downcast::<Image<T, C>>() {
        Ok(image) if image.size() == src.size() => {
            log::debug!("{} served by accelerator", op.name());
            Some(*image)
        }
        Ok(image) => {
            log::warn!(
                "accelerated {} returned {} for a {} source, using reference path",
                op.name(),
                image.size(),
                src.size()
            );
            None
        }
        Err(_) => {
            log::warn!(
                "accelerated {} returned a foreign image type, using reference path",
                op.name()
            );
            None
        }
    }
}
