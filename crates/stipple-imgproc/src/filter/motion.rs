use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, PixelView, Sample};

use crate::{
    accelerate::{try_accelerated, FilterOp},
    context::ExecutionContext,
    error::{ensure_finite, ensure_not_empty, FilterError},
    parallel::par_rows,
};

use super::{
    channels::{Accumulator, ChannelPlan},
    kernels::{motion_kernel, optimal_kernel_width_1d},
};

const MOTION_BLUR_TAG: &str = "MotionBlur/Image";

/// Sample offsets along a line, with one weight per offset.
///
/// Offset `i` is `i` pixels from the origin in the direction of the angle,
/// rounded to the pixel grid. An angle of 0 points along increasing `x`, an
/// angle of 90 degrees along increasing `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetTable {
    offsets: Vec<(isize, isize)>,
    weights: Vec<f64>,
}

impl OffsetTable {
    /// Create a table of `width` equally weighted offsets along `angle` degrees.
    ///
    /// # Example
    ///
    /// ```
    /// use stipple_imgproc::filter::OffsetTable;
    ///
    /// let table = OffsetTable::new(5, 45.0).unwrap();
    /// assert_eq!(table.offsets(), &[(0, 0), (1, 1), (1, 1), (2, 2), (3, 3)]);
    /// ```
    pub fn new(width: usize, angle: f64) -> Result<Self, FilterError> {
        ensure_finite("angle", angle)?;
        let angle = angle.to_radians();
        let (px, py) = (width as f64 * angle.sin(), width as f64 * angle.cos());
        let norm = px.hypot(py);

        let mut offsets = alloc_buffer(width, (0, 0))?;
        for (i, offset) in offsets.iter_mut().enumerate() {
            let i = i as f64;
            *offset = (
                (i * py / norm - 0.5).ceil() as isize,
                (i * px / norm - 0.5).ceil() as isize,
            );
        }
        let weights = alloc_buffer(width, 1.0 / width as f64)?;
        Ok(Self { offsets, weights })
    }

    /// Weight the offsets with the one-sided gaussian of [`motion_kernel`].
    pub fn with_gaussian(mut self, sigma: f64) -> Result<Self, FilterError> {
        self.weights = motion_kernel(self.offsets.len(), sigma)?;
        Ok(self)
    }

    /// The `(dx, dy)` offsets, nearest first.
    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }

    /// The weight of each offset.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Simulate motion blur: each pixel averages the pixels in front of it
/// along `angle` degrees with one-sided gaussian weights.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `radius` - The length of the blur in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
/// * `angle` - The direction of the motion in degrees.
/// * `ctx` - The execution context.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::{context::ExecutionContext, filter::motion_blur};
///
/// let image = Image::<u8, 1>::new([5, 1].into(), vec![0, 0, 0, 255, 0]).unwrap();
/// let ctx = ExecutionContext::default();
/// let out = motion_blur(&image, ChannelMask::DEFAULT, 1.0, 1.0, 0.0, &ctx).unwrap();
/// assert_eq!(out.as_slice(), &[0, 20, 89, 146, 0]);
/// ```
pub fn motion_blur<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    angle: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;
    ensure_finite("angle", angle)?;

    let op = FilterOp::MotionBlur {
        channels,
        radius,
        sigma,
        angle,
    };
    if let Some(dst) = try_accelerated(ctx, &op, src) {
        return Ok(dst);
    }

    let width = optimal_kernel_width_1d(radius, sigma)?;
    let table = OffsetTable::new(width, angle)?.with_gaussian(sigma)?;
    log::debug!("motion blur: {} taps along {} degrees", width, angle);

    let mut dst = src.try_clone()?;
    let plan = ChannelPlan::new(src, channels);
    if plan.is_noop() {
        return Ok(dst);
    }

    let view = PixelView::new(src);
    let cols = src.cols();
    par_rows(ctx, MOTION_BLUR_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        let mut px = [T::default(); C];
        for (x, out) in row.chunks_exact_mut(C).enumerate() {
            let mut acc = Accumulator::new();
            for (&(dx, dy), &k) in table.offsets().iter().zip(table.weights()) {
                view.read_pixel(x as isize + dx, y as isize + dy, &mut px);
                acc.add(&plan, k, &px);
            }
            acc.store(&plan, out);
        }
        Ok(())
    })?;

    Ok(dst)
}
