use stipple_image::{ChannelMask, Image, Sample};

use crate::{
    accelerate::{try_accelerated, FilterOp},
    context::ExecutionContext,
    error::{ensure_finite, FilterError},
    histogram::equalize,
};

use super::{
    convolution::convolve,
    kernels::{self, Kernel},
};

/// Apply a user kernel, trying the context's accelerator first.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `kernel` - The correlation kernel.
/// * `ctx` - The execution context.
pub fn filter2d<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    kernel: &Kernel,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    let op = FilterOp::Convolve { channels, kernel };
    if let Some(dst) = try_accelerated(ctx, &op, src) {
        return Ok(dst);
    }
    convolve(src, channels, kernel, ctx)
}

/// Apply a square kernel given by its order and row-major weights.
///
/// # Errors
///
/// An even `order` or a weight count other than `order * order` is rejected
/// before any pixel is read.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::{context::ExecutionContext, error::FilterError, filter::convolve_order};
///
/// let image = Image::<u8, 1>::from_size_val([4, 4].into(), 10).unwrap();
/// let ctx = ExecutionContext::default();
///
/// let res = convolve_order(&image, ChannelMask::DEFAULT, 2, &[0.25; 4], &ctx);
/// assert_eq!(res, Err(FilterError::KernelWidthNotOdd(2)));
///
/// let out = convolve_order(&image, ChannelMask::DEFAULT, 1, &[2.0], &ctx).unwrap();
/// assert_eq!(out.as_slice(), &[20; 16]);
/// ```
pub fn convolve_order<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    order: usize,
    values: &[f64],
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    if order % 2 == 0 {
        return Err(FilterError::KernelWidthNotOdd(order));
    }
    let values = stipple_image::allocator::alloc_copy(values)?;
    let kernel = Kernel::new(order, order, values)?;
    filter2d(src, channels, &kernel, ctx)
}

/// Blur an image with a square gaussian kernel.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `radius` - The kernel radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
/// * `ctx` - The execution context.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::{context::ExecutionContext, filter::gaussian_blur};
///
/// let image = Image::<u8, 3>::from_size_val([3, 3].into(), 128).unwrap();
/// let out = gaussian_blur(&image, ChannelMask::DEFAULT, 0.0, 1.0, &ExecutionContext::default()).unwrap();
/// assert_eq!(out.as_slice(), &[128; 27]);
/// ```
pub fn gaussian_blur<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;
    let kernel = kernels::gaussian_kernel_2d(radius, sigma)?;
    filter2d(src, channels, &kernel, ctx)
}

/// Blur an image with a separable gaussian: a horizontal pass followed by a
/// vertical pass of the same line kernel.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `radius` - The kernel radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
/// * `ctx` - The execution context.
pub fn blur<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;
    let op = FilterOp::Blur {
        channels,
        radius,
        sigma,
    };
    if let Some(dst) = try_accelerated(ctx, &op, src) {
        return Ok(dst);
    }

    let horizontal = kernels::gaussian_kernel_1d(radius, sigma)?;
    let vertical = horizontal.transpose()?;
    let tmp = convolve(src, channels, &horizontal, ctx)?;
    convolve(&tmp, channels, &vertical, ctx)
}

/// Sharpen an image with a laplacian of gaussian kernel.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `radius` - The kernel radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
/// * `ctx` - The execution context.
pub fn sharpen<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;
    let kernel = kernels::sharpen_kernel(radius, sigma)?;
    filter2d(src, channels, &kernel, ctx)
}

/// Highlight edges with a kernel of -1 weights around a balancing center.
///
/// Flat areas become black. Applies to every channel but alpha.
pub fn edge<T: Sample, const C: usize>(
    src: &Image<T, C>,
    radius: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_finite("radius", radius)?;
    let kernel = kernels::edge_kernel(radius)?;
    filter2d(src, ChannelMask::DEFAULT, &kernel, ctx)
}

/// Emboss an image: a directional relief kernel followed by histogram
/// equalization of the result.
pub fn emboss<T: Sample, const C: usize>(
    src: &Image<T, C>,
    radius: f64,
    sigma: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;
    let kernel = kernels::emboss_kernel(radius, sigma)?;
    let mut dst = filter2d(src, ChannelMask::DEFAULT, &kernel, ctx)?;
    equalize(&mut dst, ChannelMask::DEFAULT)?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerate::Accelerator;
    use std::any::Any;

    #[test]
    fn blur_spreads_a_dot() -> Result<(), FilterError> {
        let mut data = vec![0u8; 25];
        data[12] = 255;
        let image = Image::<u8, 1>::new([5, 5].into(), data)?;
        let ctx = ExecutionContext::default();

        for out in [
            gaussian_blur(&image, ChannelMask::DEFAULT, 0.0, 1.0, &ctx)?,
            blur(&image, ChannelMask::DEFAULT, 0.0, 1.0, &ctx)?,
        ] {
            let px = out.as_slice();
            assert!(px[12] < 255);
            for n in [7, 11, 13, 17] {
                assert!(px[n] > 0);
                assert!(px[n] < px[12]);
            }
            assert_eq!(px[7], px[17]);
            assert_eq!(px[11], px[13]);
        }
        Ok(())
    }

    #[test]
    fn separable_matches_square() -> Result<(), FilterError> {
        let data = (0..64u32).map(|i| ((i * 37) % 251) as u8).collect();
        let image = Image::<u8, 1>::new([8, 8].into(), data)?;
        let ctx = ExecutionContext::default();
        let a = gaussian_blur(&image, ChannelMask::DEFAULT, 2.0, 1.0, &ctx)?;
        let b = blur(&image, ChannelMask::DEFAULT, 2.0, 1.0, &ctx)?;
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((*x as i32 - *y as i32).abs() <= 1);
        }
        Ok(())
    }

    #[test]
    fn sharpen_keeps_flat_areas() -> Result<(), FilterError> {
        let image = Image::<u8, 3>::from_size_val([6, 4].into(), 77)?;
        let out = sharpen(&image, ChannelMask::DEFAULT, 0.0, 1.0, &ExecutionContext::default())?;
        assert_eq!(out, image);
        Ok(())
    }

    #[test]
    fn sharpen_increases_contrast() -> Result<(), FilterError> {
        let data = [100u8, 100, 100, 150, 150, 150].repeat(3);
        let image = Image::<u8, 1>::new([6, 3].into(), data)?;
        let out = sharpen(&image, ChannelMask::DEFAULT, 1.0, 1.0, &ExecutionContext::default())?;
        let row = out.row(1);
        assert!(row[2] < 100);
        assert!(row[3] > 150);
        assert_eq!(row[0], 100);
        assert_eq!(row[5], 150);
        Ok(())
    }

    #[test]
    fn edge_of_flat_image_is_black() -> Result<(), FilterError> {
        let image = Image::<u8, 4>::from_size_val([5, 5].into(), 200)?;
        let out = edge(&image, 1.0, &ExecutionContext::default())?;
        for px in out.as_slice().chunks_exact(4) {
            assert_eq!(px, &[0, 0, 0, 200]);
        }
        Ok(())
    }

    #[test]
    fn edge_marks_a_step() -> Result<(), FilterError> {
        let data = [0u8, 0, 0, 255, 255, 255].repeat(4);
        let image = Image::<u8, 1>::new([6, 4].into(), data)?;
        let out = edge(&image, 1.0, &ExecutionContext::default())?;
        let row = out.row(1);
        assert_eq!(row, &[0, 0, 0, 255, 0, 0]);
        Ok(())
    }

    #[test]
    fn emboss_of_flat_image_stays_flat() -> Result<(), FilterError> {
        let image = Image::<u8, 1>::from_size_val([5, 5].into(), 90)?;
        let out = emboss(&image, 1.0, 1.0, &ExecutionContext::default())?;
        let first = out.as_slice()[0];
        assert!(out.as_slice().iter().all(|v| *v == first));
        Ok(())
    }

    struct Negate;

    impl Accelerator for Negate {
        fn try_filter(&self, op: &FilterOp<'_>, src: &dyn Any) -> Option<Box<dyn Any>> {
            let FilterOp::Convolve { .. } = op else {
                return None;
            };
            let src = src.downcast_ref::<Image<u8, 1>>()?;
            let mut out = src.try_clone().ok()?;
            out.as_slice_mut().iter_mut().for_each(|v| *v = 255 - *v);
            Some(Box::new(out))
        }
    }

    #[test]
    fn accelerator_goes_first() -> Result<(), FilterError> {
        let image = Image::<u8, 1>::from_size_val([3, 3].into(), 5)?;
        let accel = Negate;
        let ctx = ExecutionContext::default().with_accelerator(&accel);

        let out = gaussian_blur(&image, ChannelMask::DEFAULT, 0.0, 1.0, &ctx)?;
        assert_eq!(out.as_slice(), &[250; 9]);

        // the accelerator declines separable blurs
        let out = blur(&image, ChannelMask::DEFAULT, 0.0, 1.0, &ctx)?;
        assert_eq!(out.as_slice(), &[5; 9]);
        Ok(())
    }

    #[test]
    fn rejects_non_finite_parameters() -> Result<(), FilterError> {
        let image = Image::<u8, 1>::from_size_val([3, 3].into(), 5)?;
        let res = blur(&image, ChannelMask::DEFAULT, 0.0, f64::NAN, &ExecutionContext::default());
        assert!(matches!(
            res,
            Err(FilterError::InvalidParameter { name: "sigma", .. })
        ));
        Ok(())
    }
}
