use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, PixelView, Sample};

use crate::{
    color::pixel_intensity,
    context::ExecutionContext,
    core::is_degenerate_sigma,
    error::{ensure_finite, ensure_not_empty, FilterError},
    normalize::level,
    parallel::par_rows,
};

use super::{
    channels::{Accumulator, ChannelPlan},
    kernels::{adaptive_kernels, optimal_kernel_width_2d, Polarity},
    ops::{blur, edge},
};

const ADAPTIVE_BLUR_TAG: &str = "AdaptiveBlur/Image";
const ADAPTIVE_SHARPEN_TAG: &str = "AdaptiveSharpen/Image";

/// Blur an image less where it has edges.
///
/// The strength of the edges in the neighbourhood of each pixel picks the
/// kernel from a family of gaussians of decreasing width: flat areas get
/// the full width, strong edges a single tap.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `radius` - The kernel radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
/// * `ctx` - The execution context.
///
/// # Returns
///
/// A copy of the source when `sigma` is degenerate.
pub fn adaptive_blur<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    adaptive(src, channels, radius, sigma, Polarity::Blur, ctx)
}

/// Sharpen an image more where it has edges.
///
/// The mirror of [`adaptive_blur`] with laplacian of gaussian kernels: the
/// full width applies on strong edges, flat areas are left alone.
pub fn adaptive_sharpen<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    adaptive(src, channels, radius, sigma, Polarity::Sharpen, ctx)
}

/// Offset into the kernel family for a normalized edge strength.
///
/// Always even and at most `width - 1`, so the selected kernel has an odd
/// width of at least one.
fn kernel_offset(width: usize, strength: f64) -> usize {
    let i = (width as f64 * strength - 0.5).ceil();
    // NaN lands on the widest kernel
    let i = if i > 0.0 { i.min(width as f64) as usize } else { 0 };
    i - (i & 1)
}

fn adaptive<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    polarity: Polarity,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;

    let mut dst = src.try_clone()?;
    let plan = ChannelPlan::new(src, channels);
    if is_degenerate_sigma(sigma) || plan.is_noop() {
        return Ok(dst);
    }

    let mut edges = edge(src, radius, ctx)?;
    level(&mut edges, ChannelMask::DEFAULT, 0.2, 0.95)?;
    let mut edges = blur(&edges, ChannelMask::DEFAULT, radius, sigma, ctx)?;
    level(&mut edges, ChannelMask::DEFAULT, 0.1, 0.95)?;

    let width = optimal_kernel_width_2d(radius, sigma)?;
    let family = adaptive_kernels(width, sigma, polarity)?;

    let tag = match polarity {
        Polarity::Blur => ADAPTIVE_BLUR_TAG,
        Polarity::Sharpen => ADAPTIVE_SHARPEN_TAG,
    };
    let view = PixelView::new(src);
    let colorspace = edges.colorspace();
    let cols = src.cols();

    par_rows(ctx, tag, dst.as_slice_mut(), cols * C, |y, row| {
        let mut window = alloc_buffer(width * width * C, T::default())?;
        let edge_row = edges.row(y);

        for (x, (out, edge_px)) in row
            .chunks_exact_mut(C)
            .zip(edge_row.chunks_exact(C))
            .enumerate()
        {
            let strength = pixel_intensity(colorspace, edge_px) / T::MAX;
            let strength = match polarity {
                Polarity::Blur => strength,
                Polarity::Sharpen => 1.0 - strength,
            };
            let n = kernel_offset(width, strength) / 2;
            let kernel = &family[n];

            let kw = kernel.width();
            let half = (kw / 2) as isize;
            let taps = &mut window[..kw * kw * C];
            view.read_window(x as isize - half, y as isize - half, kw, kw, taps)?;

            let mut acc = Accumulator::new();
            for (px, &k) in taps.chunks_exact(C).zip(kernel.values()) {
                acc.add(&plan, k, px);
            }
            acc.store(&plan, out);
        }
        Ok(())
    })?;

    Ok(dst)
}
