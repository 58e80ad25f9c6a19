use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, PixelView, Sample};

use crate::{
    color::gray_from_image,
    context::ExecutionContext,
    core::{is_degenerate_sigma, perceptible_reciprocal},
    error::{ensure_finite, ensure_not_empty, FilterError},
    parallel::par_rows,
};

use super::{
    channels::{ChannelPlan, Role},
    kernels::{optimal_kernel_width_1d, Kernel},
};

const SELECTIVE_BLUR_TAG: &str = "SelectiveBlur/Image";

/// Weighted sums of one output pixel with a separate normalization for
/// colors, black and alpha.
struct GroupSums<const C: usize> {
    sums: [f64; C],
    color: f64,
    black: f64,
    alpha: f64,
}

impl<const C: usize> GroupSums<C> {
    fn new() -> Self {
        Self {
            sums: [0.0; C],
            color: 0.0,
            black: 0.0,
            alpha: 0.0,
        }
    }

    fn add<T: Sample>(&mut self, plan: &ChannelPlan<C>, k: f64, px: &[T]) {
        let a = plan.alpha(px);
        for (c, role) in plan.roles.iter().enumerate() {
            match role {
                Role::Color | Role::Black => self.sums[c] += k * a * px[c].to_f64(),
                Role::Alpha => self.sums[c] += k * px[c].to_f64(),
                Role::Skip => {}
            }
        }
        self.color += k * a;
        self.black += k * a;
        self.alpha += k;
    }

    /// Write every group that took at least one sample; the others keep
    /// what `dst` holds.
    fn store<T: Sample>(&self, plan: &ChannelPlan<C>, dst: &mut [T]) {
        for (c, role) in plan.roles.iter().enumerate() {
            let gamma = match role {
                Role::Color => self.color,
                Role::Black => self.black,
                Role::Alpha => self.alpha,
                Role::Skip => continue,
            };
            if gamma != 0.0 {
                dst[c] = T::from_f64(perceptible_reciprocal(gamma) * self.sums[c]);
            }
        }
    }
}

/// Blur only between pixels of similar luminance.
///
/// A tap of the gaussian window contributes when the luminance of its pixel
/// differs from the luminance of the center pixel by less than `threshold`
/// times the sample range, so edges with a larger contrast stay sharp.
/// Colors, black and alpha are normalized independently; a group without
/// any contributing tap keeps its source value, so a threshold of 0 returns
/// the source unchanged.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `radius` - The kernel radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
/// * `threshold` - The largest luminance difference blurred over, as a
///   fraction of the sample range.
/// * `ctx` - The execution context.
pub fn selective_blur<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    threshold: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("radius", radius)?;
    ensure_finite("sigma", sigma)?;
    ensure_finite("threshold", threshold)?;

    let mut dst = src.try_clone()?;
    let plan = ChannelPlan::new(src, channels);
    if plan.is_noop() {
        return Ok(dst);
    }

    // the plain gaussian, normalized per pixel over the taps kept
    let width = optimal_kernel_width_1d(radius, sigma)?;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let kernel = if is_degenerate_sigma(sigma) {
        Kernel::identity(width)?
    } else {
        Kernel::from_fn(width, width, |u, v| {
            let d = (u * u + v * v) as f64;
            (-d / two_sigma_sq).exp() / (std::f64::consts::PI * two_sigma_sq)
        })?
    };
    let limit = threshold * T::MAX;

    let luminance = gray_from_image(src, ctx)?;
    let view = PixelView::new(src);
    let luminance_view = PixelView::new(&luminance);

    let cols = src.cols();
    let half = (width / 2) as isize;
    let window_w = cols + width - 1;

    par_rows(ctx, SELECTIVE_BLUR_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        let top = y as isize - half;
        let mut window = alloc_buffer(window_w * width * C, T::default())?;
        let mut lum = alloc_buffer(window_w * width, T::default())?;
        view.read_window(-half, top, window_w, width, &mut window)?;
        luminance_view.read_window(-half, top, window_w, width, &mut lum)?;
        let centers = luminance.row(y);

        for (x, out) in row.chunks_exact_mut(C).enumerate() {
            let center = centers[x].to_f64();
            let mut sums = GroupSums::new();
            for (v, k_row) in kernel.values().chunks_exact(width).enumerate() {
                let base = v * window_w + x;
                let taps = window[base * C..(base + width) * C].chunks_exact(C);
                for ((px, &l), &k) in taps.zip(&lum[base..base + width]).zip(k_row) {
                    if (l.to_f64() - center).abs() < limit {
                        sums.add(&plan, k, px);
                    }
                }
            }
            sums.store(&plan, out);
        }
        Ok(())
    })?;

    Ok(dst)
}
