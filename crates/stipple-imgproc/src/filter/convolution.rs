use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, PixelView, Sample};

use crate::{
    context::ExecutionContext,
    error::{ensure_not_empty, FilterError},
    parallel::par_rows,
};

use super::{
    channels::{Accumulator, ChannelPlan},
    kernels::Kernel,
};

const CONVOLVE_TAG: &str = "Convolve/Image";

/// Correlate an image with a kernel.
///
/// This is the reference implementation behind every kernel based filter;
/// it never consults the accelerator. Each output row reads a window of
/// `cols + kernel.width() - 1` by `kernel.height()` source pixels, with
/// edge pixels duplicated outside the image, and rows run in parallel.
///
/// When `channels` selects alpha and the image has alpha, color and black
/// samples are weighted by their alpha and normalized by the accumulated
/// weight; the alpha channel itself is a plain weighted sum. Channels not in
/// `channels` keep their source values.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `kernel` - The correlation kernel.
/// * `ctx` - The execution context.
///
/// # Errors
///
/// Returns an error for an empty image, when a buffer cannot be allocated,
/// when a row fails or when the progress monitor cancels the call.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::{context::ExecutionContext, filter::{convolve, kernels::Kernel}};
///
/// let image = Image::<u8, 1>::new([3, 1].into(), vec![0, 90, 0]).unwrap();
/// let kernel = Kernel::new(3, 1, vec![1.0 / 3.0; 3]).unwrap();
/// let out = convolve(&image, ChannelMask::DEFAULT, &kernel, &ExecutionContext::default()).unwrap();
/// assert_eq!(out.as_slice(), &[30, 30, 30]);
/// ```
pub fn convolve<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    kernel: &Kernel,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;

    let mut dst = src.try_clone()?;
    let plan = ChannelPlan::new(src, channels);
    if plan.is_noop() {
        return Ok(dst);
    }

    let view = PixelView::new(src);
    let cols = src.cols();
    let (kw, kh) = (kernel.width(), kernel.height());
    let (ax, ay) = kernel.anchor();
    let window_w = cols + kw - 1;
    let weights = kernel.values();

    par_rows(ctx, CONVOLVE_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        let mut window = alloc_buffer(window_w * kh * C, T::default())?;
        view.read_window(
            -(ax as isize),
            y as isize - ay as isize,
            window_w,
            kh,
            &mut window,
        )?;

        for (x, out) in row.chunks_exact_mut(C).enumerate() {
            let mut acc = Accumulator::new();
            for v in 0..kh {
                let base = (v * window_w + x) * C;
                let taps = &window[base..base + kw * C];
                let k_row = &weights[v * kw..(v + 1) * kw];
                for (px, &k) in taps.chunks_exact(C).zip(k_row) {
                    acc.add(&plan, k, px);
                }
            }
            acc.store(&plan, out);
        }
        Ok(())
    })?;

    Ok(dst)
}
