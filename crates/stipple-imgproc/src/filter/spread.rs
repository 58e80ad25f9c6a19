use rand::Rng;
use stipple_image::{Image, PixelView, Sample};

use crate::{
    context::ExecutionContext,
    error::{ensure_finite, ensure_not_empty, FilterError},
    parallel::par_rows,
    random::RngArena,
};

use super::kernels::optimal_kernel_width_1d;

const SPREAD_TAG: &str = "Spread/Image";

/// Displace every pixel by a random amount within `radius`.
///
/// Each output pixel copies the source pixel nearest to a random point of
/// the square of side `optimal_kernel_width_1d(radius, 0.5)` centered on it,
/// with edge pixels duplicated outside the image. Every row draws from its
/// own generator of an [`RngArena`] seeded with the context seed, so the
/// output only depends on the seed.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `radius` - The largest displacement in pixels.
/// * `ctx` - The execution context.
///
/// # Example
///
/// ```
/// use stipple_image::Image;
/// use stipple_imgproc::{context::ExecutionContext, filter::spread};
///
/// let image = Image::<u8, 3>::from_size_val([4, 4].into(), 9).unwrap();
/// let out = spread(&image, 2.0, &ExecutionContext::default().with_seed(1)).unwrap();
/// assert_eq!(out, image);
/// ```
pub fn spread<T: Sample, const C: usize>(
    src: &Image<T, C>,
    radius: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("radius", radius)?;

    let width = optimal_kernel_width_1d(radius, 0.5)? as f64;
    let arena = RngArena::new(ctx.seed());
    let view = PixelView::new(src);
    let cols = src.cols();

    let mut dst = src.try_clone()?;
    par_rows(ctx, SPREAD_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        let mut rng = arena.generator(y);
        for (x, out) in row.chunks_exact_mut(C).enumerate() {
            let dx = width * (rng.random::<f64>() - 0.5);
            let dy = width * (rng.random::<f64>() - 0.5);
            let sx = (x as f64 + dx).round() as isize;
            let sy = (y as f64 + dy).round() as isize;
            view.read_pixel(sx, sy, out);
        }
        Ok(())
    })?;

    Ok(dst)
}
