use stipple_image::{ChannelMask, Image, Sample};

use crate::{
    accelerate::{try_accelerated, FilterOp},
    context::ExecutionContext,
    error::{ensure_finite, ensure_not_empty, FilterError},
    histogram::is_selected,
    parallel::par_rows,
};

use super::ops::blur;

const UNSHARP_MASK_TAG: &str = "UnsharpMask/Image";

/// Sharpen an image by adding back its difference to a blurred copy.
///
/// For every selected sample `diff = original - blurred`. Samples where
/// `|2 * diff|` is below `threshold` times the sample range are kept, the
/// others become `original + gain * diff`, clamped to the sample range.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to sharpen.
/// * `radius` - The blur radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the blur.
/// * `gain` - The fraction of the difference added back.
/// * `threshold` - The smallest difference sharpened, as a fraction of the
///   sample range.
/// * `ctx` - The execution context.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::{context::ExecutionContext, filter::unsharp_mask};
///
/// let image = Image::<u8, 1>::new([4, 1].into(), vec![100, 100, 150, 150]).unwrap();
/// let ctx = ExecutionContext::default();
/// let out = unsharp_mask(&image, ChannelMask::DEFAULT, 1.0, 1.0, 1.0, 0.0, &ctx).unwrap();
/// let px = out.as_slice();
/// assert!(px[1] < 100 && px[2] > 150);
/// ```
pub fn unsharp_mask<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    radius: f64,
    sigma: f64,
    gain: f64,
    threshold: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("gain", gain)?;
    ensure_finite("threshold", threshold)?;

    let op = FilterOp::UnsharpMask {
        channels,
        radius,
        sigma,
        gain,
        threshold,
    };
    if let Some(dst) = try_accelerated(ctx, &op, src) {
        return Ok(dst);
    }

    let mut dst = blur(src, channels, radius, sigma, ctx)?;
    let selected: [bool; C] = std::array::from_fn(|c| is_selected(src, channels, c));
    let limit = threshold * T::MAX;
    let cols = src.cols();

    par_rows(ctx, UNSHARP_MASK_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        for (blurred, original) in row.chunks_exact_mut(C).zip(src.row(y).chunks_exact(C)) {
            for ((b, &o), _) in blurred
                .iter_mut()
                .zip(original)
                .zip(selected)
                .filter(|(_, s)| *s)
            {
                let o = o.to_f64();
                let diff = o - b.to_f64();
                *b = if (2.0 * diff).abs() < limit {
                    T::from_f64(o)
                } else {
                    T::from_f64(o + diff * gain)
                };
            }
        }
        Ok(())
    })?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> Result<Image<u8, 1>, FilterError> {
        let data = [100u8, 100, 100, 150, 150, 150].repeat(3);
        Ok(Image::new([6, 3].into(), data)?)
    }

    #[test]
    fn overshoots_at_edges() -> Result<(), FilterError> {
        let image = step()?;
        let out = unsharp_mask(&image, ChannelMask::DEFAULT, 0.0, 1.0, 1.0, 0.0, &ExecutionContext::default())?;
        let row = out.row(1);
        assert!(row[2] < 100);
        assert!(row[3] > 150);
        // far from the edge the difference is too small to round away
        assert!(row[0] <= 100);
        assert!(row[5] >= 150);
        Ok(())
    }

    #[test]
    fn threshold_and_gain_keep_the_source() -> Result<(), FilterError> {
        let image = step()?;
        let ctx = ExecutionContext::default();
        assert_eq!(
            unsharp_mask(&image, ChannelMask::DEFAULT, 0.0, 1.0, 1.0, 1.0, &ctx)?,
            image
        );
        assert_eq!(
            unsharp_mask(&image, ChannelMask::DEFAULT, 0.0, 1.0, 0.0, 0.0, &ctx)?,
            image
        );
        Ok(())
    }

    #[test]
    fn unselected_channels_keep_the_source() -> Result<(), FilterError> {
        let data = [0u8, 200, 0, 255, 200, 0, 255, 0, 0].repeat(2);
        let image = Image::<u8, 3>::new([3, 2].into(), data)?;
        let out = unsharp_mask(&image, ChannelMask::RED, 1.0, 1.0, 2.0, 0.0, &ExecutionContext::default())?;
        for (a, b) in out.as_slice().chunks_exact(3).zip(image.as_slice().chunks_exact(3)) {
            assert_eq!(a[1..], b[1..]);
        }
        Ok(())
    }
}
