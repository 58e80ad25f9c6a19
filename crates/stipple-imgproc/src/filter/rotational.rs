use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, PixelView, Sample};

use crate::{
    accelerate::{try_accelerated, FilterOp},
    context::ExecutionContext,
    error::{ensure_finite, ensure_not_empty, FilterError},
    parallel::par_rows,
};

use super::channels::{Accumulator, ChannelPlan};

const ROTATIONAL_BLUR_TAG: &str = "RotationalBlur/Image";

/// Blur an image along arcs around its center, as if it spun by `angle`
/// degrees during the exposure.
///
/// Each pixel averages samples of its own circle spread evenly over the
/// arc. Pixels near the center take fewer samples than those near the
/// corners, and the center pixel of an image with odd dimensions is kept.
/// With alpha selected, colors are weighted by alpha.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `angle` - The angle of the arc in degrees.
/// * `ctx` - The execution context.
pub fn rotational_blur<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    angle: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("angle", angle)?;

    let op = FilterOp::RotationalBlur { channels, angle };
    if let Some(dst) = try_accelerated(ctx, &op, src) {
        return Ok(dst);
    }

    let mut dst = src.try_clone()?;
    let plan = ChannelPlan::new(src, channels);
    if plan.is_noop() {
        return Ok(dst);
    }

    let center_x = (src.cols() - 1) as f64 / 2.0;
    let center_y = (src.rows() - 1) as f64 / 2.0;
    let blur_radius = center_x.hypot(center_y);

    let angle = angle.to_radians();
    let n = ((4.0 * angle * blur_radius.sqrt() + 2.0).abs() as usize).max(2);
    let theta = angle / (n - 1) as f64;
    let start = theta * (n - 1) as f64 / 2.0;
    let mut rotations = alloc_buffer(n, (0.0, 0.0))?;
    for (i, rotation) in rotations.iter_mut().enumerate() {
        *rotation = (theta * i as f64 - start).sin_cos();
    }
    log::debug!("rotational blur: {} samples on the outer arc", n);

    let view = PixelView::new(src);
    let cols = src.cols();
    par_rows(ctx, ROTATIONAL_BLUR_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        let mut px = [T::default(); C];
        let dy = y as f64 - center_y;
        for (x, out) in row.chunks_exact_mut(C).enumerate() {
            let dx = x as f64 - center_x;
            let radius = dx.hypot(dy);
            let step = if radius == 0.0 {
                1
            } else {
                ((blur_radius / radius) as usize).clamp(1, n - 1)
            };
            let weight = 1.0 / n.div_ceil(step) as f64;

            let mut acc = Accumulator::new();
            for &(sin, cos) in rotations.iter().step_by(step) {
                let sx = (center_x + dx * cos - dy * sin + 0.5) as isize;
                let sy = (center_y + dx * sin + dy * cos + 0.5) as isize;
                view.read_pixel(sx, sy, &mut px);
                acc.add(&plan, weight, &px);
            }
            acc.store(&plan, out);
        }
        Ok(())
    })?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Result<Image<u8, 1>, FilterError> {
        let data = (0..81).map(|i| if i / 9 == 4 { 255 } else { 0 }).collect();
        Ok(Image::new([9, 9].into(), data)?)
    }

    #[test]
    fn zero_angle_is_identity() -> Result<(), FilterError> {
        let image = Image::<u8, 3>::new([4, 3].into(), (0..36).map(|v| v * 7).collect())?;
        let out = rotational_blur(&image, ChannelMask::ALL, 0.0, &ExecutionContext::default())?;
        assert_eq!(out, image);
        Ok(())
    }

    #[test]
    fn arc_spreads_a_line() -> Result<(), FilterError> {
        let out = rotational_blur(&line()?, ChannelMask::DEFAULT, 90.0, &ExecutionContext::default())?;
        // the center does not move
        assert_eq!(out.get([4, 4, 0]), Some(&255));
        let end = out.get([4, 8, 0]).copied().unwrap_or_default();
        assert!(end > 0 && end < 255);
        assert!(out.get([0, 8, 0]).copied().unwrap_or_default() > 0);
        // a quarter turn away from the line is out of reach
        for y in 0..4 {
            assert_eq!(out.get([y, 4, 0]), Some(&0));
        }
        Ok(())
    }

    #[test]
    fn transparent_samples_do_not_darken() -> Result<(), FilterError> {
        // opaque white everywhere but a transparent black column
        let mut data = Vec::new();
        for i in 0..25 {
            if i % 5 == 1 {
                data.extend_from_slice(&[0, 0]);
            } else {
                data.extend_from_slice(&[255, 255]);
            }
        }
        let image = Image::<u8, 2>::new([5, 5].into(), data)?;
        let out = rotational_blur(&image, ChannelMask::ALL, 60.0, &ExecutionContext::default())?;
        for px in out.as_slice().chunks_exact(2) {
            if px[1] > 0 {
                assert_eq!(px[0], 255);
            }
        }
        Ok(())
    }
}
