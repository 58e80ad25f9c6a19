use stipple_image::{allocator::alloc_buffer, Image, PixelView, Sample};

use crate::{
    color::pixel_intensity,
    context::ExecutionContext,
    core::EPSILON,
    error::{ensure_finite, ensure_not_empty, FilterError},
    parallel::par_rows,
};

const SHADE_TAG: &str = "Shade/Image";

/// Shine a distant light on an image, reading its intensity as a relief.
///
/// The light comes from `azimuth` degrees in the image plane (0 points along
/// increasing `x`) and stands `elevation` degrees above it. The surface
/// normal at each pixel follows from the intensity differences of its 3x3
/// neighbourhood. Flat areas receive the vertical component of the light,
/// areas facing away from it turn black.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `gray` - Write the shading itself into the color channels instead of
///   modulating them.
/// * `azimuth` - The direction of the light in degrees.
/// * `elevation` - The height of the light in degrees.
/// * `ctx` - The execution context.
///
/// # Example
///
/// ```
/// use stipple_image::Image;
/// use stipple_imgproc::{context::ExecutionContext, filter::shade};
///
/// let image = Image::<u8, 1>::from_size_val([3, 3].into(), 40).unwrap();
/// let out = shade(&image, true, 0.0, 90.0, &ExecutionContext::default()).unwrap();
/// assert!(out.as_slice().iter().all(|v| *v == 255));
/// ```
pub fn shade<T: Sample, const C: usize>(
    src: &Image<T, C>,
    gray: bool,
    azimuth: f64,
    elevation: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;
    ensure_finite("azimuth", azimuth)?;
    ensure_finite("elevation", elevation)?;

    let (az_sin, az_cos) = azimuth.to_radians().sin_cos();
    let (el_sin, el_cos) = elevation.to_radians().sin_cos();
    let light = [
        T::MAX * az_cos * el_cos,
        T::MAX * az_sin * el_cos,
        T::MAX * el_sin,
    ];
    let normal_z = 2.0 * T::MAX;

    let colorspace = src.colorspace();
    let colors: [bool; C] = std::array::from_fn(|c| src.channel_kind(c).is_color());
    let view = PixelView::new(src);
    let cols = src.cols();

    let mut dst = src.try_clone()?;
    par_rows(ctx, SHADE_TAG, dst.as_slice_mut(), cols * C, |y, row| {
        let width = cols + 2;
        let mut window = alloc_buffer(width * 3 * C, T::default())?;
        view.read_window(-1, y as isize - 1, width, 3, &mut window)?;

        let mut intensity = alloc_buffer(width * 3, 0.0)?;
        for (i, px) in intensity.iter_mut().zip(window.chunks_exact(C)) {
            *i = pixel_intensity(colorspace, px);
        }
        let (top, rest) = intensity.split_at(width);
        let (middle, bottom) = rest.split_at(width);

        for (x, out) in row.chunks_exact_mut(C).enumerate() {
            let nx = top[x] + middle[x] + bottom[x] - top[x + 2] - middle[x + 2] - bottom[x + 2];
            let ny = bottom[x] + bottom[x + 1] + bottom[x + 2] - top[x] - top[x + 1] - top[x + 2];

            let shade = if nx == 0.0 && ny == 0.0 {
                light[2]
            } else {
                let distance = nx * light[0] + ny * light[1] + normal_z * light[2];
                let norm_sq = nx * nx + ny * ny + normal_z * normal_z;
                if distance > EPSILON && norm_sq > EPSILON * EPSILON {
                    distance / norm_sq.sqrt()
                } else {
                    0.0
                }
            };

            for (v, _) in out.iter_mut().zip(colors).filter(|(_, color)| *color) {
                *v = if gray {
                    T::from_f64(shade)
                } else {
                    T::from_f64(shade * v.to_f64() / T::MAX)
                };
            }
        }
        Ok(())
    })?;

    log::debug!(
        "shade: light ({:.3}, {:.3}, {:.3})",
        light[0],
        light[1],
        light[2]
    );
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Result<Image<u8, 1>, FilterError> {
        let data = (0..36).map(|i| (i % 6) as u8 * 30).collect();
        Ok(Image::new([6, 6].into(), data)?)
    }

    #[test]
    fn flat_image_takes_the_vertical_light() -> Result<(), FilterError> {
        let image = Image::<u8, 3>::from_size_val([4, 4].into(), 200)?;
        let ctx = ExecutionContext::default();
        let out = shade(&image, false, 30.0, 90.0, &ctx)?;
        assert_eq!(out, image);
        let out = shade(&image, true, 30.0, 90.0, &ctx)?;
        assert!(out.as_slice().iter().all(|v| *v == 255));
        Ok(())
    }

    #[test]
    fn slopes_facing_the_light_are_brighter() -> Result<(), FilterError> {
        let image = ramp()?;
        let ctx = ExecutionContext::default();
        // the ramp rises towards +x, so it faces a light placed at 180 degrees
        let facing = shade(&image, true, 180.0, 45.0, &ctx)?;
        let away = shade(&image, true, 0.0, 45.0, &ctx)?;
        let (f, a) = (facing.get([2, 2, 0]), away.get([2, 2, 0]));
        assert!(f > a, "{f:?} <= {a:?}");
        // a light below the horizon leaves every slope dark
        let below = shade(&image, true, 0.0, -90.0, &ctx)?;
        assert_eq!(below.get([2, 2, 0]), Some(&0));
        Ok(())
    }

    #[test]
    fn alpha_is_copied() -> Result<(), FilterError> {
        let data = (0..16).flat_map(|i| [(i % 4) as u8 * 60, 77]).collect();
        let image = Image::<u8, 2>::new([4, 4].into(), data)?;
        let out = shade(&image, true, 120.0, 30.0, &ExecutionContext::default())?;
        assert!(out.as_slice().chunks_exact(2).all(|px| px[1] == 77));
        Ok(())
    }
}
