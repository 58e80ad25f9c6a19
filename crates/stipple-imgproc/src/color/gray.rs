use stipple_image::{ColorSpace, Image, Sample};

use crate::{
    context::ExecutionContext,
    error::{ensure_not_empty, FilterError},
    parallel::par_rows,
};

/// Define the RGB weights for the grayscale conversion.
const RW: f64 = 0.299;
const GW: f64 = 0.587;
const BW: f64 = 0.114;

const GRAY_TAG: &str = "Gray/Image";

/// The intensity of one pixel, in sample units.
///
/// Gray pixels return their first channel. Color pixels use the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// applied to the first three channels, also for CMYK pixels.
///
/// # Example
///
/// ```
/// use stipple_image::ColorSpace;
/// use stipple_imgproc::color::pixel_intensity;
///
/// assert_eq!(pixel_intensity(ColorSpace::Gray, &[40u8, 255]), 40.0);
/// let y = pixel_intensity(ColorSpace::Rgb, &[255u8, 255, 255]);
/// assert!((y - 255.0).abs() < 1e-9);
/// ```
#[inline]
pub fn pixel_intensity<T: Sample>(colorspace: ColorSpace, px: &[T]) -> f64 {
    match colorspace {
        ColorSpace::Gray => px[0].to_f64(),
        ColorSpace::Rgb | ColorSpace::Cmyk => {
            RW * px[0].to_f64() + GW * px[1].to_f64() + BW * px[2].to_f64()
        }
    }
}

/// Convert an image to a single channel grayscale image of its intensity.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `ctx` - The execution context.
///
/// # Returns
///
/// A gray image of the same size, see [`pixel_intensity`].
///
/// # Example
///
/// ```
/// use stipple_image::Image;
/// use stipple_imgproc::{color::gray_from_image, context::ExecutionContext};
///
/// let image = Image::<u8, 3>::new([2, 1].into(), vec![255, 0, 0, 0, 0, 255]).unwrap();
/// let gray = gray_from_image(&image, &ExecutionContext::default()).unwrap();
/// assert_eq!(gray.as_slice(), &[76, 29]);
/// ```
pub fn gray_from_image<T: Sample, const C: usize>(
    src: &Image<T, C>,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, 1>, FilterError> {
    ensure_not_empty(src)?;

    let colorspace = src.colorspace();
    let mut dst = Image::<T, 1>::from_size_val(src.size(), T::default())?;
    let cols = src.cols();

    // parallelize the grayscale conversion by rows
    par_rows(ctx, GRAY_TAG, dst.as_slice_mut(), cols, |y, row| {
        for (dst_pixel, src_pixel) in row.iter_mut().zip(src.row(y).chunks_exact(C)) {
            *dst_pixel = T::from_f64(pixel_intensity(colorspace, src_pixel));
        }
        Ok(())
    })?;

    Ok(dst)
}
