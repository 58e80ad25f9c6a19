//! Tone operations that stretch the sample range of an image.
//!
//! * [`level`] maps a fixed black and white point onto the full range.
//! * [`normalize`] finds those points from the histogram of each channel,
//!   ignoring a small fraction of outliers at both ends.
//!
//! Both work in place on the channels selected by a [`ChannelMask`].

use rayon::prelude::*;
use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, Sample};

use crate::{
    core::perceptible_reciprocal,
    error::{ensure_finite, FilterError},
    histogram::{apply_bin_maps, compute_histogram, is_selected, HISTOGRAM_BINS},
};

/// Fraction of the pixels clipped to black by [`normalize`].
const NORMALIZE_BLACK_FRACTION: f64 = 0.0015;

/// Fraction of the pixels clipped to white by [`normalize`].
const NORMALIZE_WHITE_FRACTION: f64 = 0.0005;

/// Linearly map `[black, white]` onto the full sample range.
///
/// `black` and `white` are fractions of the sample range; values outside
/// the interval clip to 0 or the maximum.
///
/// # Arguments
///
/// * `image` - The image to adjust in place.
/// * `channels` - The channels to adjust.
/// * `black` - The black point as a fraction of the sample range.
/// * `white` - The white point as a fraction of the sample range.
///
/// # Errors
///
/// Returns an error if a point is not a finite number.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::normalize::level;
///
/// let mut image = Image::<u8, 1>::new([3, 1].into(), vec![51, 153, 255]).unwrap();
/// level(&mut image, ChannelMask::DEFAULT, 0.2, 0.6).unwrap();
/// assert_eq!(image.as_slice(), &[0, 255, 255]);
/// ```
pub fn level<T: Sample, const C: usize>(
    image: &mut Image<T, C>,
    channels: ChannelMask,
    black: f64,
    white: f64,
) -> Result<(), FilterError> {
    ensure_finite("black", black)?;
    ensure_finite("white", white)?;

    let selected: [bool; C] = std::array::from_fn(|c| is_selected(image, channels, c));
    let row_len = image.cols() * C;
    if row_len == 0 || !selected.contains(&true) {
        return Ok(());
    }

    let black = black * T::MAX;
    let scale = T::MAX * perceptible_reciprocal(white * T::MAX - black);
    image
        .as_slice_mut()
        .par_chunks_exact_mut(row_len)
        .for_each(|row| {
            for px in row.chunks_exact_mut(C) {
                for (v, _) in px.iter_mut().zip(selected).filter(|(_, s)| *s) {
                    *v = T::from_f64(scale * (v.to_f64() - black));
                }
            }
        });
    Ok(())
}

/// Stretch the contrast of each selected channel to the full range.
///
/// The black point is the lowest level at which 0.15% of the pixels are at
/// or below it and the white point the highest level with 0.05% of the
/// pixels at or above it. Levels between them are stretched linearly; a
/// channel whose two points coincide is left unchanged.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::normalize::normalize;
///
/// let mut image = Image::<u8, 1>::new([3, 1].into(), vec![50, 75, 150]).unwrap();
/// normalize(&mut image, ChannelMask::DEFAULT).unwrap();
/// assert_eq!(image.as_slice(), &[0, 64, 255]);
/// ```
pub fn normalize<T: Sample, const C: usize>(
    image: &mut Image<T, C>,
    channels: ChannelMask,
) -> Result<(), FilterError> {
    let pixels = (image.cols() * image.rows()) as f64;
    let black_count = pixels * NORMALIZE_BLACK_FRACTION;
    let white_count = pixels * NORMALIZE_WHITE_FRACTION;

    let mut maps: [Option<Vec<f64>>; C] = std::array::from_fn(|_| None);
    for (c, slot) in maps.iter_mut().enumerate() {
        if !is_selected(image, channels, c) {
            continue;
        }
        let histogram = compute_histogram(image, c)?;

        let mut acc = 0.0;
        let mut black = HISTOGRAM_BINS - 1;
        for (bin, count) in histogram.iter().enumerate() {
            acc += *count as f64;
            if acc >= black_count {
                black = bin;
                break;
            }
        }

        let mut acc = 0.0;
        let mut white = 0;
        for (bin, count) in histogram.iter().enumerate().rev() {
            acc += *count as f64;
            if acc >= white_count {
                white = bin;
                break;
            }
        }

        if black >= white {
            log::debug!("normalize: channel {} has a single level, skipped", c);
            continue;
        }
        log::debug!("normalize: channel {} stretched from bins {}..={}", c, black, white);

        let mut map = alloc_buffer(HISTOGRAM_BINS, 0.0)?;
        let scale = T::MAX / (white - black) as f64;
        for (bin, m) in map.iter_mut().enumerate() {
            *m = if bin <= black {
                0.0
            } else if bin >= white {
                T::MAX
            } else {
                (bin - black) as f64 * scale
            };
        }
        *slot = Some(map);
    }
    apply_bin_maps(image, &maps);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_maps_points() -> Result<(), FilterError> {
        let mut image = Image::<u16, 2>::new(
            [3, 1].into(),
            vec![6553, 1, 32768, 2, 58982, 3],
        )?;
        level(&mut image, ChannelMask::DEFAULT, 0.1, 0.9)?;
        let px = image.as_slice();
        assert_eq!(px[0], 0);
        assert!((px[2] as i32 - 32768).abs() <= 1);
        assert_eq!(px[4], 65535);
        // alpha untouched
        assert_eq!([px[1], px[3], px[5]], [1, 2, 3]);
        Ok(())
    }

    #[test]
    fn level_identity() -> Result<(), FilterError> {
        let mut image = Image::<f32, 3>::new([2, 1].into(), vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.1])?;
        let expected = image.clone();
        level(&mut image, ChannelMask::ALL, 0.0, 1.0)?;
        for (a, b) in image.as_slice().iter().zip(expected.as_slice()) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
        assert!(level(&mut image, ChannelMask::ALL, f64::NAN, 1.0).is_err());
        Ok(())
    }

    #[test]
    fn normalize_stretches_channels_independently() -> Result<(), FilterError> {
        let mut image = Image::<u8, 3>::new(
            [2, 1].into(),
            vec![50, 0, 7, 100, 255, 7],
        )?;
        normalize(&mut image, ChannelMask::DEFAULT)?;
        assert_eq!(image.as_slice(), &[0, 0, 7, 255, 255, 7]);
        Ok(())
    }

    #[test]
    fn normalize_clips_outliers() -> Result<(), FilterError> {
        // one dark outlier in ten thousand pixels falls under the black fraction
        let mut data = vec![200u8; 10_000];
        data[..5000].fill(100);
        data[0] = 0;
        let mut image = Image::<u8, 1>::new([100, 100].into(), data)?;
        normalize(&mut image, ChannelMask::DEFAULT)?;
        assert_eq!(image.as_slice()[0], 0);
        assert_eq!(image.as_slice()[1], 0);
        assert_eq!(image.as_slice()[9999], 255);
        Ok(())
    }
}
