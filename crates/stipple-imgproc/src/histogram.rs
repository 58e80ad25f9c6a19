use rayon::prelude::*;
use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, ImageError, Sample};

use crate::error::FilterError;

/// Number of bins of the intensity histograms.
pub const HISTOGRAM_BINS: usize = 65536;

const CHUNK_PIXELS: usize = 4096;

/// The histogram bin of `value` on a `[0, max]` scale.
///
/// Values are quantized to 16 bits; out of range values land in the first or
/// last bin.
///
/// # Example
///
/// ```
/// use stipple_imgproc::histogram::histogram_bin;
///
/// assert_eq!(histogram_bin(0.0, 255.0), 0);
/// assert_eq!(histogram_bin(255.0, 255.0), 65535);
/// assert_eq!(histogram_bin(1.0, 255.0), 257);
/// ```
#[inline]
pub fn histogram_bin(value: f64, max: f64) -> usize {
    let bin = (value / max * (HISTOGRAM_BINS - 1) as f64).round();
    // NaN casts to 0
    bin.clamp(0.0, (HISTOGRAM_BINS - 1) as f64) as usize
}

/// Count `items` in strides of `stride` elements into [`HISTOGRAM_BINS`] bins.
fn par_histogram<S, F>(items: &[S], stride: usize, bin: F) -> Vec<u64>
where
    S: Sync,
    F: Fn(&[S]) -> usize + Sync + Send,
{
    items
        .par_chunks(stride * CHUNK_PIXELS)
        .fold(
            || vec![0u64; HISTOGRAM_BINS],
            |mut local, chunk| {
                for item in chunk.chunks_exact(stride) {
                    local[bin(item)] += 1;
                }
                local
            },
        )
        .reduce(
            || vec![0u64; HISTOGRAM_BINS],
            |mut a, b| {
                for (acc, val) in a.iter_mut().zip(b.iter()) {
                    *acc += val;
                }
                a
            },
        )
}

/// Compute the 16-bit histogram of one channel of an image.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `channel` - The channel index.
///
/// # Returns
///
/// A vector of [`HISTOGRAM_BINS`] counts indexed by [`histogram_bin`].
///
/// # Errors
///
/// Returns an error if the channel index is out of bounds.
///
/// # Example
///
/// ```
/// use stipple_image::Image;
/// use stipple_imgproc::histogram::compute_histogram;
///
/// let image = Image::<u8, 1>::new([3, 1].into(), vec![0, 255, 255]).unwrap();
/// let histogram = compute_histogram(&image, 0).unwrap();
/// assert_eq!(histogram[0], 1);
/// assert_eq!(histogram[65535], 2);
/// ```
pub fn compute_histogram<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channel: usize,
) -> Result<Vec<u64>, FilterError> {
    if channel >= C {
        return Err(ImageError::ChannelIndexOutOfBounds(channel, C).into());
    }
    Ok(par_histogram(src.as_slice(), C, |px| {
        histogram_bin(px[channel].to_f64(), T::MAX)
    }))
}

/// Compute the 16-bit histogram of a buffer of values on a `[0, max]` scale.
pub fn compute_value_histogram(values: &[f64], max: f64) -> Vec<u64> {
    par_histogram(values, 1, |v| histogram_bin(v[0], max))
}

/// Whether channel `c` of `image` is selected by `mask`.
pub(crate) fn is_selected<T, const C: usize>(
    image: &Image<T, C>,
    mask: ChannelMask,
    c: usize,
) -> bool {
    mask.contains(image.channel_kind(c).mask())
}

/// Remap the selected channels of `image` in place through per-channel
/// lookup tables indexed by [`histogram_bin`].
///
/// Channels whose table is `None` are left untouched.
pub(crate) fn apply_bin_maps<T: Sample, const C: usize>(
    image: &mut Image<T, C>,
    maps: &[Option<Vec<f64>>; C],
) {
    let row_len = image.cols() * C;
    if row_len == 0 || maps.iter().all(Option::is_none) {
        return;
    }
    image
        .as_slice_mut()
        .par_chunks_exact_mut(row_len)
        .for_each(|row| {
            for px in row.chunks_exact_mut(C) {
                for (v, map) in px.iter_mut().zip(maps.iter()) {
                    if let Some(map) = map {
                        *v = T::from_f64(map[histogram_bin(v.to_f64(), T::MAX)]);
                    }
                }
            }
        });
}

/// Equalize the histogram of the selected channels in place.
///
/// Each channel is remapped through its own cumulative histogram so that
/// the output levels are spread over the full sample range. A channel with
/// every sample in the lowest bin is left unchanged.
///
/// # Arguments
///
/// * `image` - The image to equalize.
/// * `channels` - The channels to equalize.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::histogram::equalize;
///
/// let mut image = Image::<u8, 1>::new([4, 1].into(), vec![100, 100, 110, 110]).unwrap();
/// equalize(&mut image, ChannelMask::DEFAULT).unwrap();
/// assert_eq!(image.as_slice(), &[128, 128, 255, 255]);
/// ```
pub fn equalize<T: Sample, const C: usize>(
    image: &mut Image<T, C>,
    channels: ChannelMask,
) -> Result<(), FilterError> {
    let mut maps: [Option<Vec<f64>>; C] = std::array::from_fn(|_| None);
    for (c, slot) in maps.iter_mut().enumerate() {
        if !is_selected(image, channels, c) {
            continue;
        }
        let histogram = compute_histogram(image, c)?;
        let mut map = alloc_buffer(HISTOGRAM_BINS, 0.0)?;
        let mut acc = 0u64;
        for (m, count) in map.iter_mut().zip(&histogram) {
            acc += count;
            *m = acc as f64;
        }
        let (black, white) = (map[0], map[HISTOGRAM_BINS - 1]);
        if black == white {
            continue;
        }
        let scale = T::MAX / (white - black);
        map.iter_mut().for_each(|m| *m = (*m - black) * scale);
        *slot = Some(map);
    }
    apply_bin_maps(image, &maps);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_histogram() -> Result<(), FilterError> {
        let image = Image::<u16, 2>::new(
            [3, 1].into(),
            vec![0, 65535, 1000, 65535, 1000, 0],
        )?;

        let histogram = compute_histogram(&image, 0)?;
        assert_eq!(histogram.len(), HISTOGRAM_BINS);
        assert_eq!(histogram[0], 1);
        assert_eq!(histogram[1000], 2);

        let histogram = compute_histogram(&image, 1)?;
        assert_eq!(histogram[65535], 2);
        assert_eq!(histogram[0], 1);

        assert_eq!(
            compute_histogram(&image, 2),
            Err(FilterError::ImageError(ImageError::ChannelIndexOutOfBounds(2, 2)))
        );
        Ok(())
    }

    #[test]
    fn value_histogram_spans_chunks() {
        let values = vec![0.5; 3 * CHUNK_PIXELS + 17];
        let histogram = compute_value_histogram(&values, 1.0);
        assert_eq!(histogram[histogram_bin(0.5, 1.0)], values.len() as u64);
        assert_eq!(histogram.iter().sum::<u64>(), values.len() as u64);
    }

    #[test]
    fn equalize_spreads_levels() -> Result<(), FilterError> {
        let mut image = Image::<u8, 1>::new([4, 1].into(), vec![10, 20, 30, 40])?;
        equalize(&mut image, ChannelMask::DEFAULT)?;
        assert_eq!(image.as_slice(), &[64, 128, 191, 255]);
        Ok(())
    }

    #[test]
    fn equalize_skips_flat_and_unselected() -> Result<(), FilterError> {
        let mut black = Image::<u8, 1>::from_size_val([3, 3].into(), 0)?;
        equalize(&mut black, ChannelMask::DEFAULT)?;
        assert_eq!(black.as_slice(), &[0; 9]);

        let mut flat = Image::<u8, 1>::from_size_val([3, 3].into(), 42)?;
        equalize(&mut flat, ChannelMask::DEFAULT)?;
        assert_eq!(flat.as_slice(), &[255; 9]);

        // alpha is not part of the default channels
        let mut image = Image::<u8, 2>::new([2, 1].into(), vec![10, 10, 20, 20])?;
        equalize(&mut image, ChannelMask::DEFAULT)?;
        assert_eq!(image.as_slice(), &[128, 10, 255, 20]);
        Ok(())
    }
}
