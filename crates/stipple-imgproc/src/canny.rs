use std::f64::consts::PI;

use stipple_image::{allocator::alloc_buffer, ChannelMask, Image, PixelView, Sample};

use crate::{
    color::gray_from_image,
    context::ExecutionContext,
    error::{ensure_not_empty, ensure_unit, FilterError},
    filter::blur,
    histogram::{compute_value_histogram, histogram_bin, HISTOGRAM_BINS},
    normalize::normalize,
    parallel::par_rows,
};

const CANNY_GRADIENT_TAG: &str = "CannyGradient/Image";
const CANNY_EDGE_TAG: &str = "CannyEdge/Image";

/// The gradient of one pixel of the smoothed intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradientSample {
    /// Length of the gradient, in sample units.
    pub magnitude: f64,
    /// Direction of the gradient folded into four buckets: 0 horizontal,
    /// 1 and 3 the diagonals, 2 vertical.
    pub orientation: u8,
}

/// Hysteresis thresholds on the 16-bit histogram scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannyThresholds {
    /// Pixels at or above this bin start an edge.
    pub upper: usize,
    /// Pixels at or above this bin continue an edge.
    pub lower: usize,
}

/// Fold the direction of `(dx, dy)` into one of four buckets.
fn orientation_bucket(dx: f64, dy: f64) -> u8 {
    let o = 8.0 * ((dy.atan2(dx) + PI) % PI) / PI;
    if o <= 1.0 || o > 7.0 {
        0
    } else if o <= 3.0 {
        3
    } else if o <= 5.0 {
        2
    } else {
        1
    }
}

/// Gradient of every pixel over its 2x2 window towards the bottom right.
fn gradient<T: Sample>(
    gray: &Image<T, 1>,
    ctx: &ExecutionContext<'_>,
) -> Result<Vec<GradientSample>, FilterError> {
    let cols = gray.cols();
    let view = PixelView::new(gray);
    let mut samples = alloc_buffer(cols * gray.rows(), GradientSample::default())?;

    par_rows(ctx, CANNY_GRADIENT_TAG, &mut samples, cols, |y, row| {
        let width = cols + 1;
        let mut window = alloc_buffer(width * 2, T::default())?;
        view.read_window(0, y as isize, width, 2, &mut window)?;
        let (top, bottom) = window.split_at(width);

        for (x, sample) in row.iter_mut().enumerate() {
            let (a, b) = (top[x].to_f64(), top[x + 1].to_f64());
            let (c, d) = (bottom[x].to_f64(), bottom[x + 1].to_f64());
            let dx = 1.5 * (b - a + d - c);
            let dy = 1.5 * (a + b - c - d);
            *sample = GradientSample {
                magnitude: dx.hypot(dy),
                orientation: orientation_bucket(dx, dy),
            };
        }
        Ok(())
    })?;

    Ok(samples)
}

/// Keep the gradient magnitudes that peak across their edge direction.
fn suppress(
    samples: &[GradientSample],
    cols: usize,
    rows: usize,
    max: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Vec<f64>, FilterError> {
    let magnitude = |x: isize, y: isize| {
        let x = x.clamp(0, cols as isize - 1) as usize;
        let y = y.clamp(0, rows as isize - 1) as usize;
        samples[y * cols + x].magnitude
    };

    let mut intensities = alloc_buffer(cols * rows, 0.0)?;
    par_rows(ctx, CANNY_EDGE_TAG, &mut intensities, cols, |y, row| {
        let y = y as isize;
        for (x, (out, sample)) in row
            .iter_mut()
            .zip(&samples[y as usize * cols..])
            .enumerate()
        {
            let x = x as isize;
            let (alpha, beta) = match sample.orientation {
                0 => (magnitude(x - 1, y), magnitude(x + 1, y)),
                1 => (magnitude(x - 1, y - 1), magnitude(x + 1, y + 1)),
                2 => (magnitude(x, y - 1), magnitude(x, y + 1)),
                _ => (magnitude(x - 1, y + 1), magnitude(x + 1, y - 1)),
            };
            *out = if sample.magnitude < alpha || sample.magnitude < beta {
                0.0
            } else {
                sample.magnitude.min(max)
            };
        }
        Ok(())
    })?;

    Ok(intensities)
}

/// Estimate the hysteresis thresholds from the histogram of suppressed
/// intensities.
///
/// The upper threshold is the bin below which all but `lower_percent` of the
/// non-zero intensities fall, counting from the top. The lower threshold is
/// `upper_percent` of the sum of the upper threshold and the lowest occupied
/// bin, and never exceeds the upper one.
///
/// # Arguments
///
/// * `histogram` - The counts of [`HISTOGRAM_BINS`] bins.
/// * `lower_percent` - Fraction of edge pixels above the upper threshold.
/// * `upper_percent` - Fraction that places the lower threshold.
///
/// # Example
///
/// ```
/// use stipple_imgproc::canny::estimate_thresholds;
///
/// let mut histogram = vec![0u64; 65536];
/// histogram[0] = 80;
/// histogram[65535] = 20;
/// let thresholds = estimate_thresholds(&histogram, 0.1, 0.3);
/// assert_eq!(thresholds.upper, 65535);
/// assert_eq!(thresholds.lower, 19660);
/// ```
pub fn estimate_thresholds(
    histogram: &[u64],
    lower_percent: f64,
    upper_percent: f64,
) -> CannyThresholds {
    let total: u64 = histogram.iter().sum();
    let zeros = histogram.first().copied().unwrap_or(0);
    let target = (lower_percent * (total - zeros) as f64).floor() as u64;

    let last = histogram.len().min(HISTOGRAM_BINS).saturating_sub(1);
    let mut upper = last;
    if target > 0 {
        let mut count = 0;
        for bin in (0..=last).rev() {
            count += histogram[bin];
            if count >= target {
                upper = bin;
                break;
            }
        }
    }

    let lowest = histogram.iter().position(|c| *c > 0).unwrap_or(0);
    let lower = ((upper_percent * (upper + lowest) as f64) as usize).min(upper);
    CannyThresholds { upper, lower }
}

/// Mark the pixels connected to a strong seed through pixels above `lower`.
fn trace(
    bins: &[usize],
    cols: usize,
    rows: usize,
    thresholds: CannyThresholds,
) -> Result<Vec<bool>, FilterError> {
    let mut marked = alloc_buffer(bins.len(), false)?;
    let mut stack = Vec::new();

    for seed in 0..bins.len() {
        if marked[seed] || bins[seed] < thresholds.upper {
            continue;
        }
        marked[seed] = true;
        stack.push((seed % cols, seed / cols));

        while let Some((x, y)) = stack.pop() {
            for v in y.saturating_sub(1)..=(y + 1).min(rows - 1) {
                for u in x.saturating_sub(1)..=(x + 1).min(cols - 1) {
                    let i = v * cols + u;
                    if !marked[i] && bins[i] >= thresholds.lower {
                        marked[i] = true;
                        stack.push((u, v));
                    }
                }
            }
        }
    }
    Ok(marked)
}

/// Detect edges with the Canny algorithm.
///
/// The image is smoothed, projected to gray and normalized. Gradients are
/// taken over 2x2 windows and thinned by non-maximum suppression. Pixels
/// above an upper threshold seed the edges, which then grow through
/// connected pixels above a lower threshold. Both thresholds follow from the
/// histogram of the thinned gradient, see [`estimate_thresholds`].
///
/// # Arguments
///
/// * `src` - The source image.
/// * `radius` - The smoothing radius in pixels, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the smoothing gaussian.
/// * `lower_percent` - Fraction of edge pixels above the upper threshold.
/// * `upper_percent` - Fraction that places the lower threshold.
/// * `ctx` - The execution context.
///
/// # Returns
///
/// A gray image with edges at the maximum sample value and 0 elsewhere.
///
/// # Errors
///
/// Percentages outside `[0, 1]` are rejected with
/// [`FilterError::InvalidParameter`].
///
/// # Example
///
/// ```
/// use stipple_image::Image;
/// use stipple_imgproc::{canny::canny, context::ExecutionContext};
///
/// let image = Image::<u8, 3>::from_size_val([8, 8].into(), 90).unwrap();
/// let edges = canny(&image, 0.0, 1.0, 0.1, 0.3, &ExecutionContext::default()).unwrap();
/// assert!(edges.as_slice().iter().all(|v| *v == 0));
/// ```
pub fn canny<T: Sample, const C: usize>(
    src: &Image<T, C>,
    radius: f64,
    sigma: f64,
    lower_percent: f64,
    upper_percent: f64,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, 1>, FilterError> {
    ensure_not_empty(src)?;
    ensure_unit("lower_percent", lower_percent)?;
    ensure_unit("upper_percent", upper_percent)?;

    let smooth = blur(src, ChannelMask::DEFAULT, radius, sigma, ctx)?;
    let mut gray = gray_from_image(&smooth, ctx)?;
    normalize(&mut gray, ChannelMask::DEFAULT)?;

    let (cols, rows) = (gray.cols(), gray.rows());
    let samples = gradient(&gray, ctx)?;
    let intensities = suppress(&samples, cols, rows, T::MAX, ctx)?;

    let histogram = compute_value_histogram(&intensities, T::MAX);
    let thresholds = estimate_thresholds(&histogram, lower_percent, upper_percent);
    log::debug!(
        "canny: thresholds {} / {} on the 16-bit scale",
        thresholds.lower,
        thresholds.upper
    );

    let mut bins = alloc_buffer(intensities.len(), 0)?;
    for (bin, v) in bins.iter_mut().zip(&intensities) {
        *bin = histogram_bin(*v, T::MAX);
    }
    let marked = trace(&bins, cols, rows, thresholds)?;

    let edge = T::from_f64(T::MAX);
    let mut data = alloc_buffer(marked.len(), T::default())?;
    for (px, m) in data.iter_mut().zip(&marked) {
        if *m {
            *px = edge;
        }
    }
    Ok(Image::new(gray.size(), data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripe() -> Result<Image<u8, 1>, FilterError> {
        let data = (0..100)
            .map(|i| if (5..=6).contains(&(i % 10)) { 255 } else { 0 })
            .collect();
        Ok(Image::new([10, 10].into(), data)?)
    }

    #[test]
    fn orientation_buckets() {
        assert_eq!(orientation_bucket(1.0, 0.0), 0);
        assert_eq!(orientation_bucket(-1.0, 0.0), 0);
        assert_eq!(orientation_bucket(0.0, 1.0), 2);
        assert_eq!(orientation_bucket(1.0, 1.0), 3);
        assert_eq!(orientation_bucket(1.0, -1.0), 1);
        assert_eq!(orientation_bucket(0.0, 0.0), 0);
    }

    #[test]
    fn stripe_gradient_and_suppression() -> Result<(), FilterError> {
        let image = stripe()?;
        let ctx = ExecutionContext::default();
        let samples = gradient(&image, &ctx)?;
        let row = &samples[30..40];
        assert_eq!(row[4].magnitude, 765.0);
        assert_eq!(row[6].magnitude, 765.0);
        assert_eq!(row[5].magnitude, 0.0);
        assert!(row.iter().all(|s| s.orientation == 0));

        let intensities = suppress(&samples, 10, 10, 255.0, &ctx)?;
        assert_eq!(intensities[34], 255.0);
        assert_eq!(intensities[36], 255.0);
        assert_eq!(intensities.iter().filter(|v| **v > 0.0).count(), 20);
        Ok(())
    }

    #[test]
    fn thresholds_keep_order() {
        let mut histogram = vec![0u64; HISTOGRAM_BINS];
        histogram[0] = 10;
        histogram[1000] = 5;
        histogram[2000] = 5;
        histogram[40000] = 10;
        for (lo, hi) in [(0.1, 0.3), (0.5, 0.9), (1.0, 1.0), (0.0, 0.0)] {
            let t = estimate_thresholds(&histogram, lo, hi);
            assert!(t.upper >= t.lower);
        }
        // half of the 20 edge pixels sit in the top bin
        assert_eq!(estimate_thresholds(&histogram, 0.5, 0.5).upper, 40000);
        assert_eq!(estimate_thresholds(&histogram, 0.6, 0.5).upper, 2000);
        // an upper fraction above the ratio is clamped to the upper threshold
        let t = estimate_thresholds(&histogram, 0.5, 1.0);
        assert_eq!(t.lower, t.upper);
    }

    #[test]
    fn trace_follows_weak_pixels() -> Result<(), FilterError> {
        // a strong seed with a weak diagonal tail
        let bins = vec![
            900, 0, 0, 0, //
            0, 500, 0, 500, //
            0, 0, 500, 0, //
        ];
        let marked = trace(&bins, 4, 3, CannyThresholds { upper: 800, lower: 400 })?;
        let expected = vec![
            true, false, false, false, //
            false, true, false, true, //
            false, false, true, false, //
        ];
        assert_eq!(marked, expected);

        let marked = trace(&bins, 4, 3, CannyThresholds { upper: 1000, lower: 400 })?;
        assert!(marked.iter().all(|m| !m));
        Ok(())
    }

    #[test]
    fn stripe_edges() -> Result<(), FilterError> {
        let edges = canny(&stripe()?, 0.0, 0.0, 0.1, 0.3, &ExecutionContext::default())?;
        for y in 0..10 {
            for x in 0..10 {
                let expected = if x == 4 || x == 6 { 255 } else { 0 };
                assert_eq!(edges.get([y, x, 0]), Some(&expected));
            }
        }
        Ok(())
    }

    #[test]
    fn rejects_percent_out_of_range() -> Result<(), FilterError> {
        let image = stripe()?;
        let ctx = ExecutionContext::default();
        assert!(matches!(
            canny(&image, 0.0, 1.0, 1.5, 0.3, &ctx),
            Err(FilterError::InvalidParameter { name: "lower_percent", .. })
        ));
        assert!(matches!(
            canny(&image, 0.0, 1.0, 0.1, -0.1, &ctx),
            Err(FilterError::InvalidParameter { name: "upper_percent", .. })
        ));
        Ok(())
    }
}
