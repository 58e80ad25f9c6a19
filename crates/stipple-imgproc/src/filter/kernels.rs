use std::f64::consts::PI;

use stipple_image::allocator::{alloc_buffer, buffer_len};

use crate::{
    core::{is_degenerate_sigma, perceptible_reciprocal, EPSILON},
    error::FilterError,
};

/// Tail weight below which a gaussian no longer changes a 16-bit sample.
const KERNEL_CUTOFF: f64 = 1.0 / 65535.0;

/// A two-dimensional correlation kernel.
///
/// Both dimensions are odd and the weights are stored row-major. The anchor
/// is the kernel cell aligned with the output pixel, the center unless set
/// with [`Kernel::with_anchor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    anchor: (usize, usize),
    values: Vec<f64>,
}

impl Kernel {
    /// Create a kernel from its row-major weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is even or the number of weights is
    /// not `width * height`.
    ///
    /// # Example
    ///
    /// ```
    /// use stipple_imgproc::filter::kernels::Kernel;
    ///
    /// let kernel = Kernel::new(3, 1, vec![0.25, 0.5, 0.25]).unwrap();
    /// assert_eq!(kernel.anchor(), (1, 0));
    /// assert!(Kernel::new(2, 1, vec![0.5, 0.5]).is_err());
    /// ```
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self, FilterError> {
        if width % 2 == 0 {
            return Err(FilterError::KernelWidthNotOdd(width));
        }
        if height % 2 == 0 {
            return Err(FilterError::KernelHeightNotOdd(height));
        }
        let expected = buffer_len(width, height, 1)?;
        if values.len() != expected {
            return Err(FilterError::InvalidKernelLength(values.len(), expected));
        }
        Ok(Self {
            width,
            height,
            anchor: (width / 2, height / 2),
            values,
        })
    }

    /// Create a `width x height` kernel from a function of the offsets
    /// `(u, v)` to the center.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(isize, isize) -> f64,
    ) -> Result<Self, FilterError> {
        let mut values = alloc_buffer(buffer_len(width, height, 1)?, 0.0)?;
        let (cx, cy) = ((width / 2) as isize, (height / 2) as isize);
        for (i, value) in values.iter_mut().enumerate() {
            let u = (i % width) as isize - cx;
            let v = (i / width) as isize - cy;
            *value = f(u, v);
        }
        Self::new(width, height, values)
    }

    /// A square kernel that leaves the image unchanged.
    pub fn identity(width: usize) -> Result<Self, FilterError> {
        Self::from_fn(width, width, |u, v| if u == 0 && v == 0 { 1.0 } else { 0.0 })
    }

    /// Move the anchor to `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor is outside the kernel.
    pub fn with_anchor(mut self, x: usize, y: usize) -> Result<Self, FilterError> {
        if x >= self.width || y >= self.height {
            return Err(FilterError::InvalidKernelAnchor(x, y));
        }
        self.anchor = (x, y);
        Ok(self)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Column and row of the anchor cell.
    pub fn anchor(&self) -> (usize, usize) {
        self.anchor
    }

    /// Row-major weights.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Weight at column `u` and row `v`.
    pub fn at(&self, u: usize, v: usize) -> Option<f64> {
        (u < self.width && v < self.height).then(|| self.values[v * self.width + u])
    }

    /// Sum of the weights.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Scale the weights to sum to one.
    ///
    /// Kernels summing to zero are scaled by the saturated reciprocal.
    pub fn normalize(&mut self) {
        let gamma = perceptible_reciprocal(self.sum());
        self.values.iter_mut().for_each(|k| *k *= gamma);
    }

    /// The kernel mirrored along its main diagonal.
    ///
    /// Turns a horizontal line kernel into a vertical one.
    pub fn transpose(&self) -> Result<Self, FilterError> {
        let mut values = alloc_buffer(self.values.len(), 0.0)?;
        for v in 0..self.height {
            for u in 0..self.width {
                values[u * self.height + v] = self.values[v * self.width + u];
            }
        }
        let kernel = Self::new(self.height, self.width, values)?;
        kernel.with_anchor(self.anchor.1, self.anchor.0)
    }

    fn log(&self, name: &str) {
        log::debug!(
            "{} kernel: {}x{} anchor {:?} sum {:.6}",
            name,
            self.width,
            self.height,
            self.anchor,
            self.sum()
        );
        if log::log_enabled!(log::Level::Trace) {
            for (v, row) in self.values.chunks_exact(self.width).enumerate() {
                log::trace!("  {}: {:?}", v, row);
            }
        }
    }
}

/// Unnormalized line gaussian and its prefactor.
#[inline]
fn gaussian_1d(u: f64, sigma: f64) -> f64 {
    (-(u * u) / (2.0 * sigma * sigma)).exp() / ((2.0 * PI).sqrt() * sigma)
}

/// Unnormalized plane gaussian and its prefactor.
#[inline]
fn gaussian_2d(u: f64, v: f64, sigma: f64) -> f64 {
    (-(u * u + v * v) / (2.0 * sigma * sigma)).exp() / (2.0 * PI * sigma * sigma)
}

fn optimal_width(radius: f64, sigma: f64, two_dimensional: bool) -> Result<usize, FilterError> {
    if radius > EPSILON {
        let half = radius.ceil();
        // widths stay addressable as isize offsets
        let width = (half < isize::MAX as f64)
            .then(|| (half as isize).checked_mul(2)?.checked_add(1))
            .flatten()
            .ok_or(FilterError::InvalidParameter {
                name: "radius",
                value: radius,
            })?;
        return Ok(width as usize);
    }
    let sigma = sigma.abs();
    if sigma <= EPSILON {
        return Ok(3);
    }

    let mut width = 5usize;
    loop {
        let j = ((width - 1) / 2) as isize;
        let (normalize, edge) = if two_dimensional {
            let mut normalize = 0.0;
            for v in -j..=j {
                for u in -j..=j {
                    normalize += gaussian_2d(u as f64, v as f64, sigma);
                }
            }
            (normalize, gaussian_2d(j as f64, 0.0, sigma))
        } else {
            let normalize = (-j..=j).map(|u| gaussian_1d(u as f64, sigma)).sum::<f64>();
            (normalize, gaussian_1d(j as f64, sigma))
        };
        let value = edge / normalize;
        // NaN also stops the search
        if !(value >= KERNEL_CUTOFF && value >= EPSILON) {
            break;
        }
        width += 2;
    }
    Ok(width - 2)
}

/// The smallest odd width that holds a line gaussian of `sigma`.
///
/// A positive `radius` fixes the width to `2 * ceil(radius) + 1`. Otherwise
/// the width grows until the outermost normalized weight drops below one
/// 16-bit quantum. A degenerate sigma yields 3.
///
/// # Errors
///
/// Returns an error if the width of `radius` does not fit the address space.
///
/// # Example
///
/// ```
/// use stipple_imgproc::filter::kernels::optimal_kernel_width_1d;
///
/// assert_eq!(optimal_kernel_width_1d(2.3, 1.0), Ok(7));
/// assert_eq!(optimal_kernel_width_1d(0.0, 1.0), Ok(9));
/// assert_eq!(optimal_kernel_width_1d(0.0, 0.0), Ok(3));
/// assert!(optimal_kernel_width_1d(1e20, 1.0).is_err());
/// ```
pub fn optimal_kernel_width_1d(radius: f64, sigma: f64) -> Result<usize, FilterError> {
    optimal_width(radius, sigma, false)
}

/// The smallest odd width that holds a plane gaussian of `sigma`.
///
/// Same rule as [`optimal_kernel_width_1d`], normalizing over the square.
pub fn optimal_kernel_width_2d(radius: f64, sigma: f64) -> Result<usize, FilterError> {
    optimal_width(radius, sigma, true)
}

/// Create a square gaussian kernel normalized to sum one.
///
/// # Arguments
///
/// * `radius` - The kernel radius, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
///
/// # Returns
///
/// The identity kernel when `sigma` is degenerate.
pub fn gaussian_kernel_2d(radius: f64, sigma: f64) -> Result<Kernel, FilterError> {
    let width = optimal_kernel_width_2d(radius, sigma)?;
    let kernel = if is_degenerate_sigma(sigma) {
        Kernel::identity(width)?
    } else {
        let mut kernel = Kernel::from_fn(width, width, |u, v| {
            gaussian_2d(u as f64, v as f64, sigma)
        })?;
        kernel.normalize();
        kernel
    };
    kernel.log("gaussian");
    Ok(kernel)
}

/// Create a horizontal gaussian line kernel normalized to sum one.
///
/// # Arguments
///
/// * `radius` - The kernel radius, 0 to derive it from `sigma`.
/// * `sigma` - The standard deviation of the gaussian.
pub fn gaussian_kernel_1d(radius: f64, sigma: f64) -> Result<Kernel, FilterError> {
    let width = optimal_kernel_width_1d(radius, sigma)?;
    let kernel = if is_degenerate_sigma(sigma) {
        Kernel::from_fn(width, 1, |u, _| if u == 0 { 1.0 } else { 0.0 })?
    } else {
        let mut kernel = Kernel::from_fn(width, 1, |u, _| gaussian_1d(u as f64, sigma))?;
        kernel.normalize();
        kernel
    };
    kernel.log("blur");
    Ok(kernel)
}

/// Create a laplacian of gaussian sharpening kernel normalized to sum one.
///
/// The negated gaussian with its center replaced by twice the magnitude of
/// the gaussian's sum.
pub fn sharpen_kernel(radius: f64, sigma: f64) -> Result<Kernel, FilterError> {
    let width = optimal_kernel_width_2d(radius, sigma)?;
    if is_degenerate_sigma(sigma) {
        return Kernel::identity(width);
    }
    let mut kernel = Kernel::from_fn(width, width, |u, v| -gaussian_2d(u as f64, v as f64, sigma))?;
    let center = kernel.values.len() / 2;
    kernel.values[center] = -2.0 * kernel.sum();
    kernel.normalize();
    kernel.log("sharpen");
    Ok(kernel)
}

/// Create an edge detection kernel: all -1 with a balancing center.
///
/// The weights sum to zero.
///
/// # Example
///
/// ```
/// use stipple_imgproc::filter::kernels::edge_kernel;
///
/// let kernel = edge_kernel(1.0).unwrap();
/// assert_eq!(kernel.width(), 3);
/// assert_eq!(kernel.values()[4], 8.0);
/// assert_eq!(kernel.sum(), 0.0);
/// ```
pub fn edge_kernel(radius: f64) -> Result<Kernel, FilterError> {
    let width = optimal_kernel_width_1d(radius, 0.5)?;
    let center = (width * width - 1) as f64;
    let kernel = Kernel::from_fn(width, width, |u, v| {
        if u == 0 && v == 0 {
            center
        } else {
            -1.0
        }
    })?;
    kernel.log("edge");
    Ok(kernel)
}

/// Create an emboss kernel.
///
/// Only the anti-diagonal running from the top-right to the bottom-left
/// cell is non-zero. Its gaussian weights are negative in the upper-right
/// half and positive at the center, and the kernel is scaled by the
/// reciprocal of its sum.
pub fn emboss_kernel(radius: f64, sigma: f64) -> Result<Kernel, FilterError> {
    let width = optimal_kernel_width_1d(radius, sigma)?;
    if is_degenerate_sigma(sigma) {
        return Kernel::identity(width);
    }
    let mut kernel = Kernel::from_fn(width, width, |u, v| {
        if u != -v {
            return 0.0;
        }
        let sign = if u < 0 || v < 0 { -8.0 } else { 8.0 };
        sign * gaussian_2d(u as f64, v as f64, sigma)
    })?;
    kernel.normalize();
    kernel.log("emboss");
    Ok(kernel)
}

/// Create the one-sided gaussian weights of a motion blur.
///
/// Weight `i` belongs to the sample `i` steps along the motion; the weights
/// sum to one.
pub fn motion_kernel(width: usize, sigma: f64) -> Result<Vec<f64>, FilterError> {
    let mut weights = alloc_buffer(width, 0.0)?;
    if is_degenerate_sigma(sigma) {
        if let Some(first) = weights.first_mut() {
            *first = 1.0;
        }
        return Ok(weights);
    }
    for (i, w) in weights.iter_mut().enumerate() {
        *w = gaussian_1d(i as f64, sigma);
    }
    let gamma = perceptible_reciprocal(weights.iter().sum());
    weights.iter_mut().for_each(|w| *w *= gamma);
    log::debug!("motion kernel: {} weights, sigma {}", width, sigma);
    Ok(weights)
}

/// Whether an adaptive kernel family blurs or sharpens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Gaussian kernels.
    Blur,
    /// Laplacian of gaussian kernels.
    Sharpen,
}

/// Create the kernels of an adaptive filter of `width`.
///
/// Entry `n` is a square kernel of width `width - 2n`, so the family runs
/// from `width` down to 1. Each kernel sums to one.
pub fn adaptive_kernels(
    width: usize,
    sigma: f64,
    polarity: Polarity,
) -> Result<Vec<Kernel>, FilterError> {
    let mut kernels = Vec::new();
    kernels
        .try_reserve_exact(width.div_ceil(2))
        .map_err(|_| stipple_image::ImageError::AllocationFailed(width.div_ceil(2)))?;

    for size in (1..=width).rev().step_by(2) {
        let kernel = if is_degenerate_sigma(sigma) {
            Kernel::identity(size)?
        } else {
            let mut kernel = match polarity {
                Polarity::Blur => {
                    Kernel::from_fn(size, size, |u, v| gaussian_2d(u as f64, v as f64, sigma))?
                }
                Polarity::Sharpen => {
                    Kernel::from_fn(size, size, |u, v| -gaussian_2d(u as f64, v as f64, sigma))?
                }
            };
            let center = kernel.values.len() / 2;
            match polarity {
                Polarity::Blur => kernel.values[center] += 1.0 - kernel.sum(),
                Polarity::Sharpen => {
                    kernel.values[center] = -2.0 * kernel.sum();
                    kernel.normalize();
                }
            }
            kernel
        };
        kernels.push(kernel);
    }
    log::debug!(
        "adaptive {:?} family: {} kernels from width {}",
        polarity,
        kernels.len(),
        width
    );
    Ok(kernels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn kernel_validation() {
        assert_eq!(
            Kernel::new(4, 3, vec![0.0; 12]),
            Err(FilterError::KernelWidthNotOdd(4))
        );
        assert_eq!(
            Kernel::new(3, 2, vec![0.0; 6]),
            Err(FilterError::KernelHeightNotOdd(2))
        );
        assert_eq!(
            Kernel::new(3, 3, vec![0.0; 8]),
            Err(FilterError::InvalidKernelLength(8, 9))
        );
        let kernel = Kernel::new(3, 3, vec![0.0; 9]).map(|k| k.with_anchor(3, 0));
        assert_eq!(kernel, Ok(Err(FilterError::InvalidKernelAnchor(3, 0))));
    }

    #[test]
    fn optimal_widths() -> Result<(), FilterError> {
        assert_eq!(optimal_kernel_width_1d(0.0, 0.5)?, 5);
        assert_eq!(optimal_kernel_width_1d(0.0, 2.0)?, 17);
        assert_eq!(optimal_kernel_width_2d(0.0, 1.0)?, 9);
        assert_eq!(optimal_kernel_width_2d(0.0, 2.0)?, 15);
        assert_eq!(optimal_kernel_width_2d(1.0, 5.0)?, 3);
        assert_eq!(optimal_kernel_width_2d(0.0, f64::NAN)?, 3);
        Ok(())
    }

    #[test]
    fn oversized_radius() {
        for radius in [1e20, f64::INFINITY] {
            assert_eq!(
                optimal_kernel_width_1d(radius, 1.0),
                Err(FilterError::InvalidParameter {
                    name: "radius",
                    value: radius
                })
            );
            assert!(gaussian_kernel_2d(radius, 1.0).is_err());
        }
    }

    #[test]
    fn gaussian_sums_to_one() -> Result<(), FilterError> {
        for sigma in [0.5, 1.0, 1.5, 3.0] {
            let kernel = gaussian_kernel_2d(0.0, sigma)?;
            assert_eq!(kernel.width() % 2, 1);
            assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-6);

            let kernel = gaussian_kernel_1d(0.0, sigma)?;
            assert_eq!(kernel.height(), 1);
            assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn gaussian_is_symmetric() -> Result<(), FilterError> {
        let kernel = gaussian_kernel_2d(2.0, 1.0)?;
        assert_eq!(kernel.width(), 5);
        let values = kernel.values();
        for i in 0..values.len() {
            assert_abs_diff_eq!(values[i], values[values.len() - 1 - i], epsilon = 1e-15);
        }
        assert!(values[12] > values[11] && values[11] > values[10]);
        Ok(())
    }

    #[test]
    fn degenerate_sigma_is_identity() -> Result<(), FilterError> {
        let kernel = gaussian_kernel_2d(0.0, 0.0)?;
        assert_eq!(kernel.width(), 3);
        assert_eq!(kernel.values(), &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);

        let kernel = gaussian_kernel_1d(2.0, 0.0)?;
        assert_eq!(kernel.values(), &[0.0, 0.0, 1.0, 0.0, 0.0]);

        assert_eq!(sharpen_kernel(0.0, 0.0)?, Kernel::identity(3)?);
        Ok(())
    }

    #[test]
    fn sharpen_sums_to_one() -> Result<(), FilterError> {
        for sigma in [0.5, 1.0, 2.0] {
            let kernel = sharpen_kernel(0.0, sigma)?;
            assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-6);
            let center = kernel.values().len() / 2;
            assert!(kernel.values()[center] > 1.0);
            assert!(kernel.values()[0] < 0.0);
        }
        Ok(())
    }

    #[test]
    fn emboss_is_anti_diagonal() -> Result<(), FilterError> {
        let kernel = emboss_kernel(1.0, 1.0)?;
        assert_eq!(kernel.width(), 3);
        for v in 0..3 {
            for u in 0..3 {
                let k = kernel.at(u, v).unwrap_or_default();
                if u + v == 2 {
                    assert_ne!(k, 0.0);
                } else {
                    assert_eq!(k, 0.0);
                }
            }
        }
        // outer weights share a sign opposite to the center
        let (corner, center) = (kernel.values()[2], kernel.values()[4]);
        assert!(corner * center < 0.0);
        assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn transpose_line() -> Result<(), FilterError> {
        let kernel = Kernel::new(3, 1, vec![1.0, 2.0, 3.0])?.with_anchor(0, 0)?;
        let vertical = kernel.transpose()?;
        assert_eq!(vertical.width(), 1);
        assert_eq!(vertical.height(), 3);
        assert_eq!(vertical.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(vertical.anchor(), (0, 0));
        Ok(())
    }

    #[test]
    fn motion_weights() -> Result<(), FilterError> {
        let weights = motion_kernel(5, 1.0)?;
        assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(weights.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(motion_kernel(3, 0.0)?, vec![1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn adaptive_family() -> Result<(), FilterError> {
        for polarity in [Polarity::Blur, Polarity::Sharpen] {
            let kernels = adaptive_kernels(7, 1.0, polarity)?;
            let widths = kernels.iter().map(Kernel::width).collect::<Vec<_>>();
            assert_eq!(widths, vec![7, 5, 3, 1]);
            for kernel in &kernels {
                assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-9);
            }
        }
        Ok(())
    }
}
