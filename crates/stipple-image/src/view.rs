use crate::{error::ImageError, image::Image};

/// How coordinates outside the image resolve to samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingMode {
    /// Fills the outside with zero samples (black, fully transparent).
    ///
    /// Example: ...d c b a | 0 0 0 0...
    Constant,

    /// Repeats the outermost row or column of pixels.
    ///
    /// Example: ...d c b a | a a a a...
    #[default]
    Replicate,

    /// Mirrors the image at the boundary, starting with the edge pixel itself.
    ///
    /// Example: ...d c b a | a b c d...
    Reflect,

    /// Wraps the content from the opposite side.
    ///
    /// Example: ...d c b a | w x y z...
    Wrap,
}

impl PaddingMode {
    #[inline]
    fn reflect(i: isize, len: usize) -> usize {
        let period = 2 * len as isize;
        let i = i.rem_euclid(period);
        if i < len as isize {
            i as usize
        } else {
            (period - 1 - i) as usize
        }
    }

    /// Maps index `i` to a valid index within `[0, len)`.
    ///
    /// Returns `None` for [`PaddingMode::Constant`] when `i` is outside, or
    /// when `len` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use stipple_image::view::PaddingMode;
    ///
    /// assert_eq!(PaddingMode::Replicate.map_index(-3, 4), Some(0));
    /// assert_eq!(PaddingMode::Reflect.map_index(5, 4), Some(2));
    /// assert_eq!(PaddingMode::Wrap.map_index(-1, 4), Some(3));
    /// assert_eq!(PaddingMode::Constant.map_index(4, 4), None);
    /// ```
    #[inline]
    pub fn map_index(&self, i: isize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if i >= 0 && (i as usize) < len {
            return Some(i as usize);
        }
        match self {
            PaddingMode::Constant => None,
            PaddingMode::Replicate => Some(i.clamp(0, len as isize - 1) as usize),
            PaddingMode::Reflect => Some(Self::reflect(i, len)),
            PaddingMode::Wrap => Some(i.rem_euclid(len as isize) as usize),
        }
    }
}

/// Read-only access to an image with coordinates extended past its borders.
///
/// Any number of views may read one image concurrently.
///
/// # Examples
///
/// ```
/// use stipple_image::{view::PixelView, Image};
///
/// let image = Image::<u8, 1>::new([2, 1].into(), vec![10, 20]).unwrap();
/// let view = PixelView::new(&image);
///
/// let mut window = vec![0u8; 4];
/// view.read_window(-1, 0, 4, 1, &mut window).unwrap();
/// assert_eq!(window, vec![10, 10, 20, 20]);
/// ```
#[derive(Clone, Copy)]
pub struct PixelView<'a, T, const C: usize> {
    image: &'a Image<T, C>,
    mode: PaddingMode,
}

impl<'a, T: Copy + Default, const C: usize> PixelView<'a, T, C> {
    /// Create a view that duplicates edge pixels outside the image.
    pub fn new(image: &'a Image<T, C>) -> Self {
        Self::with_mode(image, PaddingMode::Replicate)
    }

    /// Create a view with an explicit padding mode.
    pub fn with_mode(image: &'a Image<T, C>, mode: PaddingMode) -> Self {
        Self { image, mode }
    }

    /// The image behind the view.
    pub fn image(&self) -> &'a Image<T, C> {
        self.image
    }

    /// Read the pixel at `(x, y)` into `dst`.
    #[inline]
    pub fn read_pixel(&self, x: isize, y: isize, dst: &mut [T]) {
        let (cols, rows) = (self.image.cols(), self.image.rows());
        match (self.mode.map_index(x, cols), self.mode.map_index(y, rows)) {
            (Some(sx), Some(sy)) => {
                let offset = (sy * cols + sx) * C;
                dst[..C].copy_from_slice(&self.image.as_slice()[offset..offset + C]);
            }
            _ => dst[..C].fill(T::default()),
        }
    }

    /// The pixel at `(x, y)` as an array.
    #[inline]
    pub fn pixel(&self, x: isize, y: isize) -> [T; C] {
        let mut px = [T::default(); C];
        self.read_pixel(x, y, &mut px);
        px
    }

    /// Read the `width x height` window whose top-left pixel is `(x, y)`.
    ///
    /// The window is written row-major and interleaved into `dst`, which
    /// must hold exactly `width * height * C` samples.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidWindow`] for an empty window, an empty
    /// image or a buffer of the wrong length.
    pub fn read_window(
        &self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        dst: &mut [T],
    ) -> Result<(), ImageError> {
        let (cols, rows) = (self.image.cols(), self.image.rows());
        if width == 0 || height == 0 || cols == 0 || rows == 0 || dst.len() != width * height * C
        {
            return Err(ImageError::InvalidWindow(width, height, dst.len()));
        }

        let src = self.image.as_slice();
        let stride = width * C;

        // columns of the window that fall inside the image can be copied at once
        let inner_start = x.clamp(0, cols as isize);
        let inner_end = (x + width as isize).clamp(0, cols as isize);

        for (v, dst_row) in dst.chunks_exact_mut(stride).enumerate() {
            let sy = match self.mode.map_index(y + v as isize, rows) {
                Some(sy) => sy,
                None => {
                    dst_row.fill(T::default());
                    continue;
                }
            };
            let src_row = &src[sy * cols * C..(sy + 1) * cols * C];

            for (u, dst_px) in dst_row.chunks_exact_mut(C).enumerate() {
                let sx = x + u as isize;
                if sx >= inner_start && sx < inner_end {
                    continue;
                }
                match self.mode.map_index(sx, cols) {
                    Some(sx) => dst_px.copy_from_slice(&src_row[sx * C..(sx + 1) * C]),
                    None => dst_px.fill(T::default()),
                }
            }

            if inner_end > inner_start {
                let u0 = (inner_start - x) as usize;
                let n = (inner_end - inner_start) as usize;
                let s0 = inner_start as usize;
                dst_row[u0 * C..(u0 + n) * C].copy_from_slice(&src_row[s0 * C..(s0 + n) * C]);
            }
        }

        Ok(())
    }
}
