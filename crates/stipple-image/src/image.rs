use crate::{
    allocator::{alloc_buffer, alloc_copy, buffer_len},
    color_spaces::{ChannelKind, ColorSpace},
    error::ImageError,
    sample::Sample,
};

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use stipple_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Whether the image has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents an image with pixel data.
///
/// Samples are stored row-major and interleaved, `CHANNELS` per pixel. The
/// colorspace tells which channel is color, black or alpha.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
    colorspace: ColorSpace,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Returns
    ///
    /// A new image with the given pixel data and the default colorspace for
    /// `CHANNELS` channels.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, or no
    /// colorspace describes `CHANNELS` channels, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use stipple_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new(
    ///    ImageSize {
    ///       width: 10,
    ///       height: 20,
    ///    },
    ///    vec![0u8; 10 * 20 * 3],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = buffer_len(size.width, size.height, CHANNELS)?;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }

        Ok(Self {
            size,
            data,
            colorspace: ColorSpace::from_channels(CHANNELS)?,
        })
    }

    /// Create a new image with the given size and default pixel data.
    ///
    /// # Errors
    ///
    /// If the buffer cannot be allocated an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use stipple_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::from_size_val(
    ///   ImageSize {
    ///     width: 10,
    ///     height: 20,
    ///   }, 0u8).unwrap();
    ///
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let len = buffer_len(size.width, size.height, CHANNELS)?;
        Image::new(size, alloc_buffer(len, val)?)
    }

    /// Re-declare the colorspace of the image.
    ///
    /// # Errors
    ///
    /// If the colorspace cannot describe `CHANNELS` channels an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use stipple_image::{ColorSpace, Image, ImageSize};
    ///
    /// let image = Image::<u8, 4>::from_size_val([2, 2].into(), 0)
    ///     .unwrap()
    ///     .with_colorspace(ColorSpace::Cmyk)
    ///     .unwrap();
    ///
    /// assert!(!image.has_alpha());
    /// ```
    pub fn with_colorspace(mut self, colorspace: ColorSpace) -> Result<Self, ImageError> {
        colorspace.validate(CHANNELS)?;
        self.colorspace = colorspace;
        Ok(self)
    }

    /// Copy the image into a freshly allocated buffer.
    ///
    /// # Errors
    ///
    /// If the buffer cannot be allocated an error is returned.
    pub fn try_clone(&self) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        Ok(Self {
            size: self.size,
            data: alloc_copy(&self.data)?,
            colorspace: self.colorspace,
        })
    }

    /// Create an image of the same size and colorspace filled with `val`.
    ///
    /// # Errors
    ///
    /// If the buffer cannot be allocated an error is returned.
    pub fn like<U: Clone>(&self, val: U) -> Result<Image<U, CHANNELS>, ImageError> {
        let len = self.data.len();
        Ok(Image {
            size: self.size,
            data: alloc_buffer(len, val)?,
            colorspace: self.colorspace,
        })
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// Get the colorspace of the image.
    pub fn colorspace(&self) -> ColorSpace {
        self.colorspace
    }

    /// Role of the channel at `index`.
    pub fn channel_kind(&self, index: usize) -> ChannelKind {
        self.colorspace.channel_kind(index, CHANNELS)
    }

    /// Index of the alpha channel, if the image has one.
    pub fn alpha_index(&self) -> Option<usize> {
        (CHANNELS > self.colorspace.color_channels()).then_some(CHANNELS - 1)
    }

    /// Whether the image carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.alpha_index().is_some()
    }

    /// Number of samples in one row.
    pub fn row_stride(&self) -> usize {
        self.size.width * CHANNELS
    }

    /// Get the pixel data as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the pixel data as a mutable slice.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image and return its pixel data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Get the samples of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of bounds.
    pub fn row(&self, y: usize) -> &[T] {
        let stride = self.row_stride();
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Get the samples of the pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[T]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let offset = (y * self.size.width + x) * CHANNELS;
        Some(&self.data[offset..offset + CHANNELS])
    }

    /// Get a sample by `[y, x, channel]` index, if in bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use stipple_image::Image;
    ///
    /// let image = Image::<u8, 2>::new([1, 2].into(), vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(image.get([1, 0, 1]), Some(&4));
    /// assert_eq!(image.get([2, 0, 0]), None);
    /// ```
    pub fn get(&self, index: [usize; 3]) -> Option<&T> {
        let [y, x, c] = index;
        if c >= CHANNELS {
            return None;
        }
        self.pixel(x, y).map(|p| &p[c])
    }

    /// Set a sample by `[y, x, channel]` index.
    ///
    /// # Errors
    ///
    /// If the index is out of bounds an error is returned.
    pub fn set(&mut self, index: [usize; 3], val: T) -> Result<(), ImageError> {
        let [y, x, c] = index;
        if x >= self.size.width || y >= self.size.height {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.size.width,
                self.size.height,
            ));
        }
        if c >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(c, CHANNELS));
        }
        self.data[(y * self.size.width + x) * CHANNELS + c] = val;
        Ok(())
    }

    /// Get a channel of the image.
    ///
    /// # Errors
    ///
    /// If the channel index is out of bounds, an error is returned.
    pub fn channel(&self, channel: usize) -> Result<Image<T, 1>, ImageError>
    where
        T: Copy,
    {
        if channel >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(channel, CHANNELS));
        }

        let channel_data = self
            .data
            .chunks_exact(CHANNELS)
            .map(|px| px[channel])
            .collect::<Vec<_>>();

        Image::new(self.size, channel_data)
    }

    /// Cast the pixel data of the image to a different type.
    ///
    /// # Errors
    ///
    /// If a sample cannot be represented by `U`, an error is returned.
    pub fn cast<U>(&self) -> Result<Image<U, CHANNELS>, ImageError>
    where
        U: num_traits::NumCast,
        T: num_traits::NumCast + Copy,
    {
        let casted_data = self
            .data
            .iter()
            .map(|&x| U::from(x).ok_or(ImageError::CastError))
            .collect::<Result<Vec<U>, ImageError>>()?;

        Ok(Image {
            size: self.size,
            data: casted_data,
            colorspace: self.colorspace,
        })
    }
}

impl<T: Sample, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Convert to another sample type, rescaling `[0, T::MAX]` onto `[0, U::MAX]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stipple_image::Image;
    ///
    /// let image = Image::<u8, 1>::new([2, 1].into(), vec![0, 255]).unwrap();
    /// let image = image.convert::<f32>().unwrap();
    /// assert_eq!(image.as_slice(), &[0.0, 1.0]);
    /// ```
    pub fn convert<U: Sample>(&self) -> Result<Image<U, CHANNELS>, ImageError> {
        let mut out = self.like(U::default())?;
        out.data
            .iter_mut()
            .zip(self.data.iter())
            .for_each(|(dst, &src)| *dst = U::from_unit(src.to_unit()));
        Ok(out)
    }
}
