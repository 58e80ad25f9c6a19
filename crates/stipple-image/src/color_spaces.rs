use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::error::ImageError;

/// The colorspace an image's channels are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// A single luminance channel, optionally followed by alpha.
    Gray,
    /// Red, green and blue, optionally followed by alpha.
    Rgb,
    /// Cyan, magenta, yellow and black, optionally followed by alpha.
    Cmyk,
}

impl ColorSpace {
    /// Number of color channels (alpha excluded).
    pub const fn color_channels(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    /// The default colorspace for an image with `channels` channels.
    ///
    /// One or two channels are gray (plus alpha), three or four are RGB (plus
    /// alpha) and five are CMYK plus alpha.
    pub fn from_channels(channels: usize) -> Result<Self, ImageError> {
        match channels {
            1 | 2 => Ok(ColorSpace::Gray),
            3 | 4 => Ok(ColorSpace::Rgb),
            5 => Ok(ColorSpace::Cmyk),
            _ => Err(ImageError::IncompatibleColorSpace(ColorSpace::Rgb, channels)),
        }
    }

    /// Check that the colorspace can describe a layout of `channels` channels.
    pub fn validate(&self, channels: usize) -> Result<(), ImageError> {
        let color = self.color_channels();
        if channels == color || channels == color + 1 {
            Ok(())
        } else {
            Err(ImageError::IncompatibleColorSpace(*self, channels))
        }
    }

    /// Role of the channel at `index` in a layout of `channels` channels.
    pub fn channel_kind(&self, index: usize, channels: usize) -> ChannelKind {
        if index >= self.color_channels() && index + 1 == channels {
            return ChannelKind::Alpha;
        }
        match (self, index) {
            (ColorSpace::Gray, _) => ChannelKind::Gray,
            (_, 0) => ChannelKind::Red,
            (_, 1) => ChannelKind::Green,
            (_, 2) => ChannelKind::Blue,
            _ => ChannelKind::Black,
        }
    }
}

/// The role a channel plays in a pixel.
///
/// Cyan, magenta and yellow share the red, green and blue roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Red or cyan.
    Red,
    /// Green or magenta.
    Green,
    /// Blue or yellow.
    Blue,
    /// Luminance of a gray image.
    Gray,
    /// The black plate of a CMYK image.
    Black,
    /// Alpha, with 0 fully transparent.
    Alpha,
}

impl ChannelKind {
    /// The mask bit that selects this channel.
    pub const fn mask(&self) -> ChannelMask {
        match self {
            ChannelKind::Red | ChannelKind::Gray => ChannelMask::RED,
            ChannelKind::Green => ChannelMask::GREEN,
            ChannelKind::Blue => ChannelMask::BLUE,
            ChannelKind::Black => ChannelMask::BLACK,
            ChannelKind::Alpha => ChannelMask::ALPHA,
        }
    }

    /// Whether the channel carries color (gray included, black excluded).
    pub const fn is_color(&self) -> bool {
        matches!(
            self,
            ChannelKind::Red | ChannelKind::Green | ChannelKind::Blue | ChannelKind::Gray
        )
    }
}

/// A set of channels an operation applies to.
///
/// # Examples
///
/// ```
/// use stipple_image::ChannelMask;
///
/// let mask = ChannelMask::RED | ChannelMask::ALPHA;
/// assert!(mask.contains(ChannelMask::ALPHA));
/// assert!(!mask.contains(ChannelMask::GREEN));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// No channel.
    pub const NONE: Self = Self(0);
    /// Red, cyan or gray.
    pub const RED: Self = Self(0x01);
    /// Luminance of a gray image, same bit as red.
    pub const GRAY: Self = Self::RED;
    /// Green or magenta.
    pub const GREEN: Self = Self(0x02);
    /// Blue or yellow.
    pub const BLUE: Self = Self(0x04);
    /// Alpha.
    pub const ALPHA: Self = Self(0x08);
    /// Black plate of CMYK images.
    pub const BLACK: Self = Self(0x20);
    /// Every channel but alpha.
    pub const DEFAULT: Self = Self(0x01 | 0x02 | 0x04 | 0x20);
    /// Every channel.
    pub const ALL: Self = Self(0x01 | 0x02 | 0x04 | 0x08 | 0x20);

    /// Raw bits of the mask.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(&self, other: ChannelMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    pub const fn intersects(&self, other: ChannelMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no bit is set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for ChannelMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChannelMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ChannelMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ChannelMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kinds() {
        assert_eq!(ColorSpace::Gray.channel_kind(0, 1), ChannelKind::Gray);
        assert_eq!(ColorSpace::Gray.channel_kind(1, 2), ChannelKind::Alpha);
        assert_eq!(ColorSpace::Rgb.channel_kind(2, 3), ChannelKind::Blue);
        assert_eq!(ColorSpace::Rgb.channel_kind(3, 4), ChannelKind::Alpha);
        assert_eq!(ColorSpace::Cmyk.channel_kind(3, 4), ChannelKind::Black);
        assert_eq!(ColorSpace::Cmyk.channel_kind(4, 5), ChannelKind::Alpha);
    }

    #[test]
    fn colorspace_validation() {
        assert!(ColorSpace::Cmyk.validate(4).is_ok());
        assert!(ColorSpace::Cmyk.validate(3).is_err());
        assert_eq!(ColorSpace::from_channels(2), Ok(ColorSpace::Gray));
        assert!(ColorSpace::from_channels(6).is_err());
    }

    #[test]
    fn mask_ops() {
        let mask = ChannelMask::DEFAULT;
        assert!(!mask.contains(ChannelMask::ALPHA));
        assert!(mask.contains(ChannelMask::BLACK));
        assert_eq!(!ChannelMask::ALPHA, ChannelMask::DEFAULT);
        assert_eq!(mask | ChannelMask::ALPHA, ChannelMask::ALL);
        assert!((ChannelMask::RED & ChannelMask::GREEN).is_empty());
    }
}
