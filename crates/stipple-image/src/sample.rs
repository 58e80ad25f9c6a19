/// Trait for the sample types an image can store.
///
/// A sample spans the closed range `[0, MAX]`. Filters accumulate in `f64`
/// and convert back with [`Sample::from_f64`], which rounds integer types and
/// clamps every type into range.
pub trait Sample:
    Copy + Default + PartialOrd + Send + Sync + std::fmt::Debug + 'static
{
    /// The value of a full intensity sample.
    const MAX: f64;

    /// Convert the sample to `f64` without scaling.
    fn to_f64(self) -> f64;

    /// Convert an `f64` back to the sample type, clamping into `[0, MAX]`.
    fn from_f64(x: f64) -> Self;

    /// The sample value normalized into `[0, 1]`.
    #[inline]
    fn to_unit(self) -> f64 {
        self.to_f64() / Self::MAX
    }

    /// Scale a value in `[0, 1]` into the sample range.
    #[inline]
    fn from_unit(x: f64) -> Self {
        Self::from_f64(x * Self::MAX)
    }
}

impl Sample for u8 {
    const MAX: f64 = 255.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        // NaN saturates to 0 on the cast
        x.round().clamp(0.0, <Self as Sample>::MAX) as u8
    }
}

impl Sample for u16 {
    const MAX: f64 = 65535.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        x.round().clamp(0.0, <Self as Sample>::MAX) as u16
    }
}

impl Sample for f32 {
    const MAX: f64 = 1.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        if x.is_nan() {
            return 0.0;
        }
        x.clamp(0.0, <Self as Sample>::MAX) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::Sample;

    #[test]
    fn clamp_to_range() {
        assert_eq!(u8::from_f64(-3.2), 0);
        assert_eq!(u8::from_f64(254.6), 255);
        assert_eq!(u8::from_f64(1e9), 255);
        assert_eq!(u16::from_f64(32767.5), 32768);
        assert_eq!(f32::from_f64(1.5), 1.0);
        assert_eq!(f32::from_f64(f64::NAN), 0.0);
    }

    #[test]
    fn unit_scaling() {
        assert_eq!(u8::from_unit(0.5), 128);
        assert_eq!(65535u16.to_unit(), 1.0);
        assert_eq!(0.25f32.to_unit(), 0.25);
    }
}
