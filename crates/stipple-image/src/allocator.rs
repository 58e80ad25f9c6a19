use crate::error::ImageError;

/// Compute the number of samples of a `width x height x channels` buffer.
///
/// # Errors
///
/// Returns [`ImageError::AllocationFailed`] if the product overflows `usize`.
pub fn buffer_len(width: usize, height: usize, channels: usize) -> Result<usize, ImageError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(ImageError::AllocationFailed(usize::MAX))
}

/// Allocate a buffer of `len` copies of `val`.
///
/// Unlike `vec![val; len]` this reports an exhausted allocator as an error
/// instead of aborting the process.
///
/// # Errors
///
/// Returns [`ImageError::AllocationFailed`] if the memory cannot be reserved.
///
/// # Example
///
/// ```
/// use stipple_image::allocator::alloc_buffer;
///
/// let buf = alloc_buffer(4, 7u8).unwrap();
/// assert_eq!(buf, vec![7, 7, 7, 7]);
/// ```
pub fn alloc_buffer<T: Clone>(len: usize, val: T) -> Result<Vec<T>, ImageError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ImageError::AllocationFailed(len))?;
    buf.resize(len, val);
    Ok(buf)
}

/// Allocate a buffer holding a copy of `src`.
///
/// # Errors
///
/// Returns [`ImageError::AllocationFailed`] if the memory cannot be reserved.
pub fn alloc_copy<T: Clone>(src: &[T]) -> Result<Vec<T>, ImageError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| ImageError::AllocationFailed(src.len()))?;
    buf.extend_from_slice(src);
    Ok(buf)
}
