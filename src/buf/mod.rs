//! Aligned cursor over a growable byte buffer.

#[cfg(test)]
mod tests;

pub use self::marshaller::Marshaller;
mod marshaller;

/// Calculate padding needed to bring `len` up to `align`, with the assumption
/// that alignment is a power of two.
#[inline(always)]
pub(crate) fn padding_to(len: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    let mask = align - 1;
    (align - (len & mask)) & mask
}
