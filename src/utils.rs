//! Utils.

/// Returns the number of bits to represent `x` at least.
///
/// # Arguments
///
/// - `x`: Target integer.
///
/// # Examples
///
/// ```
/// use grambit::utils::needed_bits;
///
/// assert_eq!(needed_bits(0), 1);
/// assert_eq!(needed_bits(1), 1);
/// assert_eq!(needed_bits(2), 2);
/// assert_eq!(needed_bits(255), 8);
/// assert_eq!(needed_bits(256), 9);
/// ```
pub const fn needed_bits(x: usize) -> usize {
    if x == 0 {
        1
    } else {
        (usize::BITS - x.leading_zeros()) as usize
    }
}

/// Returns `x` rounded up to a multiple of `align`.
pub const fn round_up(x: usize, align: usize) -> usize {
    x.div_ceil(align) * align
}
