//! Utilities for broadword computing.

/// The number of bits in a machine word.
pub const WORD_LEN: usize = core::mem::size_of::<usize>() * 8;

/// Returns the number of set bits in `x`.
#[inline(always)]
pub const fn popcount(x: usize) -> usize {
    x.count_ones() as usize
}

/// Returns the position of the least significant set bit, or [`None`] if `x == 0`.
///
/// # Examples
///
/// ```
/// use grambit::broadword::lsb;
///
/// assert_eq!(lsb(0b1000), Some(3));
/// assert_eq!(lsb(0), None);
/// ```
#[inline(always)]
pub const fn lsb(x: usize) -> Option<usize> {
    if x == 0 {
        None
    } else {
        Some(x.trailing_zeros() as usize)
    }
}

/// Returns the position of the `k`-th (0-indexed) set bit in `x`,
/// or [`None`] if `x` has no more than `k` set bits.
///
/// # Examples
///
/// ```
/// use grambit::broadword::select_in_word;
///
/// assert_eq!(select_in_word(0b1011, 0), Some(0));
/// assert_eq!(select_in_word(0b1011, 2), Some(3));
/// assert_eq!(select_in_word(0b1011, 3), None);
/// ```
#[inline(always)]
pub fn select_in_word(x: usize, k: usize) -> Option<usize> {
    if popcount(x) <= k {
        return None;
    }
    let mut k = k;
    let mut shift = 0;
    // Skip whole bytes first, then resolve inside the byte.
    loop {
        let cnt = popcount((x >> shift) & 0xFF);
        if k < cnt {
            break;
        }
        k -= cnt;
        shift += 8;
    }
    let mut byte = (x >> shift) & 0xFF;
    for _ in 0..k {
        byte &= byte - 1;
    }
    Some(shift + byte.trailing_zeros() as usize)
}

/// Reverses the order of the lowest `len` bits of `x`.
///
/// Bits above `len` must be zero. Used to translate between the LSB-first
/// word layout and MSB-first fields.
///
/// # Examples
///
/// ```
/// use grambit::broadword::reverse_low_bits;
///
/// assert_eq!(reverse_low_bits(0b001, 3), 0b100);
/// assert_eq!(reverse_low_bits(0b110, 3), 0b011);
/// ```
#[inline(always)]
pub const fn reverse_low_bits(x: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        x.reverse_bits() >> (WORD_LEN - len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_in_word_all_positions() {
        let x = 0x8000_0100_0001_0011usize;
        let positions: Vec<usize> = (0..64).filter(|&i| (x >> i) & 1 == 1).collect();
        for (k, &p) in positions.iter().enumerate() {
            assert_eq!(select_in_word(x, k), Some(p));
        }
        assert_eq!(select_in_word(x, positions.len()), None);
    }

    #[test]
    fn test_select_in_word_full() {
        for k in 0..64 {
            assert_eq!(select_in_word(usize::MAX, k), Some(k));
        }
    }

    #[test]
    fn test_reverse_full_word() {
        assert_eq!(reverse_low_bits(1, 64), 1 << 63);
        assert_eq!(reverse_low_bits(0, 0), 0);
    }
}
