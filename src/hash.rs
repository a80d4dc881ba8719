//! Seeded MurmurHash functions over byte strings.
//!
//! [`murmur2`] is the 32-bit MurmurHash2 used for fingerprints. Its output is
//! part of the snapshot format, so it is reproduced bit-exactly.
//! [`murmur64a`] is the 64-bit MurmurHash64A used to place keys in the
//! perfect hash levels.

/// 32-bit MurmurHash2 of `key` with `seed`.
///
/// Reads the key as little-endian 4-byte blocks.
///
/// # Examples
///
/// ```
/// use grambit::hash::murmur2;
///
/// assert_eq!(murmur2(b"", 0), 0);
/// assert_ne!(murmur2(b"apple", 0), murmur2(b"apple", 1));
/// ```
pub fn murmur2(key: &[u8], seed: u32) -> u32 {
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = seed ^ key.len() as u32;

    let mut chunks = key.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// 64-bit MurmurHash64A of `key` with `seed`.
///
/// # Examples
///
/// ```
/// use grambit::hash::murmur64a;
///
/// assert_eq!(murmur64a(b"banana", 7), murmur64a(b"banana", 7));
/// assert_ne!(murmur64a(b"banana", 7), murmur64a(b"banana", 8));
/// ```
pub fn murmur64a(key: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4_a793_5bd1_e995;
    const R: u32 = 47;

    let mut h = seed ^ (key.len() as u64).wrapping_mul(M);

    let mut chunks = key.chunks_exact(8);
    for chunk in &mut chunks {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        let mut k = u64::from_le_bytes(buf);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}
