//! Per-slot key fingerprints for rejecting foreign keys.
#![cfg(target_pointer_width = "64")]

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};
use crate::hash::murmur2;
use crate::int_vectors::{CompactVector, CompactVectorBuilder};
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};

/// Largest supported fingerprint width.
pub const MAX_FINGERPRINT_BITS: usize = 32;

/// Returns the top `bits` bits of the MurmurHash2 of `key`.
#[inline(always)]
pub fn fingerprint(key: &[u8], bits: usize, seed: u32) -> usize {
    (murmur2(key, seed) >> (32 - bits)) as usize
}

fn check_width(bits: usize) -> Result<()> {
    if !(1..=MAX_FINGERPRINT_BITS).contains(&bits) {
        return Err(Error::invalid_argument(format!(
            "fingerprint bits must be in 1..={MAX_FINGERPRINT_BITS}, but got {bits}."
        )));
    }
    Ok(())
}

/// Mutable builder for [`FingerprintStore`].
#[derive(Debug, Clone)]
pub struct FingerprintStoreBuilder {
    slots: CompactVectorBuilder,
    seed: u32,
}

impl FingerprintStoreBuilder {
    /// Creates a builder for `len` slots of `bits` bits each.
    ///
    /// # Errors
    ///
    /// An error is returned if `bits` is not in `1..=32`.
    pub fn new(len: usize, bits: usize, seed: u32) -> Result<Self> {
        check_width(bits)?;
        Ok(Self {
            slots: CompactVectorBuilder::zeroed(len, bits)?,
            seed,
        })
    }

    /// Stores the fingerprint of `key` in slot `index`.
    ///
    /// # Errors
    ///
    /// An error is returned if `index` is out of bounds.
    pub fn store(&mut self, index: usize, key: &[u8]) -> Result<()> {
        let fp = fingerprint(key, self.slots.width(), self.seed);
        self.slots.set_int(index, fp)
    }

    /// Finalizes the builder.
    pub fn freeze(self) -> FingerprintStore {
        FingerprintStore {
            slots: self.slots.freeze(),
            seed: self.seed,
        }
    }
}

/// Fixed-width array of key fingerprints indexed by perfect hash slot.
///
/// A foreign key hashed to slot `i` passes [`check`](Self::check) with
/// probability $`2^{-w}`$ for $`w`$-bit fingerprints.
///
/// # Examples
///
/// ```
/// use grambit::fingerprint::FingerprintStoreBuilder;
///
/// let mut builder = FingerprintStoreBuilder::new(2, 32, 0).unwrap();
/// builder.store(0, b"apple").unwrap();
/// builder.store(1, b"banana").unwrap();
/// let fps = builder.freeze();
///
/// assert!(fps.check(0, b"apple"));
/// assert!(!fps.check(0, b"banana"));
/// assert!(!fps.check(2, b"apple"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintStore {
    slots: CompactVector,
    seed: u32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct FingerprintStoreMeta {
    seed: u64,
}

impl FingerprintStore {
    /// Checks whether slot `index` holds the fingerprint of `key`.
    ///
    /// An out-of-range `index` yields `false`.
    #[inline(always)]
    pub fn check(&self, index: usize, key: &[u8]) -> bool {
        match self.slots.get_int(index) {
            Some(fp) => fp == fingerprint(key, self.slots.width(), self.seed),
            None => false,
        }
    }

    /// Gets the number of slots.
    pub const fn len(&self) -> usize {
        self.slots.len()
    }

    /// Checks if there is no slot.
    pub const fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Gets the number of bits per fingerprint.
    pub const fn bits(&self) -> usize {
        self.slots.width()
    }

    /// Returns the number of payload bits.
    pub const fn size_in_bits(&self) -> usize {
        self.slots.size_in_bits()
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.slots.size_in_bytes() + std::mem::size_of::<u32>()
    }
}

impl Serializable for FingerprintStore {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&FingerprintStoreMeta {
            seed: self.seed as u64,
        });
        self.slots.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: FingerprintStoreMeta = reader.meta()?;
        let seed = u32::try_from(meta.seed)
            .map_err(|_| Error::invalid_metadata("fingerprint seed overflowed u32"))?;
        let slots = CompactVector::deserialize_from(reader)?;
        if !slots.is_empty() {
            check_width(slots.width()).map_err(|e| Error::invalid_metadata(e.to_string()))?;
        }
        Ok(Self { slots, seed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wide_fingerprints() {
        let e = FingerprintStoreBuilder::new(1, 33, 0);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("fingerprint bits must be in 1..=32, but got 33.".to_string())
        );
        assert!(FingerprintStoreBuilder::new(1, 0, 0).is_err());
    }

    #[test]
    fn test_top_bits() {
        let h = murmur2(b"cherry", 0);
        assert_eq!(fingerprint(b"cherry", 32, 0), h as usize);
        assert_eq!(fingerprint(b"cherry", 12, 0), (h >> 20) as usize);
        assert_eq!(fingerprint(b"cherry", 1, 0), (h >> 31) as usize);
    }

    #[test]
    fn test_false_positive_rate_is_bounded() {
        let n = 4096;
        let mut builder = FingerprintStoreBuilder::new(n, 8, 0).unwrap();
        for i in 0..n {
            builder.store(i, format!("key-{i}").as_bytes()).unwrap();
        }
        let fps = builder.freeze();
        for i in 0..n {
            assert!(fps.check(i, format!("key-{i}").as_bytes()));
        }
        let hits = (0..n)
            .filter(|&i| fps.check(i, format!("other-{i}").as_bytes()))
            .count();
        // Expected n / 256 = 16.
        assert!(hits < 64, "{hits} false positives");
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut builder = FingerprintStoreBuilder::new(3, 12, 9).unwrap();
        builder.store(0, b"a").unwrap();
        builder.store(2, b"c").unwrap();
        let fps = builder.freeze();
        let other = FingerprintStore::from_snapshot_bytes(&fps.to_snapshot_bytes()).unwrap();
        assert_eq!(fps, other);
        assert!(other.check(2, b"c"));
    }
}
