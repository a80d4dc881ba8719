//! Constant-time select data structure over integer sets with the dense array technique.
#![cfg(target_pointer_width = "64")]

pub mod inner;

use crate::bit_vectors::data::{BitVector, BitVectorBuilder, BitVectorData};
use crate::bit_vectors::prelude::*;
use crate::error::Result;
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};
use inner::DArrayIndex;

/// Constant-time select data structure over integer sets with the dense array technique.
///
/// Set bits are grouped into blocks of 1024. Blocks spanning fewer than
/// $`2^{16}`$ bits keep a 16-bit offset for every 64th set bit and scan the
/// remainder; wider blocks store every position explicitly.
///
/// # Memory complexity
///
/// $`u + o(u)`$ bits for a bit vector with $`u`$ bits.
///
/// # Examples
///
/// ```
/// use grambit::bit_vectors::{DArray, Access, Select};
///
/// let da = DArray::from_bits([true, false, false, true]);
///
/// assert_eq!(da.len(), 4);
/// assert_eq!(da.access(1), Some(false));
///
/// // 0-indexed through the trait, 1-indexed through `select`.
/// assert_eq!(da.select1(1), Some(3));
/// assert_eq!(da.select(2), Some(3));
/// assert_eq!(da.select(0), None);
/// ```
///
/// # References
///
///  - D. Okanohara, and K. Sadakane, "Practical Entropy-Compressed Rank/Select Dictionary,"
///    In ALENEX, 2007.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DArray {
    bits: BitVector<DArrayIndex>,
}

impl Default for DArray {
    fn default() -> Self {
        Self {
            bits: BitVectorBuilder::new().freeze::<DArrayIndex>(),
        }
    }
}

impl DArray {
    /// Creates a new instance from input bit stream `bits`.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut builder = BitVectorBuilder::new();
        builder.extend_bits(bits);
        Self::from_builder(builder)
    }

    /// Creates a new instance taking ownership of the bits in `builder`.
    pub fn from_builder(builder: BitVectorBuilder) -> Self {
        Self {
            bits: builder.freeze::<DArrayIndex>(),
        }
    }

    /// Creates a new instance over frozen `data`.
    pub fn from_data(data: BitVectorData) -> Self {
        let index = DArrayIndex::new(&data);
        Self {
            bits: BitVector::new(data, index),
        }
    }

    /// Returns the position of the `k`-th set bit, counting from 1, or
    /// [`None`] if `k == 0` or `k` exceeds the number of set bits.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    pub fn select(&self, k: usize) -> Option<usize> {
        self.select1(k.checked_sub(1)?)
    }

    /// Returns the reference of the internal bit vector.
    pub const fn bit_vector(&self) -> &BitVector<DArrayIndex> {
        &self.bits
    }

    /// Returns the number of bits stored.
    pub const fn len(&self) -> usize {
        self.bits.len()
    }

    /// Checks if the vector is empty.
    pub const fn is_empty(&self) -> bool {
        self.bits.len() == 0
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.bits.data.size_in_bytes() + self.bits.index.size_in_bytes()
    }
}

impl NumBits for DArray {
    fn num_bits(&self) -> usize {
        self.bits.num_bits()
    }

    fn num_ones(&self) -> usize {
        self.bits.index.num_ones()
    }
}

impl Access for DArray {
    fn access(&self, pos: usize) -> Option<bool> {
        self.bits.access(pos)
    }
}

impl Select for DArray {
    fn select1(&self, k: usize) -> Option<usize> {
        self.bits.index.select(&self.bits.data, k)
    }
}

impl Serializable for DArray {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        self.bits.data.serialize_into(writer);
        self.bits.index.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let data = BitVectorData::deserialize_from(reader)?;
        let index = DArrayIndex::deserialize_from(reader)?;
        if index.num_ones() > data.len() {
            return Err(crate::error::Error::invalid_metadata(
                "select index covers more ones than the vector holds",
            ));
        }
        Ok(Self {
            bits: BitVector::new(data, index),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions_of(bits: &[bool]) -> Vec<usize> {
        bits.iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    #[test]
    fn test_empty() {
        let da = DArray::default();
        assert_eq!(da.len(), 0);
        assert_eq!(da.select(1), None);
        assert_eq!(da.select1(0), None);
    }

    #[test]
    fn test_dense_short_blocks() {
        let bits: Vec<bool> = (0..20_000).map(|i| i % 3 != 0).collect();
        let da = DArray::from_bits(bits.iter().copied());
        let expected = positions_of(&bits);
        assert_eq!(da.num_ones(), expected.len());
        assert_eq!(da.bit_vector().index.inventory().num_long_blocks(), 0);
        for (k, &p) in expected.iter().enumerate() {
            assert_eq!(da.select(k + 1), Some(p));
        }
        assert_eq!(da.select(expected.len() + 1), None);
    }

    #[test]
    fn test_sparse_long_blocks() {
        let len = 1500 * 97;
        let bits: Vec<bool> = (0..len).map(|i| i % 97 == 5).collect();
        let da = DArray::from_bits(bits.iter().copied());
        let expected = positions_of(&bits);
        assert!(da.bit_vector().index.inventory().num_long_blocks() >= 1);
        for (k, &p) in expected.iter().enumerate() {
            assert_eq!(da.select1(k), Some(p));
        }
    }

    #[test]
    fn test_mixed_blocks() {
        // A dense prefix followed by a sparse tail puts both kinds in one index.
        let mut bits = vec![true; 4096];
        bits.extend((0..300_000).map(|i| i % 211 == 0));
        let da = DArray::from_bits(bits.iter().copied());
        let expected = positions_of(&bits);
        for (k, &p) in expected.iter().enumerate() {
            assert_eq!(da.select(k + 1), Some(p));
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let da = DArray::from_bits((0..5000).map(|i| i % 7 == 1));
        let bytes = da.to_snapshot_bytes();
        let other = DArray::from_snapshot_bytes(&bytes).unwrap();
        assert_eq!(da, other);
        assert_eq!(other.select(10), da.select(10));
    }
}
