//! Select over occurrences of two consecutive set bits.
#![cfg(target_pointer_width = "64")]

use crate::bit_vectors::darray::inner::{Hit, Inventory};
use crate::bit_vectors::data::BitVectorData;
use crate::error::Result;
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};

/// Select index over the `11` patterns of a bit vector.
///
/// Bits are paired from left to right without overlap: once two consecutive
/// set bits are counted, the second one cannot start another pair. A run of
/// $`k`$ set bits therefore contributes $`\lfloor k/2 \rfloor`$ occurrences.
/// Each occurrence is identified by the position of its second bit, the
/// *terminator*. This is exactly the delimiter of a Fibonacci codeword.
///
/// Terminator positions go through the same [`Inventory`] as
/// [`DArray`](crate::bit_vectors::DArray), so lookups are constant time.
///
/// # Examples
///
/// ```
/// use grambit::bit_vectors::{BitVectorData, DoubleOneIndex};
///
/// //                                   0      1     2      3     4     5      6
/// let data = BitVectorData::from_bits([false, true, true, true, true, true, false]);
/// let idx = DoubleOneIndex::new(&data);
///
/// // The run of five ones holds two terminators, at 2 and 4.
/// assert_eq!(idx.num_terminators(), 2);
/// assert_eq!(idx.terminator(0, &data), Some(2));
/// assert_eq!(idx.terminator(1, &data), Some(4));
///
/// // `select11` is 1-indexed with `select11(0) == 0`.
/// assert_eq!(idx.select11(0, &data), Some(0));
/// assert_eq!(idx.select11(1, &data), Some(2));
/// assert_eq!(idx.select11(2, &data), Some(4));
/// assert_eq!(idx.select11(3, &data), None);
///
/// // Codewords start right after each terminator.
/// assert_eq!(idx.codeword_start(0, &data), Some(0));
/// assert_eq!(idx.codeword_start(1, &data), Some(3));
/// assert_eq!(idx.codeword_start(2, &data), Some(5));
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DoubleOneIndex {
    inventory: Inventory,
}

impl DoubleOneIndex {
    /// Creates the index over `data`.
    pub fn new(data: &BitVectorData) -> Self {
        Self {
            inventory: Inventory::from_positions(Terminators::new(data, 0)),
        }
    }

    /// Returns the position of the second bit of the `k`-th (0-indexed)
    /// terminator, or [`None`] if out of bounds.
    ///
    /// `data` must be the one used in construction.
    #[inline(always)]
    pub fn terminator(&self, k: usize, data: &BitVectorData) -> Option<usize> {
        match self.inventory.lookup(k)? {
            Hit::Exact(pos) => Some(pos),
            // Pairing restarts right after a counted terminator.
            Hit::Scan { start, residual } => Terminators::new(data, start + 1).nth(residual - 1),
        }
    }

    /// Returns the position of the second bit of the `k`-th terminator,
    /// counting from 1, with `select11(0) == 0`.
    ///
    /// Returns [`None`] if `k` exceeds the number of terminators.
    #[inline(always)]
    pub fn select11(&self, k: usize, data: &BitVectorData) -> Option<usize> {
        match k {
            0 => Some(0),
            k => self.terminator(k - 1, data),
        }
    }

    /// Returns the start of the `k`-th (0-indexed) codeword delimited by
    /// terminators: `0` for the first one, and the position after the
    /// `k`-th terminator otherwise.
    #[inline(always)]
    pub fn codeword_start(&self, k: usize, data: &BitVectorData) -> Option<usize> {
        match k {
            0 => Some(0),
            k => Some(self.select11(k, data)? + 1),
        }
    }

    /// Gets the number of terminators.
    pub const fn num_terminators(&self) -> usize {
        self.inventory.num_positions()
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.inventory.size_in_bytes()
    }
}

impl Serializable for DoubleOneIndex {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        self.inventory.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        Ok(Self {
            inventory: Inventory::deserialize_from(reader)?,
        })
    }
}

/// Iterator over terminator positions, pairing set bits from `start` on.
struct Terminators<'a> {
    ones: crate::bit_vectors::data::Ones<'a>,
    pending: Option<usize>,
}

impl<'a> Terminators<'a> {
    fn new(data: &'a BitVectorData, start: usize) -> Self {
        Self {
            ones: data.ones_from(start),
            pending: None,
        }
    }
}

impl Iterator for Terminators<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        for pos in self.ones.by_ref() {
            match self.pending {
                Some(prev) if prev + 1 == pos => {
                    self.pending = None;
                    return Some(pos);
                }
                _ => self.pending = Some(pos),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_count_floor_half() {
        for k in 0..12 {
            let mut bits = vec![false];
            bits.extend(std::iter::repeat(true).take(k));
            bits.push(false);
            let data = BitVectorData::from_bits(bits);
            let idx = DoubleOneIndex::new(&data);
            assert_eq!(idx.num_terminators(), k / 2, "run of {k}");
        }
    }

    #[test]
    fn test_isolated_ones_never_pair() {
        let data = BitVectorData::from_bits((0..500).map(|i| i % 2 == 0));
        let idx = DoubleOneIndex::new(&data);
        assert_eq!(idx.num_terminators(), 0);
        assert_eq!(idx.select11(0, &data), Some(0));
        assert_eq!(idx.select11(1, &data), None);
    }

    #[test]
    fn test_scan_restarts_after_sample() {
        // Runs of three ones: every run has one terminator at its second bit,
        // and the third bit must not pair with anything.
        let bits: Vec<bool> = (0..40_000).map(|i| i % 5 < 3).collect();
        let data = BitVectorData::from_bits(bits);
        let idx = DoubleOneIndex::new(&data);
        assert_eq!(idx.num_terminators(), 8000);
        for k in 0..8000 {
            assert_eq!(idx.terminator(k, &data), Some(k * 5 + 1));
        }
    }

    #[test]
    fn test_terminators_across_words() {
        let mut bits = vec![false; 200];
        bits[63] = true;
        bits[64] = true;
        bits[127] = true;
        bits[128] = true;
        bits[129] = true;
        let data = BitVectorData::from_bits(bits);
        let idx = DoubleOneIndex::new(&data);
        assert_eq!(idx.num_terminators(), 2);
        assert_eq!(idx.select11(1, &data), Some(64));
        assert_eq!(idx.select11(2, &data), Some(128));
        assert_eq!(idx.codeword_start(2, &data), Some(129));
        assert_eq!(idx.codeword_start(3, &data), None);
    }

    #[test]
    fn test_sparse_terminators_spill() {
        let mut bits = vec![false; 1200 * 100];
        for k in 0..1200 {
            bits[k * 100] = true;
            bits[k * 100 + 1] = true;
        }
        let data = BitVectorData::from_bits(bits);
        let idx = DoubleOneIndex::new(&data);
        assert_eq!(idx.num_terminators(), 1200);
        for k in 0..1200 {
            assert_eq!(idx.terminator(k, &data), Some(k * 100 + 1));
        }
    }
}
