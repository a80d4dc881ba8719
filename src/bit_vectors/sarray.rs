//! Compressed monotone sequence with the Elias-Fano split of high and low bits.
#![cfg(target_pointer_width = "64")]

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::darray::DArray;
use crate::bit_vectors::data::{BitVectorBuilder, BitVectorData};
use crate::bit_vectors::NumBits;
use crate::error::{Error, Result};
use crate::int_vectors::{CompactVector, CompactVectorBuilder};
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};

/// Select structure over a sparse bit vector of length $`u`$ with $`n`$ set
/// bits, using $`\lfloor \lg (u/n) \rfloor`$ low bits per position.
///
/// The low bits of every set position are stored verbatim in a
/// [`CompactVector`]; the high parts are written in unary into a second bit
/// vector of $`n + \lfloor u / 2^{\ell} \rfloor`$ bits, over which a [`DArray`]
/// answers select.
///
/// # Examples
///
/// ```
/// use grambit::bit_vectors::{BitVectorData, SArray};
///
/// let data = BitVectorData::from_bits([true, false, false, true, false, false, false, true]);
/// let sa = SArray::from_data(&data).unwrap();
///
/// assert_eq!(sa.num_ones(), 3);
/// assert_eq!(sa.select(0), Some(0));
/// assert_eq!(sa.select(1), Some(3));
/// assert_eq!(sa.select(2), Some(7));
/// assert_eq!(sa.select(3), None);
/// ```
///
/// # References
///
///  - P. Elias, "Efficient storage and retrieval by content and address of static files,"
///    Journal of the ACM, 1974.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SArray {
    high: DArray,
    low: Option<CompactVector>,
    low_bits: usize,
    universe: usize,
    num_ones: usize,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct SArrayMeta {
    universe: u64,
    num_ones: u64,
    low_bits: u64,
    has_low: u64,
}

impl SArray {
    /// Builds the structure over the set bits of `data`.
    ///
    /// # Errors
    ///
    /// An error is returned if `data` has no set bits or only set bits.
    pub fn from_data(data: &BitVectorData) -> Result<Self> {
        let num_ones = data.ones_from(0).count();
        Self::from_positions(data.ones_from(0), num_ones, data.len())
    }

    /// Builds the structure from `num_ones` strictly increasing positions
    /// below `universe`.
    ///
    /// # Errors
    ///
    /// An error is returned if `num_ones` is zero or not less than `universe`,
    /// or if the positions are not strictly increasing below `universe`.
    pub fn from_positions<I>(positions: I, num_ones: usize, universe: usize) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        if num_ones == 0 {
            return Err(Error::invalid_argument(
                "bit vector must have at least one set bit.",
            ));
        }
        if universe <= num_ones {
            return Err(Error::invalid_argument(format!(
                "bit vector must not be all ones, but got {num_ones} ones in {universe} bits."
            )));
        }
        let low_bits = (universe / num_ones).ilog2() as usize;
        let low_mask = (1usize << low_bits) - 1;

        let mut high = BitVectorBuilder::with_len(num_ones + (universe >> low_bits));
        let mut low = match low_bits {
            0 => None,
            w => Some(CompactVectorBuilder::zeroed(num_ones, w)?),
        };
        let mut count = 0;
        let mut prev = None;
        for p in positions {
            if universe <= p || prev.is_some_and(|q| p <= q) || num_ones <= count {
                return Err(Error::invalid_argument(format!(
                    "positions must be strictly increasing below {universe}, but got {p} at {count}."
                )));
            }
            high.set_bit((p >> low_bits) + count, true)?;
            if let Some(low) = low.as_mut() {
                low.set_int(count, p & low_mask)?;
            }
            prev = Some(p);
            count += 1;
        }
        if count != num_ones {
            return Err(Error::invalid_argument(format!(
                "expected {num_ones} positions, but got {count}."
            )));
        }

        Ok(Self {
            high: DArray::from_builder(high),
            low: low.map(CompactVectorBuilder::freeze),
            low_bits,
            universe,
            num_ones,
        })
    }

    /// Returns the position of the `idx`-th set bit (0-indexed), or [`None`]
    /// if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    pub fn select(&self, idx: usize) -> Option<usize> {
        if self.num_ones <= idx {
            return None;
        }
        let high = self.high.select(idx + 1)? - idx;
        let low = match &self.low {
            Some(low) => low.get_int(idx)?,
            None => 0,
        };
        Some((high << self.low_bits) | low)
    }

    /// Gets the number of set bits.
    pub const fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Gets the length of the underlying bit vector.
    pub const fn universe(&self) -> usize {
        self.universe
    }

    /// Gets the number of low bits stored per position.
    pub const fn low_bits(&self) -> usize {
        self.low_bits
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.high.size_in_bytes()
            + self.low.as_ref().map_or(0, CompactVector::size_in_bytes)
            + 3 * std::mem::size_of::<usize>()
    }
}

impl Serializable for SArray {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&SArrayMeta {
            universe: self.universe as u64,
            num_ones: self.num_ones as u64,
            low_bits: self.low_bits as u64,
            has_low: self.low.is_some() as u64,
        });
        self.high.serialize_into(writer);
        if let Some(low) = &self.low {
            low.serialize_into(writer);
        }
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: SArrayMeta = reader.meta()?;
        let high = DArray::deserialize_from(reader)?;
        let low = match meta.has_low {
            0 => None,
            _ => Some(CompactVector::deserialize_from(reader)?),
        };
        let (num_ones, low_bits) = (meta.num_ones as usize, meta.low_bits as usize);
        if high.num_ones() != num_ones
            || low.as_ref().map_or(0, CompactVector::width) != low_bits
            || low.as_ref().is_some_and(|l| l.len() != num_ones)
        {
            return Err(Error::invalid_metadata(format!(
                "inconsistent sarray: {num_ones} ones with {low_bits} low bits."
            )));
        }
        Ok(Self {
            high,
            low,
            low_bits,
            universe: meta.universe as usize,
            num_ones,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_all_ones() {
        let data = BitVectorData::from_bits([true; 5]);
        let e = SArray::from_data(&data);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bit vector must not be all ones, but got 5 ones in 5 bits.".to_string())
        );
    }

    #[test]
    fn test_rejects_all_zeros() {
        let data = BitVectorData::from_bits([false; 5]);
        assert!(matches!(
            SArray::from_data(&data),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_unsorted_positions() {
        let e = SArray::from_positions([3, 3], 2, 10);
        assert!(matches!(e, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_dense_without_low_bits() {
        // u/n < 2 leaves no low bits.
        let bits: Vec<bool> = (0..100).map(|i| i % 4 != 0).collect();
        let sa = SArray::from_data(&BitVectorData::from_bits(bits.iter().copied())).unwrap();
        assert_eq!(sa.low_bits(), 0);
        let expected: Vec<usize> = (0..100).filter(|i| i % 4 != 0).collect();
        for (k, &p) in expected.iter().enumerate() {
            assert_eq!(sa.select(k), Some(p));
        }
    }

    #[test]
    fn test_sparse_positions() {
        let positions: Vec<usize> = (0..2000).map(|i| i * i + 3 * i).collect();
        let universe = positions[positions.len() - 1] + 17;
        let sa = SArray::from_positions(positions.iter().copied(), positions.len(), universe)
            .unwrap();
        assert!(sa.low_bits() > 0);
        for (k, &p) in positions.iter().enumerate() {
            assert_eq!(sa.select(k), Some(p));
        }
        assert_eq!(sa.select(positions.len()), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let positions: Vec<usize> = (0..500).map(|i| i * 13 + 1).collect();
        let sa = SArray::from_positions(positions.iter().copied(), 500, 500 * 13 + 5).unwrap();
        let other = SArray::from_snapshot_bytes(&sa.to_snapshot_bytes()).unwrap();
        assert_eq!(sa, other);
    }
}
