//! Internal index structure of [`DArray`](super::DArray).
#![cfg(target_pointer_width = "64")]

use anybytes::View;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::data::{BitVectorData, BitVectorIndex, IndexBuilder, NoIndex};
use crate::broadword::{self, WORD_LEN};
use crate::error::{Error, Result};
use crate::serialization::{view_of, Serializable, SnapshotReader, SnapshotWriter};

/// Number of positions in a block.
pub const BLOCK_LEN: usize = 1024;
/// Sampling rate of positions inside a short block.
pub const SUBBLOCK_LEN: usize = 64;
/// Blocks spanning at least this many bits store every position explicitly.
pub const MAX_IN_BLOCK_DISTANCE: usize = 1 << 16;

/// Two-level inventory over an increasing sequence of positions.
///
/// Positions are grouped into blocks of [`BLOCK_LEN`]. A block whose span is
/// below [`MAX_IN_BLOCK_DISTANCE`] keeps its first position plus a 16-bit
/// delta for every [`SUBBLOCK_LEN`]-th position; the others are recovered by
/// scanning the backing bits. A wider block spills all of its positions into
/// an overflow array and marks itself with `-(offset + 1)`.
///
/// The inventory only knows sampled positions. Which bits count as a position
/// is decided by its owner, so the same layout serves [`DArrayIndex`] and
/// [`DoubleOneIndex`](crate::bit_vectors::DoubleOneIndex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    block_inventory: View<[isize]>,
    subblock_inventory: View<[u16]>,
    overflow_positions: View<[usize]>,
    num_positions: usize,
}

/// Result of an inventory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// The exact position.
    Exact(usize),
    /// The position is the `residual`-th one counted after the sampled
    /// position `start`, where `start` itself is the 0-th.
    Scan {
        /// Sampled position.
        start: usize,
        /// Number of positions to skip past `start`, in `1..SUBBLOCK_LEN`.
        residual: usize,
    },
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct InventoryMeta {
    num_positions: u64,
}

#[derive(Default)]
struct InventoryBuilder {
    block_inventory: Vec<isize>,
    subblock_inventory: Vec<u16>,
    overflow_positions: Vec<usize>,
}

impl InventoryBuilder {
    fn flush_cur_block(&mut self, cur_block_positions: &mut Vec<usize>) {
        let (Some(&first), Some(&last)) = (cur_block_positions.first(), cur_block_positions.last())
        else {
            return;
        };
        if last - first < MAX_IN_BLOCK_DISTANCE {
            self.block_inventory.push(first as isize);
            for i in (0..cur_block_positions.len()).step_by(SUBBLOCK_LEN) {
                self.subblock_inventory
                    .push((cur_block_positions[i] - first) as u16);
            }
        } else {
            self.block_inventory
                .push(-((self.overflow_positions.len() + 1) as isize));
            self.overflow_positions.extend_from_slice(cur_block_positions);
            for _ in (0..cur_block_positions.len()).step_by(SUBBLOCK_LEN) {
                self.subblock_inventory.push(u16::MAX);
            }
        }
        cur_block_positions.clear();
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::from_positions(std::iter::empty())
    }
}

impl Inventory {
    /// Builds the inventory from positions in increasing order.
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut builder = InventoryBuilder::default();
        let mut num_positions = 0;
        let mut cur_block_positions = Vec::with_capacity(BLOCK_LEN);
        for pos in positions {
            cur_block_positions.push(pos);
            if cur_block_positions.len() == BLOCK_LEN {
                builder.flush_cur_block(&mut cur_block_positions);
            }
            num_positions += 1;
        }
        builder.flush_cur_block(&mut cur_block_positions);
        Self {
            block_inventory: view_of(builder.block_inventory),
            subblock_inventory: view_of(builder.subblock_inventory),
            overflow_positions: view_of(builder.overflow_positions),
            num_positions,
        }
    }

    /// Locates the `k`-th position (0-indexed), or [`None`] if `k` is out of
    /// bounds.
    #[inline(always)]
    pub fn lookup(&self, k: usize) -> Option<Hit> {
        if self.num_positions <= k {
            return None;
        }
        let block_pos = self.block_inventory[k / BLOCK_LEN];
        if block_pos < 0 {
            let overflow_pos = (-block_pos - 1) as usize;
            return Some(Hit::Exact(
                self.overflow_positions[overflow_pos + (k % BLOCK_LEN)],
            ));
        }
        let start = block_pos as usize + self.subblock_inventory[k / SUBBLOCK_LEN] as usize;
        let residual = k % SUBBLOCK_LEN;
        if residual == 0 {
            Some(Hit::Exact(start))
        } else {
            Some(Hit::Scan { start, residual })
        }
    }

    /// Gets the number of positions.
    #[inline(always)]
    pub const fn num_positions(&self) -> usize {
        self.num_positions
    }

    /// Gets the number of blocks whose positions spilled into the overflow array.
    pub fn num_long_blocks(&self) -> usize {
        self.block_inventory.iter().filter(|&&b| b < 0).count()
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<isize>() * self.block_inventory.len()
            + std::mem::size_of::<u16>() * self.subblock_inventory.len()
            + std::mem::size_of::<usize>() * self.overflow_positions.len()
            + std::mem::size_of::<usize>() * 4
    }
}

impl Serializable for Inventory {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&InventoryMeta {
            num_positions: self.num_positions as u64,
        });
        writer.put_slice(&self.block_inventory);
        writer.put_slice(&self.subblock_inventory);
        writer.put_slice(&self.overflow_positions);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: InventoryMeta = reader.meta()?;
        let inv = Self {
            block_inventory: reader.view()?,
            subblock_inventory: reader.view()?,
            overflow_positions: reader.view()?,
            num_positions: usize::try_from(meta.num_positions)
                .map_err(|_| Error::invalid_metadata("position count overflowed usize"))?,
        };
        if inv.block_inventory.len() != inv.num_positions.div_ceil(BLOCK_LEN)
            || inv.subblock_inventory.len() != inv.num_positions.div_ceil(SUBBLOCK_LEN)
        {
            return Err(Error::invalid_metadata(format!(
                "inventory of {} positions has {} blocks and {} subblocks.",
                inv.num_positions,
                inv.block_inventory.len(),
                inv.subblock_inventory.len()
            )));
        }
        for (block, &b) in inv.block_inventory.iter().enumerate() {
            if b >= 0 {
                continue;
            }
            let in_block = BLOCK_LEN.min(inv.num_positions - block * BLOCK_LEN);
            let end = b
                .checked_neg()
                .map(|offset| offset as usize - 1)
                .and_then(|offset| offset.checked_add(in_block));
            if !matches!(end, Some(end) if end <= inv.overflow_positions.len()) {
                return Err(Error::invalid_metadata(format!(
                    "long block {block} does not fit in {} overflow positions.",
                    inv.overflow_positions.len()
                )));
            }
        }
        Ok(inv)
    }
}

/// Select index over set bits, separated from the bit vector.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DArrayIndex {
    inventory: Inventory,
}

impl DArrayIndex {
    /// Creates a new [`DArrayIndex`] over the set bits of `data`.
    pub fn new(data: &BitVectorData) -> Self {
        Self {
            inventory: Inventory::from_positions(data.ones_from(0)),
        }
    }

    /// Searches the position of the `k`-th set bit (0-indexed).
    ///
    /// `data` must be the one used in construction.
    ///
    /// # Complexity
    ///
    /// Constant, plus a scan over fewer than [`SUBBLOCK_LEN`] set bits in
    /// short blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// use grambit::bit_vectors::BitVectorData;
    /// use grambit::bit_vectors::darray::inner::DArrayIndex;
    ///
    /// let data = BitVectorData::from_bits([true, false, false, true]);
    /// let da = DArrayIndex::new(&data);
    ///
    /// assert_eq!(da.select(&data, 0), Some(0));
    /// assert_eq!(da.select(&data, 1), Some(3));
    /// assert_eq!(da.select(&data, 2), None);
    /// ```
    #[inline(always)]
    pub fn select(&self, data: &BitVectorData, k: usize) -> Option<usize> {
        match self.inventory.lookup(k)? {
            Hit::Exact(pos) => Some(pos),
            Hit::Scan { start, residual } => {
                let mut reminder = residual;
                let mut word_idx = start / WORD_LEN;
                let mut word = *data.words().get(word_idx)? & (usize::MAX << (start % WORD_LEN));
                loop {
                    let popcnt = broadword::popcount(word);
                    if reminder < popcnt {
                        break;
                    }
                    reminder -= popcnt;
                    word_idx += 1;
                    word = *data.words().get(word_idx)?;
                }
                Some(WORD_LEN * word_idx + broadword::select_in_word(word, reminder)?)
            }
        }
    }

    /// Gets the number of set bits indexed.
    #[inline(always)]
    pub const fn num_ones(&self) -> usize {
        self.inventory.num_positions()
    }

    /// Returns the underlying inventory.
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.inventory.size_in_bytes()
    }
}

impl BitVectorIndex for DArrayIndex {
    fn num_ones(&self, _: &BitVectorData) -> usize {
        self.num_ones()
    }

    fn rank1(&self, data: &BitVectorData, pos: usize) -> Option<usize> {
        NoIndex.rank1(data, pos)
    }

    fn select1(&self, data: &BitVectorData, k: usize) -> Option<usize> {
        self.select(data, k)
    }
}

impl IndexBuilder for DArrayIndex {
    type Built = DArrayIndex;

    fn build(data: &BitVectorData) -> Self::Built {
        DArrayIndex::new(data)
    }
}

impl Serializable for DArrayIndex {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        self.inventory.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        Ok(Self {
            inventory: Inventory::deserialize_from(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zeros_index() {
        let data = BitVectorData::from_bits([false; 3]);
        let da = DArrayIndex::new(&data);
        assert_eq!(da.select(&data, 0), None);
    }

    #[test]
    fn test_short_block_sampling() {
        let positions: Vec<usize> = (0..3000).map(|i| i * 3 + (i % 2)).collect();
        let inv = Inventory::from_positions(positions.iter().copied());
        assert_eq!(inv.num_positions(), 3000);
        assert_eq!(inv.num_long_blocks(), 0);
        assert_eq!(inv.lookup(0), Some(Hit::Exact(0)));
        assert_eq!(inv.lookup(64), Some(Hit::Exact(positions[64])));
        assert_eq!(
            inv.lookup(65),
            Some(Hit::Scan {
                start: positions[64],
                residual: 1
            })
        );
        assert_eq!(inv.lookup(3000), None);
    }

    #[test]
    fn test_long_block_spills() {
        let positions: Vec<usize> = (0..1500).map(|i| i * 100).collect();
        let inv = Inventory::from_positions(positions.iter().copied());
        // The first block spans 102300 bits, the second only 47500.
        assert_eq!(inv.num_long_blocks(), 1);
        assert_eq!(inv.lookup(1023), Some(Hit::Exact(102300)));
        assert_eq!(inv.lookup(1024), Some(Hit::Exact(102400)));
        assert_eq!(
            inv.lookup(1025),
            Some(Hit::Scan {
                start: 102400,
                residual: 1
            })
        );
    }

    #[test]
    fn test_inventory_snapshot_roundtrip() {
        let inv = Inventory::from_positions((0..5000).map(|i| i * 37));
        let bytes = inv.to_snapshot_bytes();
        assert_eq!(Inventory::from_snapshot_bytes(&bytes).unwrap(), inv);
    }

    fn forged_inventory(num_positions: u64, blocks: &[isize], overflow: &[usize]) -> Vec<u8> {
        let mut w = SnapshotWriter::new();
        w.put_meta(&InventoryMeta { num_positions });
        w.put_slice(blocks);
        w.put_slice(&vec![u16::MAX; (num_positions as usize).div_ceil(SUBBLOCK_LEN)]);
        w.put_slice(overflow);
        w.into_bytes()
    }

    #[test]
    fn test_long_block_past_overflow_rejected() {
        let e = Inventory::from_snapshot_bytes(&forged_inventory(67, &[-1], &[]));
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("long block 0 does not fit in 0 overflow positions.".to_string())
        );

        // The offset is in range but the block runs past the end.
        let overflow: Vec<usize> = (0..70).collect();
        let e = Inventory::from_snapshot_bytes(&forged_inventory(67, &[-5], &overflow));
        assert!(matches!(e, Err(Error::InvalidMetadata(_))));

        let e = Inventory::from_snapshot_bytes(&forged_inventory(67, &[isize::MIN], &overflow));
        assert!(matches!(e, Err(Error::InvalidMetadata(_))));

        let inv = Inventory::from_snapshot_bytes(&forged_inventory(67, &[-4], &overflow)).unwrap();
        assert_eq!(inv.lookup(66), Some(Hit::Exact(69)));
    }
}
