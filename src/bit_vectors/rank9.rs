//! Rank directory with Vigna's Rank9 layout.
#![cfg(target_pointer_width = "64")]

use crate::bit_vectors::data::{BitVectorData, BitVectorIndex, IndexBuilder};
use crate::broadword::{self, WORD_LEN};

const BLOCK_LEN: usize = 8;

/// Constant-time rank index over a [`BitVectorData`].
///
/// Every block of eight words keeps an absolute rank and seven 9-bit relative
/// ranks packed in a second word. Select is answered by a binary search over
/// the blocks followed by a scan of at most eight words.
///
/// # Examples
///
/// ```
/// use grambit::bit_vectors::{BitVectorData, BitVectorIndex, Rank9Index};
///
/// let data = BitVectorData::from_bits([true, false, false, true]);
/// let idx = Rank9Index::new(&data);
///
/// assert_eq!(idx.rank1(&data, 1), Some(1));
/// assert_eq!(idx.rank1(&data, 4), Some(2));
/// assert_eq!(idx.rank1(&data, 5), None);
/// assert_eq!(idx.select1(&data, 1), Some(3));
/// ```
///
/// # References
///
///  - S. Vigna, "Broadword implementation of rank/select queries," In WEA, 2008.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank9Index {
    block_rank_pairs: Vec<usize>,
}

impl Rank9Index {
    /// Creates a new index from the given bit vector data.
    pub fn new(data: &BitVectorData) -> Self {
        let mut next_rank = 0;
        let mut cur_subrank = 0;
        let mut subranks = 0;

        let mut block_rank_pairs = vec![next_rank];

        for (i, &word) in data.words().iter().enumerate() {
            let word_pop = broadword::popcount(word);

            let shift = i % BLOCK_LEN;
            if shift != 0 {
                subranks <<= 9;
                subranks |= cur_subrank;
            }

            next_rank += word_pop;
            cur_subrank += word_pop;

            if shift == BLOCK_LEN - 1 {
                block_rank_pairs.push(subranks);
                block_rank_pairs.push(next_rank);
                subranks = 0;
                cur_subrank = 0;
            }
        }

        let left = BLOCK_LEN - (data.num_words() % BLOCK_LEN);
        for _ in 0..left {
            subranks <<= 9;
            subranks |= cur_subrank;
        }
        block_rank_pairs.push(subranks);

        if data.num_words() % BLOCK_LEN != 0 {
            block_rank_pairs.push(next_rank);
            block_rank_pairs.push(0);
        }
        block_rank_pairs.shrink_to_fit();

        Self { block_rank_pairs }
    }

    /// Gets the number of bits set.
    #[inline(always)]
    pub fn num_ones(&self) -> usize {
        self.block_rank_pairs[self.block_rank_pairs.len() - 2]
    }

    #[inline(always)]
    fn num_blocks(&self) -> usize {
        self.block_rank_pairs.len() / 2 - 1
    }

    #[inline(always)]
    fn block_rank(&self, block: usize) -> usize {
        self.block_rank_pairs[block * 2]
    }

    #[inline(always)]
    fn sub_block_rank(&self, sub_bpos: usize) -> usize {
        let (block, left) = (sub_bpos / BLOCK_LEN, sub_bpos % BLOCK_LEN);
        self.block_rank(block) + ((self.sub_block_ranks(block) >> ((7 - left) * 9)) & 0x1FF)
    }

    #[inline(always)]
    fn sub_block_ranks(&self, block: usize) -> usize {
        self.block_rank_pairs[block * 2 + 1]
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<usize>() * (self.block_rank_pairs.len() + 1)
    }
}

impl BitVectorIndex for Rank9Index {
    fn num_ones(&self, _: &BitVectorData) -> usize {
        self.num_ones()
    }

    fn rank1(&self, data: &BitVectorData, pos: usize) -> Option<usize> {
        if data.len() < pos {
            return None;
        }
        if pos == data.len() {
            return Some(self.num_ones());
        }
        let (sub_bpos, sub_left) = (pos / WORD_LEN, pos % WORD_LEN);
        let mut r = self.sub_block_rank(sub_bpos);
        if sub_left != 0 {
            r += broadword::popcount(data.words()[sub_bpos] << (WORD_LEN - sub_left));
        }
        Some(r)
    }

    fn select1(&self, data: &BitVectorData, k: usize) -> Option<usize> {
        if self.num_ones() <= k {
            return None;
        }
        // Last block whose starting rank is at most `k`.
        let (mut lo, mut hi) = (0, self.num_blocks());
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.block_rank(mid) <= k {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let mut cur_rank = self.block_rank(lo);
        for (i, &word) in data.words().iter().enumerate().skip(lo * BLOCK_LEN) {
            let cnt = broadword::popcount(word);
            if k < cur_rank + cnt {
                return Some(i * WORD_LEN + broadword::select_in_word(word, k - cur_rank)?);
            }
            cur_rank += cnt;
        }
        None
    }
}

impl IndexBuilder for Rank9Index {
    type Built = Rank9Index;

    fn build(data: &BitVectorData) -> Self::Built {
        Rank9Index::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_vectors::data::NoIndex;

    #[test]
    fn test_matches_linear_scan() {
        let data = BitVectorData::from_bits((0..5000).map(|i| (i * 7919) % 13 < 4));
        let idx = Rank9Index::new(&data);
        for pos in (0..=5000).step_by(37) {
            assert_eq!(idx.rank1(&data, pos), NoIndex.rank1(&data, pos));
        }
        for k in 0..idx.num_ones() {
            assert_eq!(idx.select1(&data, k), NoIndex.select1(&data, k));
        }
        assert_eq!(idx.select1(&data, idx.num_ones()), None);
    }

    #[test]
    fn test_empty() {
        let data = BitVectorData::default();
        let idx = Rank9Index::new(&data);
        assert_eq!(idx.num_ones(), 0);
        assert_eq!(idx.rank1(&data, 0), Some(0));
        assert_eq!(idx.select1(&data, 0), None);
    }
}
