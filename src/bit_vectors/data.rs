//! Raw storage types and generic wrapper for bit vectors.
//!
//! The [`BitVectorBuilder`] collects or overwrites bits and freezes them into a
//! [`BitVector`] backed by zero-copy [`BitVectorData`]. Bit `i` lives in word
//! `i / 64` at position `i % 64`.

use anybytes::View;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::{Access, NumBits, Rank, Select};
use crate::broadword::{self, WORD_LEN};
use crate::error::{Error, Result};
use crate::serialization::{view_of, Serializable, SnapshotReader, SnapshotWriter};

/// Builder that collects raw bits into a zero-copy [`BitVector`].
///
/// # Examples
///
/// ```
/// use grambit::bit_vectors::{BitVectorBuilder, NoIndex, Access};
///
/// let mut builder = BitVectorBuilder::with_len(4);
/// builder.set_bit(2, true).unwrap();
/// builder.push_bits(0b11, 2).unwrap();
/// let bv = builder.freeze::<NoIndex>();
///
/// assert_eq!(bv.len(), 6);
/// assert_eq!(bv.access(2), Some(true));
/// assert_eq!(bv.access(5), Some(true));
/// ```
#[derive(Debug, Default, Clone)]
pub struct BitVectorBuilder {
    words: Vec<usize>,
    len: usize,
}

impl BitVectorBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder holding `len` unset bits.
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_LEN)],
            len,
        }
    }

    /// Returns the number of bits stored.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the builder is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pushes a single bit.
    pub fn push_bit(&mut self, bit: bool) {
        let pos_in_word = self.len % WORD_LEN;
        match self.words.last_mut() {
            Some(cur) if pos_in_word != 0 => *cur |= (bit as usize) << pos_in_word,
            _ => self.words.push(bit as usize),
        }
        self.len += 1;
    }

    /// Pushes the lowest `len` bits of `bits`, least significant bit first.
    ///
    /// # Errors
    ///
    /// An error is returned if `len` exceeds the word size or if `bits` has
    /// set bits above `len`.
    pub fn push_bits(&mut self, bits: usize, len: usize) -> Result<()> {
        if WORD_LEN < len {
            return Err(Error::invalid_argument(format!(
                "len must be no greater than {WORD_LEN}, but got {len}."
            )));
        }
        if len < WORD_LEN && bits >> len != 0 {
            return Err(Error::invalid_argument(format!(
                "bits must fit in len={len} bits, but got {bits}."
            )));
        }
        if len == 0 {
            return Ok(());
        }
        let pos_in_word = self.len % WORD_LEN;
        match self.words.last_mut() {
            Some(cur) if pos_in_word != 0 => {
                *cur |= bits << pos_in_word;
                if WORD_LEN - pos_in_word < len {
                    self.words.push(bits >> (WORD_LEN - pos_in_word));
                }
            }
            _ => self.words.push(bits),
        }
        self.len += len;
        Ok(())
    }

    /// Extends the builder from an iterator of bits.
    pub fn extend_bits<I: IntoIterator<Item = bool>>(&mut self, bits: I) {
        bits.into_iter().for_each(|b| self.push_bit(b));
    }

    /// Overwrites the `pos`-th bit.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is out of bounds.
    pub fn set_bit(&mut self, pos: usize, bit: bool) -> Result<()> {
        if self.len <= pos {
            return Err(Error::invalid_argument(format!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len
            )));
        }
        let word = &mut self.words[pos / WORD_LEN];
        let mask = 1 << (pos % WORD_LEN);
        if bit {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        Ok(())
    }

    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    pub fn get_bit(&self, pos: usize) -> Option<bool> {
        if pos < self.len {
            Some((self.words[pos / WORD_LEN] >> (pos % WORD_LEN)) & 1 == 1)
        } else {
            None
        }
    }

    /// Shortens the builder to its first `len` bits. Has no effect if `len`
    /// is no less than the current length.
    pub fn truncate(&mut self, len: usize) {
        if self.len <= len {
            return;
        }
        self.words.truncate(len.div_ceil(WORD_LEN));
        let used = len % WORD_LEN;
        if let (Some(last), true) = (self.words.last_mut(), used != 0) {
            *last &= (1 << used) - 1;
        }
        self.len = len;
    }

    /// Finalizes the builder into raw [`BitVectorData`].
    pub fn into_data(self) -> BitVectorData {
        BitVectorData {
            words: view_of(self.words),
            len: self.len,
        }
    }

    /// Finalizes the builder into a [`BitVector`] indexed by `B`.
    pub fn freeze<B: IndexBuilder>(self) -> BitVector<B::Built> {
        let data = self.into_data();
        let index = B::build(&data);
        BitVector::new(data, index)
    }
}

/// Immutable bit vector data without auxiliary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVectorData {
    /// Underlying machine words storing bit data.
    pub words: View<[usize]>,
    /// Number of valid bits in `words`.
    pub len: usize,
}

impl Default for BitVectorData {
    fn default() -> Self {
        Self {
            words: view_of(Vec::new()),
            len: 0,
        }
    }
}

/// Metadata header of [`BitVectorData`] in a snapshot.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct BitVectorDataMeta {
    /// Number of valid bits.
    pub len: u64,
}

impl BitVectorData {
    /// Creates bit vector data from a bit iterator.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut builder = BitVectorBuilder::new();
        builder.extend_bits(bits);
        builder.into_data()
    }

    /// Creates bit vector data from raw words holding `len` bits.
    ///
    /// # Errors
    ///
    /// An error is returned if the number of words does not match `len`, or
    /// if bits beyond `len` are set.
    pub fn from_words(words: Vec<usize>, len: usize) -> Result<Self> {
        Self::from_view(view_of(words), len)
    }

    /// Creates bit vector data over words viewed from a frozen region,
    /// without copying them.
    ///
    /// # Errors
    ///
    /// See [`Self::from_words`].
    pub fn from_view(words: View<[usize]>, len: usize) -> Result<Self> {
        if words.len() != len.div_ceil(WORD_LEN) {
            return Err(Error::invalid_metadata(format!(
                "{len} bits need {} words, but got {}.",
                len.div_ceil(WORD_LEN),
                words.len()
            )));
        }
        if let Some(&last) = words.last() {
            let used = len % WORD_LEN;
            if used != 0 && last >> used != 0 {
                return Err(Error::invalid_metadata("bits set beyond the vector length"));
            }
        }
        Ok(Self { words, len })
    }

    /// Returns the number of bits stored.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the data is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the raw word slice.
    pub fn words(&self) -> &[usize] {
        self.words.as_ref()
    }

    /// Returns the number of words stored.
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Returns the `len` bits starting at `pos`, least significant bit first,
    /// or [`None`] if out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use grambit::bit_vectors::BitVectorData;
    ///
    /// let data = BitVectorData::from_bits([true, false, true, true, false]);
    /// assert_eq!(data.get_bits(1, 3), Some(0b110));
    /// assert_eq!(data.get_bits(2, 4), None);
    /// ```
    pub fn get_bits(&self, pos: usize, len: usize) -> Option<usize> {
        if WORD_LEN < len || self.len < pos.checked_add(len)? {
            return None;
        }
        if len == 0 {
            return Some(0);
        }
        let block = pos / WORD_LEN;
        let shift = pos % WORD_LEN;
        let mask = if len < WORD_LEN {
            (1 << len) - 1
        } else {
            usize::MAX
        };
        let bits = if shift + len <= WORD_LEN {
            (self.words[block] >> shift) & mask
        } else {
            (self.words[block] >> shift) | ((self.words[block + 1] << (WORD_LEN - shift)) & mask)
        };
        Some(bits)
    }

    /// Iterates positions of set bits at or after `pos` in increasing order.
    ///
    /// # Examples
    ///
    /// ```
    /// use grambit::bit_vectors::BitVectorData;
    ///
    /// let data = BitVectorData::from_bits([true, false, true, true, false]);
    /// assert_eq!(data.ones_from(1).collect::<Vec<_>>(), vec![2, 3]);
    /// ```
    pub fn ones_from(&self, pos: usize) -> Ones<'_> {
        let word_idx = pos / WORD_LEN;
        let cur = if word_idx < self.num_words() {
            self.words[word_idx] & (usize::MAX << (pos % WORD_LEN))
        } else {
            0
        };
        Ones {
            data: self,
            word_idx,
            cur,
        }
    }

    /// Returns the number of bytes used by the words.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<usize>() * (self.words.len() + 2)
    }
}

impl Serializable for BitVectorData {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&BitVectorDataMeta {
            len: self.len as u64,
        });
        writer.put_slice(self.words());
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: BitVectorDataMeta = reader.meta()?;
        let words = reader.view::<usize>()?;
        Self::from_view(words, meta.len as usize)
    }
}

impl Access for BitVectorData {
    fn access(&self, pos: usize) -> Option<bool> {
        if pos < self.len {
            let block = pos / WORD_LEN;
            let shift = pos % WORD_LEN;
            Some((self.words[block] >> shift) & 1 == 1)
        } else {
            None
        }
    }
}

/// Iterator over set bit positions, created by [`BitVectorData::ones_from`].
pub struct Ones<'a> {
    data: &'a BitVectorData,
    word_idx: usize,
    cur: usize,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(l) = broadword::lsb(self.cur) {
                self.cur &= self.cur - 1;
                let pos = self.word_idx * WORD_LEN + l;
                return (pos < self.data.len).then_some(pos);
            }
            self.word_idx += 1;
            if self.data.num_words() <= self.word_idx {
                return None;
            }
            self.cur = self.data.words[self.word_idx];
        }
    }
}

/// Index trait for bit vector data.
pub trait BitVectorIndex {
    /// Counts set bits in the data.
    fn num_ones(&self, data: &BitVectorData) -> usize;

    /// Rank query for ones.
    fn rank1(&self, data: &BitVectorData, pos: usize) -> Option<usize>;

    /// Rank query for zeros.
    fn rank0(&self, data: &BitVectorData, pos: usize) -> Option<usize> {
        Some(pos - self.rank1(data, pos)?)
    }

    /// Select query for ones (0-indexed).
    fn select1(&self, data: &BitVectorData, k: usize) -> Option<usize>;
}

/// Helper trait for constructing indexes from [`BitVectorData`].
pub trait IndexBuilder {
    /// Output index type constructed by this builder.
    type Built: BitVectorIndex;

    /// Builds an index from the given data.
    fn build(data: &BitVectorData) -> Self::Built;
}

/// Placeholder index that performs linear scans over the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoIndex;

impl BitVectorIndex for NoIndex {
    fn num_ones(&self, data: &BitVectorData) -> usize {
        data.words.iter().map(|&w| broadword::popcount(w)).sum()
    }

    fn rank1(&self, data: &BitVectorData, pos: usize) -> Option<usize> {
        if data.len() < pos {
            return None;
        }
        let mut r = 0;
        let (wpos, left) = (pos / WORD_LEN, pos % WORD_LEN);
        for &w in &data.words[..wpos] {
            r += broadword::popcount(w);
        }
        if left != 0 {
            r += broadword::popcount(data.words[wpos] << (WORD_LEN - left));
        }
        Some(r)
    }

    fn select1(&self, data: &BitVectorData, k: usize) -> Option<usize> {
        let mut cur_rank = 0;
        for (wpos, &w) in data.words.iter().enumerate() {
            let cnt = broadword::popcount(w);
            if k < cur_rank + cnt {
                return Some(wpos * WORD_LEN + broadword::select_in_word(w, k - cur_rank)?);
            }
            cur_rank += cnt;
        }
        None
    }
}

impl IndexBuilder for NoIndex {
    type Built = NoIndex;

    fn build(_: &BitVectorData) -> Self::Built {
        NoIndex
    }
}

/// Immutable bit vector data combined with an auxiliary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector<I> {
    /// Raw data bits.
    pub data: BitVectorData,
    /// Associated index.
    pub index: I,
}

impl<I> BitVector<I> {
    /// Creates a new wrapper from data and index.
    pub const fn new(data: BitVectorData, index: I) -> Self {
        Self { data, index }
    }

    /// Returns the number of bits stored.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the vector is empty.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the `len` bits starting at `pos`, or [`None`] if out of bounds.
    pub fn get_bits(&self, pos: usize, len: usize) -> Option<usize> {
        self.data.get_bits(pos, len)
    }
}

impl<I: BitVectorIndex> NumBits for BitVector<I> {
    fn num_bits(&self) -> usize {
        self.data.len()
    }

    fn num_ones(&self) -> usize {
        self.index.num_ones(&self.data)
    }
}

impl<I> Access for BitVector<I> {
    fn access(&self, pos: usize) -> Option<bool> {
        self.data.access(pos)
    }
}

impl<I: BitVectorIndex> Rank for BitVector<I> {
    fn rank1(&self, pos: usize) -> Option<usize> {
        self.index.rank1(&self.data, pos)
    }

    fn rank0(&self, pos: usize) -> Option<usize> {
        self.index.rank0(&self.data, pos)
    }
}

impl<I: BitVectorIndex> Select for BitVector<I> {
    fn select1(&self, k: usize) -> Option<usize> {
        self.index.select1(&self.data, k)
    }
}
