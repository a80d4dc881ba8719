//! Compact vector in which each integer is represented in a fixed number of bits.
#![cfg(target_pointer_width = "64")]

use num_traits::ToPrimitive;
use std::iter::ExactSizeIterator;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::data::{BitVectorBuilder, BitVectorData};
use crate::broadword;
use crate::error::{Error, Result};
use crate::int_vectors::prelude::*;
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};
use crate::utils;

/// Mutable builder for [`CompactVector`].
///
/// This structure collects integers using [`set_int`](Self::set_int) or
/// [`set_ints`](Self::set_ints) and finally [`freeze`](Self::freeze)s into an
/// immutable [`CompactVector`].
///
/// # Examples
///
/// ```
/// use grambit::int_vectors::CompactVectorBuilder;
///
/// let mut builder = CompactVectorBuilder::with_capacity(3, 3).unwrap();
/// builder.set_ints(0..3, [1, 2, 5]).unwrap();
/// let cv = builder.freeze();
/// assert_eq!(cv.get_int(1), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct CompactVectorBuilder {
    chunks: BitVectorBuilder,
    len: usize,
    width: usize,
    capacity: usize,
}

impl CompactVectorBuilder {
    /// Creates a new builder reserving space for `capa` integers.
    ///
    /// The length grows with the largest position written.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is not in `1..=64`.
    pub fn with_capacity(capa: usize, width: usize) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(Error::invalid_argument(format!(
                "width must be in 1..=64, but got {width}."
            )));
        }
        let bits = capa
            .checked_mul(width)
            .ok_or_else(|| Error::invalid_argument("capa * width overflowed"))?;
        Ok(Self {
            chunks: BitVectorBuilder::with_len(bits),
            len: 0,
            width,
            capacity: capa,
        })
    }

    /// Creates a new builder holding `len` zeros.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is not in `1..=64`.
    pub fn zeroed(len: usize, width: usize) -> Result<Self> {
        let mut builder = Self::with_capacity(len, width)?;
        builder.len = len;
        Ok(builder)
    }

    /// Sets the `pos`-th integer to `val`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pos` is out of bounds or if `val` does not fit in
    /// `self.width()` bits.
    pub fn set_int(&mut self, pos: usize, val: usize) -> Result<()> {
        if self.capacity <= pos {
            return Err(Error::invalid_argument(format!(
                "pos must be less than self.capacity()={}, but got {pos}.",
                self.capacity
            )));
        }
        if self.width != 64 && val >> self.width != 0 {
            return Err(Error::invalid_argument(format!(
                "val must fit in self.width()={} bits, but got {val}.",
                self.width
            )));
        }
        // Most significant bit first within the slot.
        let start = pos * self.width;
        for i in 0..self.width {
            let bit = (val >> (self.width - 1 - i)) & 1 == 1;
            self.chunks.set_bit(start + i, bit)?;
        }
        if self.len <= pos {
            self.len = pos + 1;
        }
        Ok(())
    }

    /// Returns the `pos`-th integer written so far, or [`None`] if out of bounds.
    pub fn get_int(&self, pos: usize) -> Option<usize> {
        if self.len <= pos {
            return None;
        }
        let start = pos * self.width;
        (0..self.width).try_fold(0, |acc, i| {
            Some((acc << 1) | self.chunks.get_bit(start + i)? as usize)
        })
    }

    /// Sets integers in `range` from the provided values.
    ///
    /// The number of integers in `vals` must match `range.len()`.
    pub fn set_ints<I>(&mut self, range: std::ops::Range<usize>, vals: I) -> Result<()>
    where
        I: IntoIterator<Item = usize>,
    {
        if range.end > self.capacity {
            return Err(Error::invalid_argument(format!(
                "range end must be no greater than self.capacity()={}, but got {}.",
                self.capacity, range.end
            )));
        }
        let mut pos = range.start;
        for x in vals.into_iter() {
            if pos >= range.end {
                return Err(Error::invalid_argument(
                    "too many values for the specified range",
                ));
            }
            self.set_int(pos, x)?;
            pos += 1;
        }
        if pos != range.end {
            return Err(Error::invalid_argument(
                "not enough values for the specified range",
            ));
        }
        Ok(())
    }

    /// Gets the number of integers.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the builder is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the number of bits to represent an integer.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Finalizes the builder into an immutable [`CompactVector`].
    pub fn freeze(self) -> CompactVector {
        let mut chunks = self.chunks;
        // Drop the unused tail of the reservation.
        chunks.truncate(self.len * self.width);
        CompactVector {
            chunks: chunks.into_data(),
            len: self.len,
            width: self.width,
        }
    }
}

/// Immutable compact vector in which each integer is represented in a fixed number of bits.
///
/// # Memory usage
///
/// $`n \lceil \lg u \rceil`$ bits for $`n`$ integers in which a value is in $`[0,u)`$.
///
/// # Examples
///
/// ```
/// use grambit::int_vectors::{CompactVector, CompactVectorBuilder};
///
/// // Can store integers within 3 bits each.
/// let mut builder = CompactVectorBuilder::with_capacity(3, 3).unwrap();
/// builder.set_ints(0..2, [7, 2]).unwrap();
/// builder.set_int(0, 5).unwrap();
/// let cv = builder.freeze();
///
/// assert_eq!(cv.len(), 2);
/// assert_eq!(cv.get_int(0), Some(5));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CompactVector {
    chunks: BitVectorData,
    len: usize,
    width: usize,
}

impl Default for CompactVector {
    fn default() -> Self {
        Self {
            chunks: BitVectorData::default(),
            len: 0,
            width: 1,
        }
    }
}

/// Metadata header of a [`CompactVector`] in a snapshot.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct CompactVectorMeta {
    /// Number of integers stored.
    pub len: u64,
    /// Bit width for each integer.
    pub width: u64,
}

impl CompactVector {
    /// Creates a new vector storing an integer in `width` bits,
    /// which stores `len` values initialized by `val`.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    ///  - `width` is not in `1..=64`, or
    ///  - `val` cannot be represent in `width` bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use grambit::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::from_int(7, 2, 3).unwrap();
    /// assert_eq!(cv.len(), 2);
    /// assert_eq!(cv.width(), 3);
    /// assert_eq!(cv.get_int(1), Some(7));
    /// ```
    pub fn from_int(val: usize, len: usize, width: usize) -> Result<Self> {
        let mut builder = CompactVectorBuilder::zeroed(len, width)?;
        if width < 64 && val >> width != 0 {
            return Err(Error::invalid_argument(format!(
                "val must fit in width={width} bits, but got {val}."
            )));
        }
        for i in 0..len {
            builder.set_int(i, val)?;
        }
        Ok(builder.freeze())
    }

    /// Creates a new vector from a slice of integers `vals`.
    ///
    /// The width of each element automatically fits to the maximum value in `vals`.
    ///
    /// # Errors
    ///
    /// An error is returned if `vals` contains an integer that cannot be cast to [`usize`].
    ///
    /// # Examples
    ///
    /// ```
    /// use grambit::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::from_slice(&[7, 2]).unwrap();
    /// assert_eq!(cv.len(), 2);
    /// assert_eq!(cv.width(), 3);
    /// assert_eq!(cv.get_int(0), Some(7));
    /// ```
    pub fn from_slice<T>(vals: &[T]) -> Result<Self>
    where
        T: ToPrimitive,
    {
        let vals = vals
            .iter()
            .map(|x| {
                x.to_usize().ok_or_else(|| {
                    Error::invalid_argument("vals must consist only of values castable into usize.")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if vals.is_empty() {
            return Ok(Self::default());
        }
        let max_int = vals.iter().copied().max().unwrap_or(0);
        let mut builder = CompactVectorBuilder::zeroed(vals.len(), utils::needed_bits(max_int))?;
        builder.set_ints(0..vals.len(), vals)?;
        Ok(builder.freeze())
    }

    /// Returns the `pos`-th integer, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    ///
    /// # Examples
    ///
    /// ```
    /// use grambit::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::from_slice(&[5, 256, 0]).unwrap();
    /// assert_eq!(cv.get_int(0), Some(5));
    /// assert_eq!(cv.get_int(1), Some(256));
    /// assert_eq!(cv.get_int(2), Some(0));
    /// assert_eq!(cv.get_int(3), None);
    /// ```
    #[inline(always)]
    pub fn get_int(&self, pos: usize) -> Option<usize> {
        if self.len <= pos {
            return None;
        }
        let bits = self.chunks.get_bits(pos * self.width, self.width)?;
        Some(broadword::reverse_low_bits(bits, self.width))
    }

    /// Creates an iterator for enumerating integers.
    pub const fn iter(&'_ self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Collects all integers into a `Vec<usize>` for inspection.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Gets the number of integers.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the number of bits to represent an integer.
    #[inline(always)]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of payload bits, `len * width`.
    pub const fn size_in_bits(&self) -> usize {
        self.len * self.width
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.chunks.size_in_bytes() + 2 * std::mem::size_of::<usize>()
    }
}

impl Serializable for CompactVector {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&CompactVectorMeta {
            len: self.len as u64,
            width: self.width as u64,
        });
        self.chunks.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: CompactVectorMeta = reader.meta()?;
        let (len, width) = (meta.len as usize, meta.width as usize);
        if !(1..=64).contains(&width) {
            return Err(Error::invalid_metadata(format!(
                "width must be in 1..=64, but got {width}."
            )));
        }
        let bits = len
            .checked_mul(width)
            .ok_or_else(|| Error::invalid_metadata("len * width overflowed"))?;
        let chunks = BitVectorData::deserialize_from(reader)?;
        if chunks.len() != bits {
            return Err(Error::invalid_metadata(format!(
                "expected {bits} bits for {len} integers of width {width}, but got {}.",
                chunks.len()
            )));
        }
        Ok(Self { chunks, len, width })
    }
}

impl Build for CompactVector {
    /// Creates a new vector from a slice of integers `vals`.
    ///
    /// This just calls [`Self::from_slice()`]. See the documentation.
    fn build_from_slice<T>(vals: &[T]) -> Result<Self>
    where
        T: ToPrimitive,
        Self: Sized,
    {
        Self::from_slice(vals)
    }
}

impl NumVals for CompactVector {
    fn num_vals(&self) -> usize {
        self.len()
    }
}

impl Access for CompactVector {
    fn access(&self, pos: usize) -> Option<usize> {
        self.get_int(pos)
    }
}

/// Iterator for enumerating integers, created by [`CompactVector::iter()`].
pub struct Iter<'a> {
    cv: &'a CompactVector,
    pos: usize,
}

impl<'a> Iter<'a> {
    /// Creates a new iterator.
    pub const fn new(cv: &'a CompactVector) -> Self {
        Self { cv, pos: 0 }
    }
}

impl Iterator for Iter<'_> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        let x = self.cv.get_int(self.pos)?;
        self.pos += 1;
        Some(x)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.cv.len() - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl std::fmt::Debug for CompactVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactVector")
            .field("ints", &self.to_vec())
            .field("len", &self.len)
            .field("width", &self.width)
            .finish()
    }
}
