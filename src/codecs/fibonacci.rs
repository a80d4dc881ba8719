//! Fibonacci code with `11` terminators.
#![cfg(target_pointer_width = "64")]

use std::collections::HashMap;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::data::{BitVectorBuilder, BitVectorData};
use crate::bit_vectors::DoubleOneIndex;
use crate::broadword::WORD_LEN;
use crate::builder::Builder;
use crate::codecs::RankDecoder;
use crate::error::{Error, Result};
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};

/// Default bound on encoded values.
pub const DEFAULT_FIBONACCI_MAX_VALUE: u64 = 900_000;

/// Fibonacci numbers `1, 2, 3, 5, ...` up to `max_value`.
fn fibonacci_table(max_value: u64) -> Result<Vec<u64>> {
    if max_value == 0 {
        return Err(Error::invalid_argument(
            "max_value must be positive, but got 0.",
        ));
    }
    let mut table = vec![1];
    let (mut a, mut b) = (1u64, 2u64);
    while b <= max_value {
        table.push(b);
        match a.checked_add(b) {
            Some(c) => (a, b) = (b, c),
            None => break,
        }
    }
    // A codeword spans the table plus its terminator and must fit a word.
    if WORD_LEN - 1 < table.len() {
        return Err(Error::invalid_argument(format!(
            "max_value={max_value} needs {} Fibonacci numbers, but at most {} fit a codeword.",
            table.len(),
            WORD_LEN - 1
        )));
    }
    Ok(table)
}

/// Streaming builder for [`FibonacciCodec`].
#[derive(Debug, Clone)]
pub struct FibonacciCodecBuilder {
    codes: BitVectorBuilder,
    fib: Vec<u64>,
    max_value: u64,
    cache: HashMap<u64, (usize, usize)>,
    len: usize,
}

impl FibonacciCodecBuilder {
    /// Creates a builder accepting values below `max_value`.
    ///
    /// # Errors
    ///
    /// An error is returned if `max_value` is zero or its codewords would not
    /// fit in a machine word.
    pub fn new(max_value: u64) -> Result<Self> {
        Ok(Self {
            codes: BitVectorBuilder::new(),
            fib: fibonacci_table(max_value)?,
            max_value,
            cache: HashMap::new(),
            len: 0,
        })
    }

    /// Returns the codeword of `x >= 1` as `(bits, len)`, first bit lowest.
    fn codeword(&mut self, x: u64) -> (usize, usize) {
        if let Some(&cw) = self.cache.get(&x) {
            return cw;
        }
        let top = self.fib.partition_point(|&f| f <= x) - 1;
        let mut rest = x;
        let mut bits = 1 << (top + 1);
        for j in (0..=top).rev() {
            if self.fib[j] <= rest {
                bits |= 1 << j;
                rest -= self.fib[j];
            }
        }
        let cw = (bits, top + 2);
        self.cache.insert(x, cw);
        cw
    }
}

impl Builder for FibonacciCodecBuilder {
    type Item = u64;
    type Build = FibonacciCodec;

    /// Appends the Zeckendorf representation of `v + 1` followed by a `1`.
    fn push(&mut self, v: u64) -> Result<()> {
        let x = v.wrapping_add(1);
        if x == 0 || self.max_value < x {
            return Err(Error::invalid_argument(format!(
                "value must be less than max_value={}, but got {v}.",
                self.max_value
            )));
        }
        let (bits, len) = self.codeword(x);
        self.codes.push_bits(bits, len)?;
        self.len += 1;
        Ok(())
    }

    fn build(self) -> Result<FibonacciCodec> {
        let codes = self.codes.into_data();
        let index = DoubleOneIndex::new(&codes);
        Ok(FibonacciCodec {
            codes,
            index,
            fib: self.fib,
            max_value: self.max_value,
            len: self.len,
        })
    }
}

/// Sequence of integers in a Fibonacci code.
///
/// Value $`v`$ is written as the Zeckendorf representation of $`v + 1`$, least
/// significant term first, followed by a `1`. No representation holds two
/// adjacent ones, so the `11` pairs of the stream mark codeword ends and a
/// [`DoubleOneIndex`] locates the start of any codeword.
///
/// # Examples
///
/// ```
/// use grambit::builder::Builder;
/// use grambit::codecs::{FibonacciCodecBuilder, RankDecoder};
///
/// let mut builder = FibonacciCodecBuilder::new(100).unwrap();
/// builder.extend([0, 1, 2, 98]).unwrap();
/// let codec = builder.build().unwrap();
///
/// assert_eq!(codec.len(), 4);
/// assert_eq!(codec.at(2), Some(2));
/// assert_eq!(codec.at(3), Some(98));
/// assert_eq!(codec.at(4), None);
/// ```
///
/// # References
///
///  - A. Apostolico and A. S. Fraenkel, "Robust transmission of unbounded
///    strings using Fibonacci representations," IEEE Trans. Inf. Theory, 1987.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciCodec {
    codes: BitVectorData,
    index: DoubleOneIndex,
    fib: Vec<u64>,
    max_value: u64,
    len: usize,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct FibonacciCodecMeta {
    len: u64,
    max_value: u64,
}

impl FibonacciCodec {
    /// Returns the bound on encoded values.
    pub const fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Returns the number of codeword bits.
    pub const fn code_bits(&self) -> usize {
        self.codes.len()
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.codes.size_in_bytes()
            + self.index.size_in_bytes()
            + std::mem::size_of::<u64>() * (self.fib.len() + 1)
            + std::mem::size_of::<usize>()
    }
}

impl RankDecoder for FibonacciCodec {
    /// Sums the Fibonacci numbers selected by the `i`-th codeword.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    fn at(&self, i: usize) -> Option<u64> {
        if self.len <= i {
            return None;
        }
        let start = self.index.codeword_start(i, &self.codes)?;
        let end = self.index.codeword_start(i + 1, &self.codes)?;
        let mut payload = self.codes.get_bits(start, end - start - 1)?;
        let mut sum = 0u64;
        while payload != 0 {
            let j = payload.trailing_zeros() as usize;
            sum += self.fib.get(j)?;
            payload &= payload - 1;
        }
        sum.checked_sub(1)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn size_in_bits(&self) -> usize {
        self.codes.len() + 8 * self.index.size_in_bytes()
    }
}

impl Serializable for FibonacciCodec {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&FibonacciCodecMeta {
            len: self.len as u64,
            max_value: self.max_value,
        });
        self.codes.serialize_into(writer);
        self.index.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: FibonacciCodecMeta = reader.meta()?;
        let fib = fibonacci_table(meta.max_value).map_err(|e| Error::invalid_metadata(e.to_string()))?;
        let codes = BitVectorData::deserialize_from(reader)?;
        let index = DoubleOneIndex::deserialize_from(reader)?;
        let len = meta.len as usize;
        if index.num_terminators() != len {
            return Err(Error::invalid_metadata(format!(
                "fibonacci index holds {} terminators for {len} values.",
                index.num_terminators()
            )));
        }
        Ok(Self {
            codes,
            index,
            fib,
            max_value: meta.max_value,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(max_value: u64, vals: &[u64]) -> FibonacciCodec {
        let mut builder = FibonacciCodecBuilder::new(max_value).unwrap();
        builder.extend(vals.iter().copied()).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_table() {
        assert_eq!(fibonacci_table(1).unwrap(), vec![1]);
        assert_eq!(fibonacci_table(20).unwrap(), vec![1, 2, 3, 5, 8, 13]);
        assert!(fibonacci_table(0).is_err());
        assert!(fibonacci_table(u64::MAX).is_err());
    }

    #[test]
    fn test_codewords() {
        // 1 -> 11, 2 -> 011, 3 -> 0011, 4 -> 1011, 12 -> 101011.
        let mut builder = FibonacciCodecBuilder::new(100).unwrap();
        assert_eq!(builder.codeword(1), (0b11, 2));
        assert_eq!(builder.codeword(2), (0b110, 3));
        assert_eq!(builder.codeword(3), (0b1100, 4));
        assert_eq!(builder.codeword(4), (0b1101, 4));
        assert_eq!(builder.codeword(12), (0b110101, 6));
    }

    #[test]
    fn test_decodes_adjacent_terminators() {
        // Runs of zeros encode as runs of `11`.
        let vals = [0, 0, 0, 3, 0, 1, 0];
        let codec = encode(10, &vals);
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(codec.at(i), Some(v));
        }
    }

    #[test]
    fn test_value_bound() {
        let codec = encode(1000, &[999, 0]);
        assert_eq!(codec.at(0), Some(999));

        let mut builder = FibonacciCodecBuilder::new(1000).unwrap();
        let e = builder.push(1000);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("value must be less than max_value=1000, but got 1000.".to_string())
        );
        assert!(builder.push(u64::MAX).is_err());
    }

    #[test]
    fn test_empty() {
        let codec = encode(10, &[]);
        assert!(codec.is_empty());
        assert_eq!(codec.at(0), None);
    }

    #[test]
    fn test_many_values() {
        let vals: Vec<u64> = (0..20_000).map(|i| (i * 31) % 5000).collect();
        let codec = encode(DEFAULT_FIBONACCI_MAX_VALUE, &vals);
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(codec.at(i), Some(v));
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let codec = encode(500, &[4, 8, 15, 16, 23, 42]);
        let other = FibonacciCodec::from_snapshot_bytes(&codec.to_snapshot_bytes()).unwrap();
        assert_eq!(codec, other);
        assert_eq!(other.at(5), Some(42));
    }
}
