//! Elias-gamma-like code with a separate length stream.
#![cfg(target_pointer_width = "64")]

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::data::{BitVectorBuilder, BitVectorData};
use crate::bit_vectors::SArray;
use crate::broadword::{self, WORD_LEN};
use crate::builder::{Build, Builder};
use crate::codecs::RankDecoder;
use crate::error::{Error, Result};
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};
use crate::utils;

/// Largest value accepted by [`GammaCodec`].
pub const MAX_GAMMA_VALUE: u64 = u64::MAX - 2;

/// Streaming builder for [`GammaCodec`].
#[derive(Debug, Default, Clone)]
pub struct GammaCodecBuilder {
    codes: BitVectorBuilder,
    index: BitVectorBuilder,
    len: usize,
}

impl GammaCodecBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Builder for GammaCodecBuilder {
    type Item = u64;
    type Build = GammaCodec;

    /// Appends `v` as $`\ell = \lfloor \lg (v+2) \rfloor`$ payload bits
    /// holding $`v + 2 - 2^{\ell}`$ most significant bit first, and marks the
    /// length in the index stream as a one followed by $`\ell - 1`$ zeros.
    fn push(&mut self, v: u64) -> Result<()> {
        if MAX_GAMMA_VALUE < v {
            return Err(Error::invalid_argument(format!(
                "value must be no greater than {MAX_GAMMA_VALUE}, but got {v}."
            )));
        }
        let shifted = v + 2;
        let code_len = shifted.ilog2() as usize;
        let code = (shifted - (1 << code_len)) as usize;
        self.codes
            .push_bits(broadword::reverse_low_bits(code, code_len), code_len)?;
        self.index.push_bits(1, code_len)?;
        self.len += 1;
        Ok(())
    }

    fn build(self) -> Result<GammaCodec> {
        let codes = self.codes.into_data();
        let index = match self.len {
            0 => None,
            _ => {
                // Padding keeps a zero after the last marker, so the stream is
                // never all ones.
                let mut index = self.index;
                let padded = utils::round_up(codes.len() + 1, WORD_LEN);
                index.extend_bits(std::iter::repeat(false).take(padded - codes.len()));
                Some(SArray::from_data(&index.into_data())?)
            }
        };
        Ok(GammaCodec {
            codes,
            index,
            len: self.len,
        })
    }
}

/// Sequence of integers in an Elias-gamma-like code.
///
/// Value $`v`$ costs $`\lfloor \lg (v+2) \rfloor`$ payload bits plus the same
/// number of bits in a parallel stream of unary lengths. The start of every
/// codeword is a select over the length stream, answered by an [`SArray`].
///
/// # Examples
///
/// ```
/// use grambit::builder::Build;
/// use grambit::codecs::{GammaCodec, RankDecoder};
///
/// let codec = GammaCodec::from_iter([0, 1, 2, 1000]).unwrap();
///
/// assert_eq!(codec.len(), 4);
/// assert_eq!(codec.at(0), Some(0));
/// assert_eq!(codec.at(3), Some(1000));
/// assert_eq!(codec.at(4), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaCodec {
    codes: BitVectorData,
    index: Option<SArray>,
    len: usize,
}

impl Default for GammaCodec {
    fn default() -> Self {
        Self {
            codes: BitVectorData::default(),
            index: None,
            len: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct GammaCodecMeta {
    len: u64,
}

impl Build for GammaCodec {
    type Builder = GammaCodecBuilder;

    fn builder() -> Self::Builder {
        GammaCodecBuilder::new()
    }
}

impl GammaCodec {
    /// Returns the number of payload bits.
    pub const fn code_bits(&self) -> usize {
        self.codes.len()
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.codes.size_in_bytes()
            + self.index.as_ref().map_or(0, SArray::size_in_bytes)
            + std::mem::size_of::<usize>()
    }
}

impl RankDecoder for GammaCodec {
    /// Decodes the `i`-th value from the payload span between the `i`-th and
    /// `i+1`-th length markers.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    fn at(&self, i: usize) -> Option<u64> {
        if self.len <= i {
            return None;
        }
        let index = self.index.as_ref()?;
        let start = index.select(i)?;
        let end = if i + 1 == self.len {
            self.codes.len()
        } else {
            index.select(i + 1)?
        };
        let width = end - start;
        let code = broadword::reverse_low_bits(self.codes.get_bits(start, width)?, width) as u64;
        Some(code + (1 << width) - 2)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn size_in_bits(&self) -> usize {
        self.codes.len() + 8 * self.index.as_ref().map_or(0, SArray::size_in_bytes)
    }
}

impl Serializable for GammaCodec {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&GammaCodecMeta {
            len: self.len as u64,
        });
        self.codes.serialize_into(writer);
        if let Some(index) = &self.index {
            index.serialize_into(writer);
        }
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: GammaCodecMeta = reader.meta()?;
        let len = meta.len as usize;
        let codes = BitVectorData::deserialize_from(reader)?;
        let index = match len {
            0 => None,
            _ => Some(SArray::deserialize_from(reader)?),
        };
        if let Some(index) = &index {
            if index.num_ones() != len || index.universe() <= codes.len() {
                return Err(Error::invalid_metadata(format!(
                    "gamma index holds {} markers over {} bits for {len} values and {} code bits.",
                    index.num_ones(),
                    index.universe(),
                    codes.len()
                )));
            }
        }
        Ok(Self { codes, index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lengths() {
        // 0, 1 -> 1 bit; 2..=5 -> 2 bits; 6..=13 -> 3 bits.
        let codec = GammaCodec::from_iter([0, 1, 2, 5, 6, 13]).unwrap();
        assert_eq!(codec.code_bits(), 1 + 1 + 2 + 2 + 3 + 3);
        for (i, v) in [0, 1, 2, 5, 6, 13].into_iter().enumerate() {
            assert_eq!(codec.at(i), Some(v));
        }
    }

    #[test]
    fn test_payload_is_msb_first() {
        // 4 + 2 = 0b110 -> length 2, payload 0b10.
        let codec = GammaCodec::from_iter([4]).unwrap();
        assert_eq!(codec.codes.get_bits(0, 2), Some(0b01));
    }

    #[test]
    fn test_empty() {
        let codec = GammaCodec::from_iter([]).unwrap();
        assert!(codec.is_empty());
        assert_eq!(codec.at(0), None);
    }

    #[test]
    fn test_all_zeros_fill_whole_words() {
        // Every marker is a lone one, so the index stream would be all ones
        // without padding.
        let codec = GammaCodec::from_iter(std::iter::repeat(0).take(512)).unwrap();
        for i in 0..512 {
            assert_eq!(codec.at(i), Some(0));
        }
    }

    #[test]
    fn test_large_values() {
        let values = [MAX_GAMMA_VALUE, 0, 1 << 40, u32::MAX as u64];
        let codec = GammaCodec::from_iter(values).unwrap();
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(codec.at(i), Some(v));
        }
    }

    #[test]
    fn test_rejects_overflowing_value() {
        let e = GammaCodec::from_iter([u64::MAX]);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some(format!(
                "value must be no greater than {MAX_GAMMA_VALUE}, but got {}.",
                u64::MAX
            ))
        );
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let codec = GammaCodec::from_iter((0..1000).map(|i| i % 17)).unwrap();
        let other = GammaCodec::from_snapshot_bytes(&codec.to_snapshot_bytes()).unwrap();
        assert_eq!(codec, other);
    }
}
