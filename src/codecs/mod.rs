//! Variable-length codes for sequences of small integers.
//!
//! Both codecs store a sequence $`A = (a_0, \dots, a_{n-1})`$ as one
//! concatenated bit stream and locate codeword boundaries with a select
//! structure, so $`a_i`$ is decoded without touching its neighbours.
//!
//! | Codec | Codeword for $`a`$ | Boundary index |
//! | --- | --- | --- |
//! | [`GammaCodec`] | $`\lfloor \lg (a+2) \rfloor`$ payload bits | unary lengths in a parallel stream, over an [`SArray`](crate::bit_vectors::SArray) |
//! | [`FibonacciCodec`] | Zeckendorf form of $`a+1`$ plus a closing `1` | `11` terminators of the same stream, over a [`DoubleOneIndex`](crate::bit_vectors::DoubleOneIndex) |
//!
//! [`RankCodec`] is the sum of the two, selected by [`CodecKind`].
//!
//! ```
//! use grambit::codecs::{CodecKind, RankCodec, RankDecoder};
//!
//! let values = [0u64, 3, 1, 1, 42];
//! for kind in [CodecKind::Gamma, CodecKind::Fibonacci] {
//!     let codec = RankCodec::encode(kind, values, 1000).unwrap();
//!     assert_eq!(codec.len(), 5);
//!     assert_eq!(codec.at(4), Some(42));
//!     assert_eq!(codec.at(5), None);
//! }
//! ```
pub mod fibonacci;
pub mod gamma;

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub use fibonacci::{FibonacciCodec, FibonacciCodecBuilder, DEFAULT_FIBONACCI_MAX_VALUE};
pub use gamma::{GammaCodec, GammaCodecBuilder};

use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};

/// Random access into an encoded integer sequence.
pub trait RankDecoder {
    /// Returns the `i`-th value, or [`None`] if out of bounds.
    fn at(&self, i: usize) -> Option<u64>;

    /// Returns the number of values.
    fn len(&self) -> usize;

    /// Checks if there are no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bits used by codewords and their index.
    fn size_in_bits(&self) -> usize;
}

/// Available codecs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// Elias-gamma-like code with a unary length stream.
    #[default]
    Gamma,
    /// Fibonacci code with `11` terminators.
    Fibonacci,
}

impl CodecKind {
    const fn tag(self) -> u64 {
        match self {
            CodecKind::Gamma => 0,
            CodecKind::Fibonacci => 1,
        }
    }

    fn from_tag(tag: u64) -> Result<Self> {
        match tag {
            0 => Ok(CodecKind::Gamma),
            1 => Ok(CodecKind::Fibonacci),
            t => Err(Error::invalid_metadata(format!("unknown codec tag {t}."))),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Gamma => write!(f, "gamma"),
            CodecKind::Fibonacci => write!(f, "fibonacci"),
        }
    }
}

/// Encoded rank sequence, one of the two codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankCodec {
    /// See [`GammaCodec`].
    Gamma(GammaCodec),
    /// See [`FibonacciCodec`].
    Fibonacci(FibonacciCodec),
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct RankCodecMeta {
    kind: u64,
}

impl RankCodec {
    /// Encodes `values` with the codec `kind`.
    ///
    /// `fibonacci_max_value` bounds the values the Fibonacci codec accepts
    /// and is ignored by the gamma codec.
    ///
    /// # Errors
    ///
    /// An error is returned if a value cannot be represented by the codec.
    pub fn encode<I>(kind: CodecKind, values: I, fibonacci_max_value: u64) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        match kind {
            CodecKind::Gamma => {
                let mut builder = GammaCodecBuilder::new();
                builder.extend(values)?;
                Ok(RankCodec::Gamma(builder.build()?))
            }
            CodecKind::Fibonacci => {
                let mut builder = FibonacciCodecBuilder::new(fibonacci_max_value)?;
                builder.extend(values)?;
                Ok(RankCodec::Fibonacci(builder.build()?))
            }
        }
    }

    /// Returns which codec is in use.
    pub const fn kind(&self) -> CodecKind {
        match self {
            RankCodec::Gamma(_) => CodecKind::Gamma,
            RankCodec::Fibonacci(_) => CodecKind::Fibonacci,
        }
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            RankCodec::Gamma(c) => c.size_in_bytes(),
            RankCodec::Fibonacci(c) => c.size_in_bytes(),
        }
    }
}

impl RankDecoder for RankCodec {
    #[inline(always)]
    fn at(&self, i: usize) -> Option<u64> {
        match self {
            RankCodec::Gamma(c) => c.at(i),
            RankCodec::Fibonacci(c) => c.at(i),
        }
    }

    fn len(&self) -> usize {
        match self {
            RankCodec::Gamma(c) => c.len(),
            RankCodec::Fibonacci(c) => c.len(),
        }
    }

    fn size_in_bits(&self) -> usize {
        match self {
            RankCodec::Gamma(c) => c.size_in_bits(),
            RankCodec::Fibonacci(c) => c.size_in_bits(),
        }
    }
}

impl Serializable for RankCodec {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&RankCodecMeta {
            kind: self.kind().tag(),
        });
        match self {
            RankCodec::Gamma(c) => c.serialize_into(writer),
            RankCodec::Fibonacci(c) => c.serialize_into(writer),
        }
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: RankCodecMeta = reader.meta()?;
        match CodecKind::from_tag(meta.kind)? {
            CodecKind::Gamma => Ok(RankCodec::Gamma(GammaCodec::deserialize_from(reader)?)),
            CodecKind::Fibonacci => Ok(RankCodec::Fibonacci(FibonacciCodec::deserialize_from(
                reader,
            )?)),
        }
    }
}
