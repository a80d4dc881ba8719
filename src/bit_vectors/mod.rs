//! Top module for bit vectors and their rank/select indexes.
//!
//! # Introduction
//!
//! Let $`S \subseteq \{ 0,1,\dots,u-1 \}`$ be a set of positions
//! at which bits are set in a bit vector of length $`u`$.
//! The structures in this module support the following queries:
//!
//! - $`\textrm{Access}(i)`$ returns `true` if $`i \in S`$ or `false` otherwise (implemented by [`Access`]).
//! - $`\textrm{Rank}(i)`$ returns the cardinality of $`\{ x \in S \mid x < i \}`$ (implemented by [`Rank`]).
//! - $`\textrm{Select}(k)`$ returns the $`k`$-th smallest position in $`S`$ (implemented by [`Select`]).
//!
//! # Data structures
//!
//! Let $`n`$ be the number of positions (i.e., $`n = |S|`$).
//!
//! | Implementations | [Access](Access) | [Rank](Rank) | [Select](Select) | Memory (bits) |
//! | --- | :-: | :-: | :-: | :-: |
//! | [`BitVector<NoIndex>`] | $`O(1)`$  | $`O(u)`$ | $`O(u)`$ | $`u`$ |
//! | [`BitVector<Rank9Index>`] | $`O(1)`$ | $`O(1)`$ | $`O(\lg u)`$ | $`u + o(u)`$ |
//! | [`DArray`] | $`O(1)`$ | $`O(u)`$ | $`O(1)`$ | $`u + o(u)`$ |
//! | [`SArray`] | -- | -- | $`O(1)`$ | $`n \lceil \lg \frac{u}{n} \rceil + 2n + o(n)`$ |
//! | [`DoubleOneIndex`] | -- | -- | $`O(1)`$ | $`o(u)`$ on top of the bits |
//!
//! [`DArray`] answers select with a two-level inventory of sampled positions.
//! [`SArray`] is the Elias-Fano layout: low bits of each position are stored
//! verbatim and high bits go into a unary bitmap indexed by a [`DArray`].
//! [`DoubleOneIndex`] reuses the [`DArray`] inventory but only counts
//! non-overlapping occurrences of two consecutive set bits, which is what
//! terminates a Fibonacci codeword.
//!
//! # Examples
//!
//! ```
//! use grambit::bit_vectors::{prelude::*, BitVectorBuilder, Rank9Index};
//!
//! let mut builder = BitVectorBuilder::new();
//! builder.extend_bits([true, false, false, true]);
//! let bv = builder.freeze::<Rank9Index>();
//!
//! assert_eq!(bv.num_bits(), 4);
//! assert_eq!(bv.num_ones(), 2);
//! assert_eq!(bv.access(1), Some(false));
//! assert_eq!(bv.rank1(1), Some(1));
//! assert_eq!(bv.select1(1), Some(3));
//! ```
pub mod darray;
pub mod data;
pub mod double_one;
pub mod prelude;
pub mod rank9;
pub mod sarray;

pub use crate::broadword::WORD_LEN;
pub use darray::DArray;
pub use data::{BitVector, BitVectorBuilder, BitVectorData, BitVectorIndex, IndexBuilder, NoIndex};
pub use double_one::DoubleOneIndex;
pub use rank9::Rank9Index;
pub use sarray::SArray;

/// Interface for reporting basic statistics in a bit vector.
pub trait NumBits {
    /// Returns the number of bits stored.
    fn num_bits(&self) -> usize;

    /// Returns the number of bits set.
    fn num_ones(&self) -> usize;

    /// Returns the number of bits unset.
    #[inline(always)]
    fn num_zeros(&self) -> usize {
        self.num_bits() - self.num_ones()
    }
}

/// Interface for accessing elements on bit arrays.
pub trait Access {
    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    fn access(&self, pos: usize) -> Option<bool>;
}

/// Interface for rank queries on bit vectors.
pub trait Rank {
    /// Returns the cardinality of $`\{ x \in S \mid x < i \}`$,
    /// or [`None`] if $`u < i`$.
    fn rank1(&self, i: usize) -> Option<usize>;

    /// Returns the cardinality of $`\{ x \not\in S \mid 0 \leq x < i \}`$,
    /// or [`None`] if $`u < i`$.
    fn rank0(&self, i: usize) -> Option<usize>;
}

/// Interface for select queries on bit vectors.
pub trait Select {
    /// Returns the $`k`$-th smallest position in $`S`$ (0-indexed), or
    /// [`None`] if out of bounds.
    fn select1(&self, k: usize) -> Option<usize>;
}
