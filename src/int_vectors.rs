//! Top module for integer vectors.
//!
//! Let $`A = (a_0, a_1, \dots, a_{n-1})`$ be a sequence of $`n`$ unsigned integers.
//! Integer vectors support $`\textrm{Access}(i)`$, returning $`a_i`$
//! (implemented by [`Access`]).
//!
//! [`CompactVector`] stores every integer in the same number of bits, most
//! significant bit first within its slot. Assuming $`u`$ is the maximum value
//! in $`A`$ plus 1, it takes $`n \lceil \lg u \rceil`$ bits.
//! The variable-length alternatives live in [`crate::codecs`].
//!
//! ```
//! use grambit::int_vectors::{CompactVector, prelude::*};
//!
//! let seq = CompactVector::build_from_slice(&[5, 0, 100000, 334]).unwrap();
//!
//! assert_eq!(seq.num_vals(), 4);
//! assert_eq!(seq.access(3), Some(334));
//! assert_eq!(seq.access(4), None);
//! ```
pub mod compact_vector;

pub mod prelude;

pub use compact_vector::{CompactVector, CompactVectorBuilder};

use crate::error::Result;
use num_traits::ToPrimitive;

/// Interface for building integer vectors.
pub trait Build {
    /// Creates a new vector from a slice of integers `vals`.
    ///
    /// # Errors
    ///
    /// An error is returned if `vals` contains an integer that cannot be cast to [`usize`].
    fn build_from_slice<T>(vals: &[T]) -> Result<Self>
    where
        T: ToPrimitive,
        Self: Sized;
}

/// Interface for reporting basic statistics of integer vectors.
pub trait NumVals {
    /// Returns the number of integers stored.
    fn num_vals(&self) -> usize;
}

/// Interface for accessing elements on integer vectors.
pub trait Access {
    /// Returns the `pos`-th integer, or [`None`] if out of bounds.
    fn access(&self, pos: usize) -> Option<usize>;
}
