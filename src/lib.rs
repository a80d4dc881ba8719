//! # Succinct n-gram count store
//!
//! Grambit maps n-gram strings to their counts in close to the
//! information-theoretic minimum space while answering point lookups in
//! constant time.
//!
//! A store is the composition of four layers:
//!
//! - a minimal perfect hash function ([`mphf::BBHash`]) assigning each key a
//!   dense slot in $`[0, n)`$,
//! - a fingerprint array ([`fingerprint::FingerprintStore`]) rejecting keys
//!   that were never inserted with probability $`1 - 2^{-w}`$,
//! - a variable-length rank code ([`codecs::RankCodec`]) holding, for every
//!   slot, the rank of its count among the distinct counts, and
//! - a value table ([`int_vectors::CompactVector`]) of the distinct counts.
//!
//! The codecs sit on top of the rank/select layer in [`bit_vectors`]:
//! [`bit_vectors::DArray`], [`bit_vectors::SArray`] and
//! [`bit_vectors::DoubleOneIndex`].
//!
//! ## Design policy
//!
//! - **Build once, read forever:** every structure is assembled through a
//!   mutable builder and then frozen. Frozen structures are immutable and can
//!   be shared across threads freely.
//! - **Fail loudly at build time:** a value that does not fit its slot, a
//!   degenerate bit vector or an invalid configuration is reported as an
//!   [`Error`] instead of being truncated.
//! - **Misses are not errors:** queries return [`Option`].
//!
//! Throughout this document, we write $`\log_2`$ with $`\lg`$.
//!
//! ## Limitation
//!
//! This library is designed to run on 64-bit machines.
#![deny(missing_docs)]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("`target_pointer_width` must be 64");

pub mod bit_vectors;
pub mod broadword;
pub mod builder;
pub mod codecs;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod ingest;
pub mod int_vectors;
pub mod mphf;
pub mod serialization;
pub mod store;
pub mod utils;

pub use bit_vectors::data::{BitVector, BitVectorBuilder, BitVectorData, BitVectorIndex, NoIndex};
pub use codecs::{CodecKind, RankCodec};
pub use error::{Error, Result};
pub use store::{NgramStore, StoreConfig};
