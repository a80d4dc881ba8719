//! Minimal perfect hashing of byte-string keys.
//!
//! [`BBHash`] places keys level by level: every remaining key is hashed into
//! a bitmap of $`\gamma`$ times as many bins as keys, and the keys that land
//! alone in their bin are settled there. The rest move on to the next,
//! smaller level with a fresh seed. The slot of a key is the rank of its bin
//! over the concatenation of all levels, so slots are exactly $`[0, n)`$.
//!
//! # References
//!
//!  - A. Limasset, G. Rizk, R. Chikhi and P. Peterlongo, "Fast and scalable
//!    minimal perfect hashing for massive key sets," In SEA, 2017.
#![cfg(target_pointer_width = "64")]

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bit_vectors::{prelude::*, BitVector, BitVectorBuilder, BitVectorData, Rank9Index};
use crate::broadword::WORD_LEN;
use crate::error::{Error, Result};
use crate::hash::murmur64a;
use crate::serialization::{Serializable, SnapshotReader, SnapshotWriter};
use crate::utils;

/// Interface of a perfect hash function over byte strings.
pub trait PerfectHash {
    /// Returns the number of keys in the build set.
    fn len(&self) -> usize;

    /// Checks if the build set was empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the slot of `key` in $`[0, n)`$.
    ///
    /// Keys of the build set get distinct slots. Other keys get an arbitrary
    /// slot or [`None`].
    fn index(&self, key: &[u8]) -> Option<usize>;

    /// Returns the number of bytes used.
    fn size_in_bytes(&self) -> usize;
}

/// Parameters of [`BBHash`] construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MphfConfig {
    /// Bins per remaining key at every level. Larger is faster to build and
    /// query but uses more space.
    pub gamma: f64,
    /// Base seed of the level hashes.
    pub seed: u64,
    /// Bound on the number of levels before construction gives up.
    pub max_levels: usize,
}

impl Default for MphfConfig {
    fn default() -> Self {
        Self {
            gamma: 2.0,
            seed: 0,
            max_levels: 64,
        }
    }
}

impl MphfConfig {
    /// Checks the parameters.
    ///
    /// # Errors
    ///
    /// An error is returned if `gamma` is not a finite number of at least 1
    /// or `max_levels` is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma < 1.0 {
            return Err(Error::invalid_argument(format!(
                "gamma must be a finite number no less than 1, but got {}.",
                self.gamma
            )));
        }
        if self.max_levels == 0 {
            return Err(Error::invalid_argument("max_levels must be positive."));
        }
        Ok(())
    }
}

/// 128-bit signature of a key.
///
/// Construction only ever looks at signatures, so a build set can be
/// collected at 16 bytes per key and the keys themselves streamed once.
/// Two distinct keys sharing a signature are reported as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeySignature(u64, u64);

impl KeySignature {
    /// Computes the signature of `key` under `seed`.
    #[inline(always)]
    pub fn new(key: &[u8], seed: u64) -> Self {
        Self(
            murmur64a(key, seed),
            murmur64a(key, seed ^ 0xC2B2_AE3D_27D4_EB4F),
        )
    }

    /// Bin of the signature at `level` among `size` bins.
    #[inline(always)]
    fn bin(self, level: usize, size: usize) -> usize {
        let salt = (level as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let h = mix64(self.0.wrapping_add(salt) ^ self.1.rotate_left(level as u32 % 64));
        (h % size as u64) as usize
    }
}

/// SplitMix64 finalizer.
#[inline(always)]
const fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn level_size(remaining: usize, gamma: f64) -> usize {
    let bins = (remaining as f64 * gamma).ceil() as usize;
    utils::round_up(bins.max(WORD_LEN), WORD_LEN)
}

fn has_duplicates(sigs: &[KeySignature], remaining: &[usize]) -> bool {
    let mut sorted: Vec<KeySignature> = remaining.iter().map(|&i| sigs[i]).collect();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

/// Multi-level minimal perfect hash function.
///
/// # Examples
///
/// ```
/// use grambit::mphf::{BBHash, MphfConfig, PerfectHash};
///
/// let keys = ["apple", "banana", "cherry", "date"];
/// let mphf = BBHash::new(&keys, &MphfConfig::default()).unwrap();
///
/// let mut slots: Vec<usize> = keys.iter().map(|k| mphf.index(k.as_bytes()).unwrap()).collect();
/// slots.sort_unstable();
/// assert_eq!(slots, vec![0, 1, 2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BBHash {
    bits: BitVector<Rank9Index>,
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    num_keys: usize,
    seed: u64,
    gamma: f64,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct BBHashMeta {
    num_keys: u64,
    seed: u64,
    gamma: u64,
}

impl BBHash {
    /// Builds the function over distinct `keys`.
    ///
    /// # Errors
    ///
    /// An error is returned if `config` is invalid, if `keys` contains
    /// duplicates, or if some keys are still unplaced after
    /// `config.max_levels` levels.
    pub fn new<K: AsRef<[u8]>>(keys: &[K], config: &MphfConfig) -> Result<Self> {
        let sigs: Vec<KeySignature> = keys
            .iter()
            .map(|k| KeySignature::new(k.as_ref(), config.seed))
            .collect();
        Self::from_signatures(&sigs, config)
    }

    /// Builds the function over keys given by their signatures under
    /// `config.seed`.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_signatures(sigs: &[KeySignature], config: &MphfConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = BitVectorBuilder::new();
        let mut sizes = vec![];
        let mut remaining: Vec<usize> = (0..sigs.len()).collect();

        while !remaining.is_empty() {
            let level = sizes.len();
            if config.max_levels <= level {
                return Err(Error::construction(format!(
                    "{} keys left unplaced after {level} levels.",
                    remaining.len()
                )));
            }
            let size = level_size(remaining.len(), config.gamma);
            let mut occupied = BitVectorBuilder::with_len(size);
            let mut collided = BitVectorBuilder::with_len(size);
            for &i in &remaining {
                let b = sigs[i].bin(level, size);
                if occupied.get_bit(b) == Some(true) {
                    collided.set_bit(b, true)?;
                } else {
                    occupied.set_bit(b, true)?;
                }
            }

            let offset = builder.len();
            builder.extend_bits(std::iter::repeat(false).take(size));
            let mut next = Vec::with_capacity(remaining.len());
            for &i in &remaining {
                let b = sigs[i].bin(level, size);
                if collided.get_bit(b) == Some(true) {
                    next.push(i);
                } else {
                    builder.set_bit(offset + b, true)?;
                }
            }
            tracing::debug!(
                level,
                size,
                placed = remaining.len() - next.len(),
                remaining = next.len(),
                "mphf level"
            );
            if next.len() == remaining.len() && has_duplicates(sigs, &next) {
                return Err(Error::construction(
                    "duplicate key in the perfect hash build set.",
                ));
            }
            remaining = next;
            sizes.push(size);
        }

        Self::from_parts(builder.into_data(), sizes, sigs.len(), config.seed, config.gamma)
    }

    fn from_parts(
        data: BitVectorData,
        sizes: Vec<usize>,
        num_keys: usize,
        seed: u64,
        gamma: f64,
    ) -> Result<Self> {
        let offsets: Vec<usize> = sizes
            .iter()
            .scan(0, |acc, &s| {
                let off = *acc;
                *acc += s;
                Some(off)
            })
            .collect();
        let total: usize = sizes.iter().sum();
        if total != data.len() {
            return Err(Error::invalid_metadata(format!(
                "level sizes sum to {total}, but got {} bits.",
                data.len()
            )));
        }
        let bits = BitVector::new(data.clone(), Rank9Index::new(&data));
        if bits.num_ones() != num_keys {
            return Err(Error::invalid_metadata(format!(
                "expected {num_keys} settled keys, but got {}.",
                bits.num_ones()
            )));
        }
        Ok(Self {
            bits,
            sizes,
            offsets,
            num_keys,
            seed,
            gamma,
        })
    }

    /// Gets the number of levels.
    pub fn num_levels(&self) -> usize {
        self.sizes.len()
    }

    /// Gets the total number of bins over all levels.
    pub fn num_bins(&self) -> usize {
        self.bits.len()
    }

    /// Gets the `gamma` used at construction.
    pub const fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl PerfectHash for BBHash {
    fn len(&self) -> usize {
        self.num_keys
    }

    #[inline(always)]
    fn index(&self, key: &[u8]) -> Option<usize> {
        let sig = KeySignature::new(key, self.seed);
        for (level, (&size, &offset)) in self.sizes.iter().zip(&self.offsets).enumerate() {
            let pos = offset + sig.bin(level, size);
            if self.bits.access(pos)? {
                return self.bits.rank1(pos);
            }
        }
        None
    }

    fn size_in_bytes(&self) -> usize {
        self.bits.data.size_in_bytes()
            + self.bits.index.size_in_bytes()
            + std::mem::size_of::<usize>() * (2 * self.sizes.len() + 3)
    }
}

impl Serializable for BBHash {
    fn serialize_into(&self, writer: &mut SnapshotWriter) {
        writer.put_meta(&BBHashMeta {
            num_keys: self.num_keys as u64,
            seed: self.seed,
            gamma: self.gamma.to_bits(),
        });
        let sizes: Vec<u64> = self.sizes.iter().map(|&s| s as u64).collect();
        writer.put_slice(&sizes);
        self.bits.data.serialize_into(writer);
    }

    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self> {
        let meta: BBHashMeta = reader.meta()?;
        let sizes: Vec<usize> = reader
            .vec::<u64>()?
            .into_iter()
            .map(|s| s as usize)
            .collect();
        if sizes.iter().any(|&s| s == 0 || s % WORD_LEN != 0) {
            return Err(Error::invalid_metadata(
                "level sizes must be positive multiples of the word length.",
            ));
        }
        let data = BitVectorData::deserialize_from(reader)?;
        Self::from_parts(
            data,
            sizes,
            meta.num_keys as usize,
            meta.seed,
            f64::from_bits(meta.gamma),
        )
    }
}
