//! N-gram count store: perfect hash, fingerprints, rank code and value table.
//!
//! A lookup walks the four layers in order:
//!
//! 1. the perfect hash maps the key to a slot $`i \in [0, n)`$,
//! 2. the fingerprint of slot $`i`$ must match the key,
//! 3. the rank code yields the rank $`r`$ stored for slot $`i`$, and
//! 4. the value table yields the $`r`$-th distinct count.
//!
//! Counts repeat heavily in n-gram data, so storing small ranks in a
//! variable-length code and the few distinct counts once is far smaller than
//! a fixed-width count per key.
#![cfg(target_pointer_width = "64")]

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anybytes::Bytes;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::codecs::{CodecKind, RankCodec, RankDecoder, DEFAULT_FIBONACCI_MAX_VALUE};
use crate::error::{Error, Result};
use crate::fingerprint::{FingerprintStore, FingerprintStoreBuilder, MAX_FINGERPRINT_BITS};
use crate::ingest::{RecordSource, GZIP_MAGIC};
use crate::int_vectors::{CompactVector, CompactVectorBuilder};
use crate::mphf::{BBHash, KeySignature, MphfConfig, PerfectHash};
use crate::serialization::{aligned_bytes, Serializable, SnapshotReader, SnapshotWriter, SNAPSHOT_ALIGN};

/// Extension of the perfect hash file.
pub const HASH_EXTENSION: &str = ".hash";
/// Extension of the fingerprint, rank and value file.
pub const VALUES_EXTENSION: &str = ".fp_values";

const SNAPSHOT_MAGIC: u64 = u64::from_le_bytes(*b"GRAMBIT\0");
const SNAPSHOT_VERSION: u64 = 1;
const KIND_HASH: u64 = 1;
const KIND_VALUES: u64 = 2;

/// Build parameters of a [`NgramStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    /// Bits per key fingerprint, in `1..=32`.
    pub fingerprint_bits: usize,
    /// Bits per slot of the temporary rank array, bounding the number of
    /// distinct counts by $`2^b`$.
    pub rank_bits: usize,
    /// Code of the rank sequence.
    pub codec: CodecKind,
    /// Bound on ranks under [`CodecKind::Fibonacci`].
    pub fibonacci_max_value: u64,
    /// Seed of the fingerprint hash.
    pub fingerprint_seed: u32,
    /// Perfect hash parameters.
    pub mphf: MphfConfig,
    /// Whether [`NgramStore::save`] compresses the value file by default.
    pub gzip: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fingerprint_bits: 12,
            rank_bits: 20,
            codec: CodecKind::Gamma,
            fibonacci_max_value: DEFAULT_FIBONACCI_MAX_VALUE,
            fingerprint_seed: 0,
            mphf: MphfConfig::default(),
            gzip: true,
        }
    }
}

impl StoreConfig {
    /// Checks the parameters.
    ///
    /// # Errors
    ///
    /// An error is returned if a width is out of range, the Fibonacci bound
    /// is zero, or the perfect hash parameters are invalid.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FINGERPRINT_BITS).contains(&self.fingerprint_bits) {
            return Err(Error::invalid_argument(format!(
                "fingerprint bits must be in 1..={MAX_FINGERPRINT_BITS}, but got {}.",
                self.fingerprint_bits
            )));
        }
        if !(1..=64).contains(&self.rank_bits) {
            return Err(Error::invalid_argument(format!(
                "rank bits must be in 1..=64, but got {}.",
                self.rank_bits
            )));
        }
        if self.codec == CodecKind::Fibonacci && self.fibonacci_max_value == 0 {
            return Err(Error::invalid_argument(
                "fibonacci max value must be positive.",
            ));
        }
        self.mphf.validate()
    }
}

/// Space used by each layer of a [`NgramStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of keys.
    pub num_keys: usize,
    /// Number of distinct counts.
    pub num_values: usize,
    /// Codec of the ranks.
    pub codec: CodecKind,
    /// Bits of the perfect hash.
    pub mphf_bits: usize,
    /// Bits of the fingerprints.
    pub fingerprint_bits: usize,
    /// Bits of the rank code and its index.
    pub rank_bits: usize,
    /// Bits of the value table.
    pub value_bits: usize,
    /// Bits of the ranks stored at the narrowest fixed width holding every
    /// rank.
    pub naive_rank_bits: usize,
}

impl StoreStats {
    /// Total number of bits.
    pub const fn total_bits(&self) -> usize {
        self.mphf_bits + self.fingerprint_bits + self.rank_bits + self.value_bits
    }

    /// Total bits per key.
    pub fn bits_per_key(&self) -> f64 {
        self.total_bits() as f64 / self.num_keys.max(1) as f64
    }

    /// Rank code size relative to the fixed-width rank array.
    pub fn rank_ratio(&self) -> f64 {
        self.rank_bits as f64 / self.naive_rank_bits.max(1) as f64
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "keys:         {}", self.num_keys)?;
        writeln!(f, "values:       {}", self.num_values)?;
        writeln!(f, "mphf:         {} bits", self.mphf_bits)?;
        writeln!(f, "fingerprints: {} bits", self.fingerprint_bits)?;
        writeln!(
            f,
            "ranks:        {} bits ({}, {:.3} of {} fixed-width bits)",
            self.rank_bits,
            self.codec,
            self.rank_ratio(),
            self.naive_rank_bits
        )?;
        writeln!(f, "value table:  {} bits", self.value_bits)?;
        write!(
            f,
            "total:        {} bits ({:.2} bits/key)",
            self.total_bits(),
            self.bits_per_key()
        )
    }
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct SnapshotHeader {
    magic: u64,
    version: u64,
    kind: u64,
}

impl SnapshotHeader {
    const fn new(kind: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            kind,
        }
    }

    fn check(reader: &mut SnapshotReader, kind: u64) -> Result<()> {
        let header: SnapshotHeader = reader.meta()?;
        if header.magic != SNAPSHOT_MAGIC {
            return Err(Error::invalid_metadata("not a grambit snapshot."));
        }
        if header.version != SNAPSHOT_VERSION {
            return Err(Error::invalid_metadata(format!(
                "unsupported snapshot version {}, expected {SNAPSHOT_VERSION}.",
                header.version
            )));
        }
        if header.kind != kind {
            return Err(Error::invalid_metadata(format!(
                "snapshot holds part {}, expected part {kind}.",
                header.kind
            )));
        }
        Ok(())
    }
}

/// Read-only map from n-gram keys to counts.
///
/// # Examples
///
/// ```
/// use grambit::{NgramStore, StoreConfig};
///
/// let mut records: Vec<(&str, u64)> = vec![("apple", 1), ("banana", 2), ("cherry", 2), ("date", 5)];
/// let config = StoreConfig {
///     fingerprint_bits: 32,
///     ..Default::default()
/// };
/// let store = NgramStore::build(&mut records, &config).unwrap();
///
/// assert_eq!(store.query(b"banana"), Some(2));
/// assert_eq!(store.query(b"date"), Some(5));
/// assert_eq!(store.query(b"nonexistent"), None);
/// assert_eq!(store.query_or_zero(b"nonexistent"), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NgramStore {
    mphf: BBHash,
    fingerprints: FingerprintStore,
    ranks: RankCodec,
    values: CompactVector,
}

fn missing_key(key: &[u8]) -> Error {
    Error::construction(format!(
        "key {:?} has no perfect hash slot; the input changed between passes.",
        String::from_utf8_lossy(key)
    ))
}

impl NgramStore {
    /// Builds a store from the records of `source`.
    ///
    /// The source is scanned three times: for the perfect hash keys, for the
    /// ranks of the counts and for the fingerprints. Keys are never held in
    /// memory; the first pass keeps a 16-byte [`KeySignature`] per key, the
    /// second a `rank_bits`-wide slot per key. Counts are expected in
    /// ascending order so that equal counts are adjacent.
    ///
    /// # Errors
    ///
    /// An error is returned if `config` is invalid, the keys are not
    /// distinct, a rank does not fit its codec or `source` fails to read.
    pub fn build<S>(source: &mut S, config: &StoreConfig) -> Result<Self>
    where
        S: RecordSource + ?Sized,
    {
        config.validate()?;

        let mut sigs: Vec<KeySignature> = vec![];
        let stats = source.scan(&mut |key, _| {
            sigs.push(KeySignature::new(key, config.mphf.seed));
            Ok(())
        })?;
        tracing::info!(
            keys = stats.records,
            skipped = stats.skipped,
            "pass 1: building perfect hash"
        );
        let mphf = BBHash::from_signatures(&sigs, &config.mphf)?;
        drop(sigs);
        let n = mphf.len();

        let mut values: Vec<u64> = vec![];
        let mut ranks = CompactVectorBuilder::zeroed(n, config.rank_bits)?;
        let mut unsorted = false;
        let stats = source.scan(&mut |key, count| {
            let slot = mphf.index(key).ok_or_else(|| missing_key(key))?;
            match values.last() {
                Some(&last) if last == count => {}
                Some(&last) => {
                    if count < last && !unsorted {
                        tracing::warn!(
                            count,
                            previous = last,
                            "counts are not in ascending order; equal counts may get several ranks"
                        );
                        unsorted = true;
                    }
                    values.push(count);
                }
                None => values.push(count),
            }
            ranks.set_int(slot, values.len() - 1)
        })?;
        if stats.records != n {
            return Err(Error::construction(format!(
                "pass 2 read {} records, but the perfect hash holds {n} keys.",
                stats.records
            )));
        }
        tracing::info!(values = values.len(), codec = %config.codec, "pass 2: encoding ranks");
        let ranks = ranks.freeze();
        let ranks = RankCodec::encode(
            config.codec,
            ranks.iter().map(|r| r as u64),
            config.fibonacci_max_value,
        )?;
        let values = CompactVector::from_slice(&values)?;

        let mut fingerprints =
            FingerprintStoreBuilder::new(n, config.fingerprint_bits, config.fingerprint_seed)?;
        source.scan(&mut |key, _| {
            let slot = mphf.index(key).ok_or_else(|| missing_key(key))?;
            fingerprints.store(slot, key)
        })?;
        tracing::info!(keys = n, "pass 3: stored fingerprints");

        let store = Self {
            mphf,
            fingerprints: fingerprints.freeze(),
            ranks,
            values,
        };
        let stats = store.stats();
        tracing::info!(
            total_bits = stats.total_bits(),
            bits_per_key = stats.bits_per_key(),
            mphf_bits = stats.mphf_bits,
            fingerprint_bits = stats.fingerprint_bits,
            rank_bits = stats.rank_bits,
            value_bits = stats.value_bits,
            rank_ratio = stats.rank_ratio(),
            "built store"
        );
        Ok(store)
    }

    /// Returns the count of `key`, or [`None`] if the key is unknown.
    ///
    /// A key outside the build set is reported as present with probability
    /// about $`2^{-w}`$ for $`w`$-bit fingerprints.
    #[inline(always)]
    pub fn query(&self, key: &[u8]) -> Option<u64> {
        let slot = self.mphf.index(key)?;
        if !self.fingerprints.check(slot, key) {
            return None;
        }
        let rank = self.ranks.at(slot)?;
        self.values
            .get_int(usize::try_from(rank).ok()?)
            .map(|v| v as u64)
    }

    /// Returns the count of `key`, or `0` if the key is unknown.
    #[inline(always)]
    pub fn query_or_zero(&self, key: &[u8]) -> u64 {
        self.query(key).unwrap_or(0)
    }

    /// Gets the number of keys.
    pub fn len(&self) -> usize {
        self.mphf.len()
    }

    /// Checks if the store has no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the codec of the ranks.
    pub const fn codec(&self) -> CodecKind {
        self.ranks.kind()
    }

    /// Reports the space used by each layer.
    ///
    /// The baseline of the rank code is a fixed-width array just wide enough
    /// for the largest rank, so a built store and its reloaded snapshot
    /// report the same figures.
    pub fn stats(&self) -> StoreStats {
        let width = crate::utils::needed_bits(self.values.len().saturating_sub(1));
        StoreStats {
            num_keys: self.len(),
            num_values: self.values.len(),
            codec: self.codec(),
            mphf_bits: 8 * self.mphf.size_in_bytes(),
            fingerprint_bits: self.fingerprints.size_in_bits(),
            rank_bits: self.ranks.size_in_bits(),
            value_bits: self.values.size_in_bits(),
            naive_rank_bits: width * self.len(),
        }
    }

    /// Returns the number of bytes used.
    pub fn size_in_bytes(&self) -> usize {
        self.mphf.size_in_bytes()
            + self.fingerprints.size_in_bytes()
            + self.ranks.size_in_bytes()
            + self.values.size_in_bytes()
    }

    /// Writes the store to `<base>.hash` and `<base>.fp_values`, compressing
    /// the latter if `gzip` is set.
    ///
    /// # Errors
    ///
    /// An error is returned if a file cannot be written.
    pub fn save(&self, base: impl AsRef<Path>, gzip: bool) -> Result<()> {
        let base = base.as_ref();
        let mut writer = SnapshotWriter::new();
        writer.put_meta(&SnapshotHeader::new(KIND_HASH));
        self.mphf.serialize_into(&mut writer);
        let hash_path = sibling(base, HASH_EXTENSION);
        std::fs::write(&hash_path, writer.into_bytes())?;

        let mut writer = SnapshotWriter::new();
        writer.put_meta(&SnapshotHeader::new(KIND_VALUES));
        self.fingerprints.serialize_into(&mut writer);
        self.ranks.serialize_into(&mut writer);
        self.values.serialize_into(&mut writer);
        let bytes = writer.into_bytes();
        let values_path = sibling(base, VALUES_EXTENSION);
        let mut file = File::create(&values_path)?;
        if gzip {
            let mut enc = GzEncoder::new(file, Compression::best());
            enc.write_all(&bytes)?;
            enc.finish()?.flush()?;
        } else {
            file.write_all(&bytes)?;
            file.flush()?;
        }
        tracing::info!(
            hash = %hash_path.display(),
            values = %values_path.display(),
            gzip,
            "saved store"
        );
        Ok(())
    }

    /// Reads a store written by [`Self::save`].
    ///
    /// Each file is read once into word-aligned memory, inflating it first if
    /// it is gzip-compressed, and the structures view into that memory.
    ///
    /// # Errors
    ///
    /// An error is returned if a file is missing, unreadable or corrupted.
    pub fn load(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let mut reader = SnapshotReader::new(read_snapshot(&sibling(base, HASH_EXTENSION))?);
        SnapshotHeader::check(&mut reader, KIND_HASH)?;
        let mphf = BBHash::deserialize_from(&mut reader)?;
        reader.finish()?;

        let mut reader = SnapshotReader::new(read_snapshot(&sibling(base, VALUES_EXTENSION))?);
        SnapshotHeader::check(&mut reader, KIND_VALUES)?;
        let fingerprints = FingerprintStore::deserialize_from(&mut reader)?;
        let ranks = RankCodec::deserialize_from(&mut reader)?;
        let values = CompactVector::deserialize_from(&mut reader)?;
        reader.finish()?;

        if fingerprints.len() != mphf.len() || ranks.len() != mphf.len() {
            return Err(Error::invalid_metadata(format!(
                "perfect hash holds {} keys, but got {} fingerprints and {} ranks.",
                mphf.len(),
                fingerprints.len(),
                ranks.len()
            )));
        }
        tracing::info!(base = %base.display(), keys = mphf.len(), "loaded store");
        Ok(Self {
            mphf,
            fingerprints,
            ranks,
            values,
        })
    }

    /// Loads the snapshot at `base` if both of its files exist, or builds the
    /// store from `source` and saves it there.
    ///
    /// # Errors
    ///
    /// An error is returned if loading, building or saving fails.
    pub fn open_or_build<S>(
        base: impl AsRef<Path>,
        source: &mut S,
        config: &StoreConfig,
    ) -> Result<Self>
    where
        S: RecordSource + ?Sized,
    {
        let base = base.as_ref();
        if sibling(base, HASH_EXTENSION).exists() && sibling(base, VALUES_EXTENSION).exists() {
            return Self::load(base);
        }
        let store = Self::build(source, config)?;
        store.save(base, config.gzip)?;
        Ok(store)
    }
}

/// Appends `ext` to the file name of `base`.
pub fn sibling(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(ext);
    PathBuf::from(name)
}

/// Reads a snapshot file into word-aligned memory, inflating it if it starts
/// with the gzip magic bytes.
fn read_snapshot(path: &Path) -> Result<Bytes> {
    let mut file = File::open(path)?;
    let len = usize::try_from(file.metadata()?.len())
        .map_err(|_| Error::invalid_metadata("snapshot file does not fit in memory"))?;
    let mut words = vec![0usize; len.div_ceil(SNAPSHOT_ALIGN)];
    file.read_exact(&mut words.as_mut_bytes()[..len])?;
    let bytes = Bytes::from_source(words).slice(..len);
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut out = vec![];
    MultiGzDecoder::new(&bytes[..]).read_to_end(&mut out)?;
    Ok(aligned_bytes(&out))
}
