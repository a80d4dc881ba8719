//! Zero-copy snapshot serialization utilities.
//!
//! Structures write themselves into a flat byte buffer through a
//! [`SnapshotWriter`]: fixed-size headers are `#[repr(C)]` metadata structs
//! copied verbatim with `zerocopy`, and variable-size payloads are
//! length-prefixed slices of plain integers padded to a word boundary.
//!
//! [`SnapshotReader`] walks a frozen [`Bytes`] region and hands out payloads as
//! [`View`]s into it, so a loaded structure shares the buffer it was read from.
//! Every length is checked against the remaining bytes before it is trusted.

use anybytes::{Bytes, View};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Alignment of every payload inside a snapshot.
pub const SNAPSHOT_ALIGN: usize = std::mem::size_of::<u64>();

/// Marker trait for metadata structures that can be safely written to and
/// read from bytes.
///
/// It is automatically implemented for any type that implements the necessary
/// `zerocopy` traits.
pub trait Metadata: FromBytes + IntoBytes + KnownLayout + Immutable {}

impl<T> Metadata for T where T: FromBytes + IntoBytes + KnownLayout + Immutable {}

/// Types that can be written into and rebuilt from a snapshot buffer.
pub trait Serializable: Sized {
    /// Appends the serialized form of `self` to `writer`.
    fn serialize_into(&self, writer: &mut SnapshotWriter);

    /// Rebuilds an instance from the next bytes of `reader`.
    fn deserialize_from(reader: &mut SnapshotReader) -> Result<Self>;

    /// Serializes `self` into a fresh buffer.
    fn to_snapshot_bytes(&self) -> Vec<u8> {
        let mut writer = SnapshotWriter::new();
        self.serialize_into(&mut writer);
        writer.into_bytes()
    }

    /// Rebuilds an instance viewing into `bytes` without copying payloads.
    ///
    /// # Errors
    ///
    /// An error is returned if the buffer is truncated, misaligned,
    /// inconsistent or has trailing bytes.
    fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut reader = SnapshotReader::new(bytes);
        let value = Self::deserialize_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    /// Rebuilds an instance from a buffer produced by [`Self::to_snapshot_bytes`].
    ///
    /// The buffer is copied once into word-aligned storage.
    ///
    /// # Errors
    ///
    /// See [`Self::from_bytes`].
    fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(aligned_bytes(bytes))
    }
}

/// Copies `buf` into word-aligned storage.
pub fn aligned_bytes(buf: &[u8]) -> Bytes {
    let mut words = vec![0usize; buf.len().div_ceil(SNAPSHOT_ALIGN)];
    words.as_mut_bytes()[..buf.len()].copy_from_slice(buf);
    Bytes::from_source(words).slice(..buf.len())
}

/// Wraps owned integers into a zero-copy view.
pub(crate) fn view_of<T>(vals: Vec<T>) -> View<[T]>
where
    T: FromBytes + IntoBytes + Immutable + Sync + Send + 'static,
{
    // A `Vec<T>` source is always aligned and sized for `[T]`.
    Bytes::from_source(vals)
        .view::<[T]>()
        .expect("owned integers always form a valid view")
}

/// Append-only snapshot buffer.
#[derive(Debug, Default, Clone)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a metadata header.
    pub fn put_meta<M: Metadata>(&mut self, meta: &M) {
        self.buf.extend_from_slice(meta.as_bytes());
        self.pad();
    }

    /// Writes a single integer.
    pub fn put_u64(&mut self, x: u64) {
        self.buf.extend_from_slice(x.as_bytes());
    }

    /// Writes a length-prefixed slice of plain integers.
    pub fn put_slice<T: IntoBytes + Immutable>(&mut self, vals: &[T]) {
        self.put_u64(vals.len() as u64);
        self.buf.extend_from_slice(vals.as_bytes());
        self.pad();
    }

    fn pad(&mut self) {
        let len = self.buf.len().next_multiple_of(SNAPSHOT_ALIGN);
        self.buf.resize(len, 0);
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Checks if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a frozen snapshot region.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    bytes: Bytes,
}

impl SnapshotReader {
    /// Creates a reader over `bytes`.
    pub const fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.bytes.len() < needed {
            return Err(Error::invalid_metadata(format!(
                "snapshot truncated: expected {needed} {what} bytes, but {} remain.",
                self.bytes.len()
            )));
        }
        Ok(())
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len, "padding")?;
        let _ = self.bytes.take_prefix(len);
        Ok(())
    }

    /// Reads a metadata header.
    pub fn meta<M: Metadata>(&mut self) -> Result<M> {
        let size = std::mem::size_of::<M>();
        self.ensure(size, "header")?;
        let (meta, _) = M::read_from_prefix(&self.bytes)
            .map_err(|_| Error::invalid_metadata("snapshot header is unreadable"))?;
        self.skip(size.next_multiple_of(SNAPSHOT_ALIGN))?;
        Ok(meta)
    }

    /// Reads a single integer.
    pub fn u64(&mut self) -> Result<u64> {
        self.ensure(SNAPSHOT_ALIGN, "integer")?;
        let (x, _) = u64::read_from_prefix(&self.bytes)
            .map_err(|_| Error::invalid_metadata("snapshot integer is unreadable"))?;
        self.skip(SNAPSHOT_ALIGN)?;
        Ok(x)
    }

    /// Reads a slice written by [`SnapshotWriter::put_slice`] as a view into
    /// the snapshot region.
    pub fn view<T>(&mut self) -> Result<View<[T]>>
    where
        T: FromBytes + Immutable,
    {
        let len = usize::try_from(self.u64()?)
            .map_err(|_| Error::invalid_metadata("slice length overflowed usize"))?;
        let byte_len = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| Error::invalid_metadata("slice byte length overflowed"))?;
        self.ensure(byte_len, "payload")?;
        let vals = self.bytes.view_prefix_with_elems::<[T]>(len)?;
        self.skip(byte_len.next_multiple_of(SNAPSHOT_ALIGN) - byte_len)?;
        Ok(vals)
    }

    /// Reads a small slice written by [`SnapshotWriter::put_slice`] into an
    /// owned vector.
    pub fn vec<T>(&mut self) -> Result<Vec<T>>
    where
        T: FromBytes + Immutable + Clone + 'static,
    {
        Ok(self.view::<T>()?.to_vec())
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }

    /// Checks that the whole region was consumed.
    pub fn finish(self) -> Result<()> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_metadata(format!(
                "{} trailing bytes after snapshot.",
                self.bytes.len()
            )))
        }
    }
}
