//! Readers for `key<TAB>count` n-gram records.
//!
//! The build reads its input several times, so a source is anything that can
//! be scanned from the beginning again: a [`NgramFile`] on disk, plain or gzip
//! compressed, or an in-memory slice of pairs.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::bufread::MultiGzDecoder;

use crate::error::Result;

/// First two bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Counters reported by a single scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Records passed to the visitor.
    pub records: usize,
    /// Malformed records left out.
    pub skipped: usize,
}

/// Input that can be scanned for `(key, count)` records any number of times.
///
/// Every scan must yield the same records in the same order.
pub trait RecordSource {
    /// Feeds every well-formed record to `visit` in input order.
    ///
    /// # Errors
    ///
    /// Returns the first error of the underlying reader or of `visit`.
    fn scan(&mut self, visit: &mut dyn FnMut(&[u8], u64) -> Result<()>) -> Result<ScanStats>;
}

/// Why a record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// No TAB between key and count.
    MissingTab,
    /// The count is zero.
    ZeroCount,
    /// The count is not a decimal `u64`.
    BadCount,
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformed::MissingTab => write!(f, "missing TAB separator"),
            Malformed::ZeroCount => write!(f, "zero count"),
            Malformed::BadCount => write!(f, "unparseable count"),
        }
    }
}

/// Splits `line` at its first TAB into a key and a positive count.
///
/// A trailing line break is ignored.
///
/// # Examples
///
/// ```
/// use grambit::ingest::{parse_record, Malformed};
///
/// assert_eq!(parse_record(b"of the\t42\n"), Ok((&b"of the"[..], 42)));
/// assert_eq!(parse_record(b"of the"), Err(Malformed::MissingTab));
/// assert_eq!(parse_record(b"of the\t0"), Err(Malformed::ZeroCount));
/// assert_eq!(parse_record(b"of the\tmany"), Err(Malformed::BadCount));
/// ```
pub fn parse_record(line: &[u8]) -> std::result::Result<(&[u8], u64), Malformed> {
    let line = trim_newline(line);
    let tab = line
        .iter()
        .position(|&b| b == b'\t')
        .ok_or(Malformed::MissingTab)?;
    let (key, count) = (&line[..tab], &line[tab + 1..]);
    let count: u64 = std::str::from_utf8(count)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or(Malformed::BadCount)?;
    if count == 0 {
        return Err(Malformed::ZeroCount);
    }
    Ok((key, count))
}

/// Strips a trailing `\n` or `\r\n`.
pub fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Opens `path` for line reading, decompressing it if it starts with the gzip
/// magic bytes.
///
/// # Errors
///
/// An error is returned if the file cannot be opened or read.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut reader = BufReader::new(File::open(path)?);
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        tracing::debug!(path = %path.display(), "reading gzip input");
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// N-gram count file with one `key<TAB>count` record per line.
#[derive(Debug, Clone)]
pub struct NgramFile {
    path: PathBuf,
    scans: usize,
}

impl NgramFile {
    /// Creates a source over `path`. The file is opened on every scan.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scans: 0,
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for NgramFile {
    fn scan(&mut self, visit: &mut dyn FnMut(&[u8], u64) -> Result<()>) -> Result<ScanStats> {
        let first = self.scans == 0;
        self.scans += 1;

        let mut reader = open_text(&self.path)?;
        let mut stats = ScanStats::default();
        let mut line = Vec::new();
        let mut lineno = 0;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            lineno += 1;
            if trim_newline(&line).is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok((key, count)) => {
                    visit(key, count)?;
                    stats.records += 1;
                }
                Err(reason) => {
                    if first {
                        tracing::warn!(path = %self.path.display(), lineno, %reason, "skipping malformed record");
                    } else {
                        tracing::debug!(path = %self.path.display(), lineno, %reason, "skipping malformed record");
                    }
                    stats.skipped += 1;
                }
            }
        }
        Ok(stats)
    }
}

impl<K: AsRef<[u8]>> RecordSource for [(K, u64)] {
    fn scan(&mut self, visit: &mut dyn FnMut(&[u8], u64) -> Result<()>) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        for (key, count) in self.iter() {
            if *count == 0 {
                stats.skipped += 1;
                continue;
            }
            visit(key.as_ref(), *count)?;
            stats.records += 1;
        }
        Ok(stats)
    }
}

impl<K: AsRef<[u8]>> RecordSource for Vec<(K, u64)> {
    fn scan(&mut self, visit: &mut dyn FnMut(&[u8], u64) -> Result<()>) -> Result<ScanStats> {
        self.as_mut_slice().scan(visit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn collect<S: RecordSource + ?Sized>(source: &mut S) -> (Vec<(Vec<u8>, u64)>, ScanStats) {
        let mut out = vec![];
        let stats = source
            .scan(&mut |k, c| {
                out.push((k.to_vec(), c));
                Ok(())
            })
            .unwrap();
        (out, stats)
    }

    const TEXT: &str = "apple\t1\nno tab here\nbanana\t2\r\n\ncherry\t0\ndate\tfive\nelder berry\t5\n";

    fn expected() -> Vec<(Vec<u8>, u64)> {
        vec![
            (b"apple".to_vec(), 1),
            (b"banana".to_vec(), 2),
            (b"elder berry".to_vec(), 5),
        ]
    }

    #[test]
    fn test_plain_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEXT.as_bytes()).unwrap();
        let mut source = NgramFile::new(file.path());
        let (records, stats) = collect(&mut source);
        assert_eq!(records, expected());
        assert_eq!(stats, ScanStats { records: 3, skipped: 3 });

        // Rescans see the same records.
        assert_eq!(collect(&mut source).0, expected());
    }

    #[test]
    fn test_gzip_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(TEXT.as_bytes()).unwrap();
        file.write_all(&enc.finish().unwrap()).unwrap();
        let (records, _) = collect(&mut NgramFile::new(file.path()));
        assert_eq!(records, expected());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = NgramFile::new(dir.path().join("missing.tsv"));
        assert!(source.scan(&mut |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_slice_skips_zero_counts() {
        let mut pairs: Vec<(&str, u64)> = vec![("a", 1), ("b", 0), ("c", 3)];
        let (records, stats) = collect(&mut pairs);
        assert_eq!(records, vec![(b"a".to_vec(), 1), (b"c".to_vec(), 3)]);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_key_keeps_later_tabs() {
        assert_eq!(parse_record(b"a\tb\t3"), Err(Malformed::BadCount));
        assert_eq!(parse_record(b"\t3"), Ok((&b""[..], 3)));
    }
}
