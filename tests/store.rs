use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use grambit::codecs::{CodecKind, RankCodec, RankDecoder};
use grambit::ingest::NgramFile;
use grambit::store::{sibling, HASH_EXTENSION, VALUES_EXTENSION};
use grambit::{NgramStore, StoreConfig};

fn fruits() -> Vec<(&'static str, u64)> {
    vec![("apple", 1), ("banana", 2), ("cherry", 2), ("date", 5)]
}

fn wide() -> StoreConfig {
    StoreConfig {
        fingerprint_bits: 32,
        ..Default::default()
    }
}

/// `n` keys with counts drawn from a geometric-like distribution, sorted by
/// count as n-gram files are.
fn skewed_records(n: usize, seed: u64) -> Vec<(String, u64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts: Vec<u64> = (0..n)
        .map(|_| {
            let mut c = 1;
            while c < 1000 && rng.gen_bool(0.7) {
                c += 1;
            }
            c
        })
        .collect();
    counts.sort_unstable();
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (format!("w{i} w{} w{}", i % 97, i % 13), c))
        .collect()
}

#[test]
fn fruits_lookup() {
    for codec in [CodecKind::Gamma, CodecKind::Fibonacci] {
        let config = StoreConfig { codec, ..wide() };
        let store = NgramStore::build(&mut fruits(), &config).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.query(b"apple"), Some(1));
        assert_eq!(store.query(b"banana"), Some(2));
        assert_eq!(store.query(b"cherry"), Some(2));
        assert_eq!(store.query(b"date"), Some(5));
        assert_eq!(store.query(b"nonexistent"), None);
        assert_eq!(store.query_or_zero(b"nonexistent"), 0);
    }
}

#[test]
fn gamma_beats_fixed_width_on_skewed_ranks() {
    // 500 distinct ranks, each at least once, the rest heavily skewed.
    let mut rng = StdRng::seed_from_u64(7);
    let mut ranks: Vec<u64> = (0..500).collect();
    while ranks.len() < 10_000 {
        let mut r = 0;
        while r < 499 && rng.gen_bool(0.5) {
            r += 1;
        }
        ranks.push(r);
    }
    let mut distinct = ranks.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 500);

    let codec = RankCodec::encode(CodecKind::Gamma, ranks.iter().copied(), 0).unwrap();
    for (i, &r) in ranks.iter().enumerate() {
        assert_eq!(codec.at(i), Some(r));
    }
    let naive = 10_000 * 9;
    assert!(
        codec.size_in_bits() < naive,
        "{} bits against {naive}",
        codec.size_in_bits()
    );
}

#[test]
fn skewed_store_is_compact() {
    let mut records = skewed_records(20_000, 3);
    let store = NgramStore::build(&mut records, &StoreConfig::default()).unwrap();
    for (k, v) in &records {
        assert_eq!(store.query(k.as_bytes()), Some(*v));
    }
    let stats = store.stats();
    // Far below the fixed-width rank array the build starts from.
    assert!(stats.rank_bits * 2 < stats.num_keys * StoreConfig::default().rank_bits);
    assert!(stats.bits_per_key() < 32.0, "{stats}");
}

#[test]
fn persistence_with_and_without_gzip() {
    let mut records = skewed_records(5000, 11);
    let store = NgramStore::build(&mut records, &wide()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    for gzip in [true, false] {
        let base = dir.path().join(format!("lm-{gzip}"));
        store.save(&base, gzip).unwrap();
        let raw = std::fs::read(sibling(&base, VALUES_EXTENSION)).unwrap();
        assert_eq!(raw.starts_with(&[0x1f, 0x8b]), gzip);

        let other = NgramStore::load(&base).unwrap();
        assert_eq!(other, store);
        for (k, v) in &records {
            assert_eq!(other.query(k.as_bytes()), Some(*v));
        }
        assert_eq!(other.query(b"not an ngram"), None);
    }
}

#[test]
fn load_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("nothing");
    assert!(matches!(
        NgramStore::load(&base),
        Err(grambit::Error::Io(_))
    ));
}

#[test]
fn build_from_gzip_file_and_reopen() {
    let records = skewed_records(3000, 5);
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    for (k, v) in &records {
        writeln!(enc, "{k}\t{v}").unwrap();
    }
    writeln!(enc, "broken line without a count").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("3gram.tsv.gz");
    std::fs::write(&input, enc.finish().unwrap()).unwrap();

    let base = dir.path().join("3gram");
    let config = StoreConfig {
        codec: CodecKind::Fibonacci,
        ..wide()
    };
    let store = NgramStore::open_or_build(&base, &mut NgramFile::new(&input), &config).unwrap();
    assert_eq!(store.len(), records.len());
    assert_eq!(store.query(b"broken line without a count"), None);
    assert!(sibling(&base, HASH_EXTENSION).exists());

    // The second call loads the snapshot instead of reading the input.
    std::fs::remove_file(&input).unwrap();
    let reopened = NgramStore::open_or_build(&base, &mut NgramFile::new(&input), &config).unwrap();
    assert_eq!(reopened, store);
    for (k, v) in &records {
        assert_eq!(reopened.query(k.as_bytes()), Some(*v));
    }
}
