use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use grambit::codecs::{CodecKind, RankCodec, RankDecoder};
use grambit::{NgramStore, StoreConfig};

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, Criterion, SamplingMode,
};

const SAMPLE_SIZE: usize = 30;
const WARM_UP_TIME: Duration = Duration::from_secs(5);
const MEASURE_TIME: Duration = Duration::from_secs(10);

const SEED_VALUES: u64 = 334;
const SEED_QUERIES: u64 = 114514;
const NUM_VALUES: usize = 1 << 20;
const NUM_QUERIES: usize = 1000;

/// Ranks with a geometric tail, the shape n-gram counts have.
fn gen_skewed_ranks(len: usize, p: f64, seed: u64) -> Vec<u64> {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let mut r = 0;
            while r < 100_000 && rng.gen_bool(p) {
                r += 1;
            }
            r
        })
        .collect()
}

fn gen_random_ints(len: usize, min: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(min..max)).collect()
}

fn criterion_codec_access_steep(c: &mut Criterion) {
    let mut group = c.benchmark_group("timing_codec_access_steep");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP_TIME);
    group.measurement_time(MEASURE_TIME);
    group.sampling_mode(SamplingMode::Flat);

    let ranks = gen_skewed_ranks(NUM_VALUES, 0.5, SEED_VALUES);
    perform_codec_access(&mut group, &ranks);
}

fn criterion_codec_access_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("timing_codec_access_flat");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP_TIME);
    group.measurement_time(MEASURE_TIME);
    group.sampling_mode(SamplingMode::Flat);

    let ranks = gen_skewed_ranks(NUM_VALUES, 0.99, SEED_VALUES);
    perform_codec_access(&mut group, &ranks);
}

fn criterion_store_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("timing_store_query");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP_TIME);
    group.measurement_time(MEASURE_TIME);
    group.sampling_mode(SamplingMode::Flat);

    let mut counts: Vec<u64> = gen_skewed_ranks(NUM_VALUES, 0.7, SEED_VALUES)
        .into_iter()
        .map(|r| r + 1)
        .collect();
    counts.sort_unstable();
    let mut records: Vec<(String, u64)> = counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (format!("ngram {i}"), c))
        .collect();
    let queries = gen_random_ints(NUM_QUERIES, 0, records.len(), SEED_QUERIES);

    for codec in [CodecKind::Gamma, CodecKind::Fibonacci] {
        let config = StoreConfig {
            codec,
            ..Default::default()
        };
        let store = NgramStore::build(&mut records, &config).unwrap();
        group.bench_function(format!("grambit/NgramStore<{codec}>"), |b| {
            b.iter(|| {
                let mut sum = 0;
                for &q in &queries {
                    sum += store.query_or_zero(records[q].0.as_bytes());
                }
                if sum == 0 {
                    panic!("Should not come.");
                }
            });
        });
    }
}

fn run_queries<D: RankDecoder>(codec: &D, queries: &[usize]) -> u64 {
    let mut sum = 0;
    for &q in queries {
        sum += codec.at(q).unwrap();
    }
    sum
}

fn perform_codec_access(group: &mut BenchmarkGroup<WallTime>, ranks: &[u64]) {
    let queries = gen_random_ints(NUM_QUERIES, 0, ranks.len(), SEED_QUERIES);
    let max_value = ranks.iter().copied().max().unwrap_or(0) + 1;

    group.bench_function("grambit/GammaCodec", |b| {
        let codec = RankCodec::encode(CodecKind::Gamma, ranks.iter().copied(), max_value).unwrap();
        b.iter(|| run_queries(&codec, &queries));
    });

    group.bench_function("grambit/FibonacciCodec", |b| {
        let codec =
            RankCodec::encode(CodecKind::Fibonacci, ranks.iter().copied(), max_value).unwrap();
        b.iter(|| run_queries(&codec, &queries));
    });
}

criterion_group!(
    benches,
    criterion_codec_access_steep,
    criterion_codec_access_flat,
    criterion_store_query
);

criterion_main!(benches);
