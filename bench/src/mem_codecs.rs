use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use grambit::codecs::{CodecKind, RankCodec, RankDecoder};
use grambit::int_vectors::CompactVector;

const NUM_VALUES: usize = 1 << 20;
const SEED_VALUES: u64 = 334;

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

fn main() {
    for p in [0.3, 0.5, 0.7, 0.9, 0.99] {
        show_memories(&format!("geometric p={p}"), &gen_skewed_ranks(NUM_VALUES, p, SEED_VALUES));
    }
}

fn show_data_stats(vals: &[u64]) {
    let nvals = vals.len();
    let max = vals.iter().cloned().max().unwrap();
    let mean = vals.iter().cloned().sum::<u64>() as f64 / nvals as f64;

    let mut sorted = vals.to_vec();
    sorted.sort_unstable();
    let median = sorted[nvals / 2];
    sorted.dedup();

    println!(
        "Basic: n_vals={nvals}, max_val={max}, mean_val={mean:.3}, median_val={median}, distinct={}",
        sorted.len()
    );
}

fn show_memories(title: &str, vals: &[u64]) {
    println!("[{title}]");
    show_data_stats(vals);

    let max_value = vals.iter().copied().max().unwrap() + 1;

    let bits = CompactVector::from_slice(vals).unwrap().size_in_bits();
    print_memory("CompactVector", bits, vals.len());

    for kind in [CodecKind::Gamma, CodecKind::Fibonacci] {
        let codec = RankCodec::encode(kind, vals.iter().copied(), max_value).unwrap();
        print_memory(&format!("{kind}"), codec.size_in_bits(), vals.len());
    }
}

fn print_memory(name: &str, bits: usize, nvals: usize) {
    println!("{}: {:.3} bits per value", name, bits as f64 / nvals as f64);
}
