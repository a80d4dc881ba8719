use proptest::prelude::*;

use grambit::bit_vectors::{Access, BitVectorBuilder, BitVectorData, DArray, DoubleOneIndex, SArray};
use grambit::codecs::{CodecKind, RankCodec, RankDecoder, DEFAULT_FIBONACCI_MAX_VALUE};
use grambit::int_vectors::CompactVectorBuilder;

/// Strictly increasing positions built from gaps, mostly short with some
/// long jumps so both inventory block kinds show up.
fn positions() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(prop_oneof![3 => 1usize..3, 1 => 1usize..2000], 1..2500).prop_map(
        |gaps| {
            gaps.iter()
                .scan(0usize, |acc, &g| {
                    *acc += g;
                    Some(*acc - 1)
                })
                .collect()
        },
    )
}

fn bits_of(positions: &[usize], len: usize) -> Vec<bool> {
    let mut bits = vec![false; len];
    for &p in positions {
        bits[p] = true;
    }
    bits
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bit_vector_checks_bounds(
        bits in prop::collection::vec(any::<bool>(), 0..600),
        past in 0usize..200,
    ) {
        let len = bits.len();
        let oob = len + past;
        let mut builder = BitVectorBuilder::with_len(len);
        for (i, &b) in bits.iter().enumerate() {
            prop_assert!(builder.set_bit(i, b).is_ok());
            prop_assert_eq!(builder.get_bit(i), Some(b));
        }
        prop_assert!(builder.set_bit(oob, true).is_err());
        prop_assert_eq!(builder.get_bit(oob), None);
        prop_assert_eq!(builder.len(), len);

        let data = builder.into_data();
        for (i, &b) in bits.iter().enumerate() {
            prop_assert_eq!(data.access(i), Some(b));
            prop_assert_eq!(data.get_bits(i, 1), Some(usize::from(b)));
        }
        prop_assert_eq!(data.access(oob), None);
        prop_assert_eq!(data.get_bits(oob, 1), None);
        if len > 0 {
            prop_assert_eq!(data.get_bits(len - 1, 2), None);
        }
    }

    #[test]
    fn compact_vector_keeps_every_value(
        width in 1usize..=32,
        raw in prop::collection::vec(any::<u32>(), 0..500),
    ) {
        let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
        let vals: Vec<usize> = raw.iter().map(|&v| (v & mask) as usize).collect();
        let mut builder = CompactVectorBuilder::zeroed(vals.len(), width).unwrap();
        for (i, &v) in vals.iter().enumerate() {
            builder.set_int(i, v).unwrap();
            prop_assert_eq!(builder.get_int(i), Some(v));
        }
        let cv = builder.freeze();
        prop_assert_eq!(cv.len(), vals.len());
        for (i, &v) in vals.iter().enumerate() {
            prop_assert_eq!(cv.get_int(i), Some(v));
        }
        prop_assert_eq!(cv.get_int(vals.len()), None);
    }

    #[test]
    fn compact_vector_rejects_wide_values(width in 1usize..=32) {
        let mut builder = CompactVectorBuilder::zeroed(1, width).unwrap();
        prop_assert!(builder.set_int(0, 1 << width).is_err());
    }

    #[test]
    fn darray_selects_every_set_bit(positions in positions(), tail in 0usize..100) {
        let len = positions[positions.len() - 1] + 1 + tail;
        let da = DArray::from_bits(bits_of(&positions, len));
        prop_assert_eq!(da.select(0), None);
        for (k, &p) in positions.iter().enumerate() {
            prop_assert_eq!(da.select(k + 1), Some(p));
        }
        prop_assert_eq!(da.select(positions.len() + 1), None);
    }

    #[test]
    fn sarray_reproduces_increasing_sequence(positions in positions(), extra in 1usize..1000) {
        let universe = positions[positions.len() - 1] + 1 + extra;
        let sa = SArray::from_positions(positions.iter().copied(), positions.len(), universe).unwrap();
        for (i, &p) in positions.iter().enumerate() {
            prop_assert_eq!(sa.select(i), Some(p));
        }
        prop_assert_eq!(sa.select(positions.len()), None);

        let data = BitVectorData::from_bits(bits_of(&positions, universe));
        prop_assert_eq!(SArray::from_data(&data).unwrap(), sa);
    }

    #[test]
    fn gamma_codec_roundtrip(
        values in prop::collection::vec(
            prop_oneof![Just(0u64), Just(1u64), 0u64..64, 0u64..1_000_000, any::<u32>().prop_map(u64::from)],
            0..2000,
        ),
    ) {
        let codec = RankCodec::encode(CodecKind::Gamma, values.iter().copied(), 0).unwrap();
        prop_assert_eq!(codec.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(codec.at(i), Some(v));
        }
        prop_assert_eq!(codec.at(values.len()), None);
    }

    #[test]
    fn fibonacci_codec_roundtrip(
        values in prop::collection::vec(
            prop_oneof![
                Just(0u64),
                Just(1u64),
                Just(DEFAULT_FIBONACCI_MAX_VALUE - 1),
                0u64..64,
                0u64..DEFAULT_FIBONACCI_MAX_VALUE,
            ],
            0..2000,
        ),
    ) {
        let codec = RankCodec::encode(
            CodecKind::Fibonacci,
            values.iter().copied(),
            DEFAULT_FIBONACCI_MAX_VALUE,
        )
        .unwrap();
        prop_assert_eq!(codec.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(codec.at(i), Some(v));
        }
        prop_assert_eq!(codec.at(values.len()), None);
    }

    #[test]
    fn select11_counts_half_of_each_run(
        runs in prop::collection::vec((1usize..9, 1usize..6), 0..1500),
    ) {
        let mut bits = vec![];
        let mut expected = vec![];
        for &(ones, zeros) in &runs {
            let start = bits.len();
            bits.extend(std::iter::repeat(true).take(ones));
            bits.extend(std::iter::repeat(false).take(zeros));
            expected.extend((0..ones / 2).map(|j| start + 2 * j + 1));
        }
        let data = BitVectorData::from_bits(bits);
        let idx = DoubleOneIndex::new(&data);
        prop_assert_eq!(idx.num_terminators(), expected.len());
        for (k, &p) in expected.iter().enumerate() {
            prop_assert_eq!(idx.terminator(k, &data), Some(p));
            prop_assert_eq!(idx.select11(k + 1, &data), Some(p));
            prop_assert_eq!(idx.codeword_start(k + 1, &data), Some(p + 1));
        }
        prop_assert_eq!(idx.terminator(expected.len(), &data), None);
    }
}
