//! Encoder tests, checked through the decoder.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::model::{num_pos_states, ContextModel};
use super::*;
use crate::decompress::Decoder;
use crate::lz::MatchFinderKind;
use crate::options::EncoderOptions;
use crate::rangecoder::RangeEncoder;
use crate::state::State;

fn pack(data: &[u8], options: EncoderOptions) -> Vec<u8> {
    let mut encoder = Encoder::new(options).unwrap();
    let mut out = Vec::new();
    let status = encoder.code(data, &mut out, &mut NoProgress).unwrap();
    assert_eq!(status, CodeStatus::Finished);
    out
}

fn unpack(raw: &[u8], options: EncoderOptions, size: Option<u64>) -> Vec<u8> {
    let mut decoder = Decoder::new(options.properties()).unwrap();
    let mut out = Vec::new();
    decoder.code(raw, &mut out, size).unwrap();
    out
}

fn assert_roundtrip(data: &[u8], options: EncoderOptions) -> usize {
    let raw = pack(data, options);
    let size = if options.end_marker {
        None
    } else {
        Some(data.len() as u64)
    };
    assert_eq!(unpack(&raw, options, size), data, "{:?}", options);
    raw.len()
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Text-like input with repeats at many distances.
fn corpus(len: usize, seed: u64) -> Vec<u8> {
    const WORDS: [&str; 12] = [
        "range ", "coder ", "match ", "finder ", "literal ", "state ", "price ", "table ",
        "distance ", "slot ", "\n", "the ",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(len + 16);
    while data.len() < len {
        data.extend_from_slice(WORDS[rng.gen_range(0..WORDS.len())].as_bytes());
        if rng.gen_ratio(1, 10) {
            data.push(rng.gen());
        }
    }
    data.truncate(len);
    data
}

/// Every byte coded as a literal, through the same model.
fn all_literals(data: &[u8], options: EncoderOptions) -> Vec<u8> {
    let mut model = ContextModel::new(options.lc, options.lp, options.dist_table_size());
    model.init(num_pos_states(options.pb), options.fast_bytes - 1);
    let mut rc = RangeEncoder::new();
    let state = State::new();
    let mask = (1u32 << options.pb) - 1;
    let mut prev_byte = 0;
    for (i, &byte) in data.iter().enumerate() {
        let pos_state = (i as u32 & mask) as usize;
        model.encode_is_match(&mut rc, state, pos_state, 0);
        model.literal.encode(&mut rc, i as u64, prev_byte, byte);
        prev_byte = byte;
    }
    rc.flush();
    rc.pending().to_vec()
}

#[test]
fn test_empty_input_with_marker_decodes_empty() {
    let options = EncoderOptions::default().with_end_marker(true);
    let raw = pack(b"", options);
    assert!(unpack(&raw, options, None).is_empty());
}

#[test]
fn test_single_byte() {
    assert_roundtrip(b"x", EncoderOptions::default());
    assert_roundtrip(b"x", EncoderOptions::default().with_end_marker(true));
}

#[test]
fn test_repeated_pattern_is_tiny() {
    let data = b"WXYZ".repeat(1000);
    let size = assert_roundtrip(&data, EncoderOptions::default());
    assert!(size < 64, "{} bytes", size);
}

#[test]
fn test_random_input_does_not_blow_up() {
    let data = random_bytes(10 * 1024, 42);
    let size = assert_roundtrip(&data, EncoderOptions::default());
    assert!(
        size <= data.len() + data.len() / 32 + 32,
        "{} bytes for {} input",
        size,
        data.len()
    );
}

#[test]
fn test_long_run_at_max_fast_bytes() {
    // Runs far longer than 273 bytes make every match hit the fast-bytes
    // limit; the random tail ends a run mid-lookahead.
    let mut data = vec![b'a'; 50_000];
    data.extend(random_bytes(300, 9));
    data.extend(std::iter::repeat(b'b').take(4097));
    data.extend(random_bytes(17, 10));
    let options = EncoderOptions::default().maximal_fast_bytes();
    assert_roundtrip(&data, options);
    assert_roundtrip(&data, options.with_end_marker(true));
}

#[test]
fn test_lc_lp_pb_combinations() {
    let data = corpus(6000, 1);
    for (lc, lp, pb) in [(0, 0, 0), (3, 0, 2), (8, 0, 0), (0, 4, 4), (4, 2, 1), (8, 4, 4)] {
        let options = EncoderOptions::default()
            .with_dictionary_size(1 << 16)
            .with_lc_lp_pb(lc, lp, pb);
        assert_roundtrip(&data, options);
    }
}

#[test]
fn test_both_match_finders() {
    let data = corpus(20_000, 2);
    for kind in [MatchFinderKind::Bt2, MatchFinderKind::Bt4] {
        let options = EncoderOptions::default()
            .with_dictionary_size(1 << 16)
            .with_match_finder(kind);
        let size = assert_roundtrip(&data, options);
        assert!(size < data.len() / 2, "{:?}: {} bytes", kind, size);
    }
}

#[test]
fn test_dictionary_sizes() {
    let data = corpus(12_000, 3);
    for dictionary_size in [1, 2, 100, 1 << 12, 1 << 20] {
        let options = EncoderOptions::default().with_dictionary_size(dictionary_size);
        assert_roundtrip(&data, options);
    }
}

#[test]
fn test_fast_bytes_range() {
    let data = corpus(8000, 4);
    for fast_bytes in [5, 16, 64, 273] {
        let options = EncoderOptions::default()
            .with_dictionary_size(1 << 16)
            .with_fast_bytes(fast_bytes);
        assert_roundtrip(&data, options);
    }
}

#[test]
fn test_far_matches_use_align_bits() {
    // Repeats 70 KB back need distance slots above the reverse-tree range.
    let block = random_bytes(70_000, 5);
    let data = [&block[..], &block[..]].concat();
    let size = assert_roundtrip(&data, EncoderOptions::default().with_dictionary_size(1 << 20));
    assert!(size < block.len() + block.len() / 16, "{} bytes", size);
}

#[test]
fn test_random_roundtrips() {
    let mut rng = StdRng::seed_from_u64(77);
    for _ in 0..12 {
        let len = rng.gen_range(0..5000);
        let mut data = corpus(len, rng.gen());
        // Splice in some noise.
        for _ in 0..rng.gen_range(0..8) {
            if data.is_empty() {
                break;
            }
            let at = rng.gen_range(0..data.len());
            data[at] = rng.gen();
        }
        let options = EncoderOptions::default()
            .with_dictionary_size(rng.gen_range(1..=1 << 16))
            .with_fast_bytes(rng.gen_range(5..=273))
            .with_lc_lp_pb(rng.gen_range(0..=8), rng.gen_range(0..=4), rng.gen_range(0..=4))
            .with_end_marker(rng.gen());
        assert_roundtrip(&data, options);
    }
}

#[test]
fn test_parser_beats_all_literals() {
    let options = EncoderOptions::default().with_dictionary_size(1 << 16);
    for data in [corpus(10_000, 6), random_bytes(4000, 6), b"ab".repeat(3000)] {
        let literal_only = all_literals(&data, options);
        assert_eq!(unpack(&literal_only, options, Some(data.len() as u64)), data);

        let optimized = pack(&data, options);
        // Prices are estimates, so allow a sliver of slack.
        assert!(
            optimized.len() <= literal_only.len() + literal_only.len() / 100 + 8,
            "{} vs {}",
            optimized.len(),
            literal_only.len()
        );
    }
}

#[test]
fn test_cancelled_stream_is_valid() {
    let data = corpus(40_000, 8);
    let options = EncoderOptions::default().with_dictionary_size(1 << 16);
    let mut encoder = Encoder::new(options).unwrap();
    let mut out = Vec::new();
    let mut calls = 0;
    let mut stop_second = |_: u64, _: u64| {
        calls += 1;
        if calls == 2 {
            std::ops::ControlFlow::Break(())
        } else {
            std::ops::ControlFlow::Continue(())
        }
    };
    let status = encoder.code(&data[..], &mut out, &mut stop_second).unwrap();
    assert_eq!(status, CodeStatus::Cancelled);

    let consumed = encoder.processed_in() as usize;
    assert!(consumed < data.len());
    // Terminated by an end marker even though none was requested.
    assert_eq!(unpack(&out, options, None), &data[..consumed]);
}

#[test]
fn test_sink_error_aborts() {
    struct Full(usize);
    impl std::io::Write for Full {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.0 == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::WriteZero, "full"));
            }
            let n = buf.len().min(self.0);
            self.0 -= n;
            Ok(n)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    let data = random_bytes(20_000, 12);
    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();
    let result = encoder.code(&data[..], &mut Full(100), &mut NoProgress);
    assert!(matches!(result, Err(crate::LzmaError::Io(_))));
}

// Reference bitstreams. liblzma picks the same tokens for these inputs and
// its output, marker included, is byte-identical.

const RUN_STREAM: [u8; 20] = [
    0x5D, 0x00, 0x00, 0x40, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x30,
    0xED, 0xFE, 0x00, 0x00, 0x00,
];

const PERIOD5_STREAM: [u8; 25] = [
    0x5D, 0x00, 0x00, 0x40, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x30,
    0x98, 0x88, 0x98, 0x3E, 0xD4, 0x6A, 0xE9, 0x50, 0x00, 0x00,
];

const PERIOD5_MARKER_BODY: [u8; 17] = [
    0x00, 0x30, 0x98, 0x88, 0x98, 0x3E, 0xD4, 0x6B, 0x0E, 0xCA, 0xEB, 0xFF, 0xFF, 0xEE, 0x61,
    0x00, 0x00,
];

#[test]
fn test_run_matches_reference_stream() {
    // Literal 'a', then rep0 of length 19.
    let packed = crate::compress(&[b'a'; 20], &EncoderOptions::default()).unwrap();
    assert_eq!(packed, RUN_STREAM);
}

#[test]
fn test_distance_four_matches_reference_stream() {
    // Five literals, then a match of length 15 at distance 4 (slot 4).
    let data = b"abcde".repeat(4);
    let packed = crate::compress(&data, &EncoderOptions::default()).unwrap();
    assert_eq!(packed, PERIOD5_STREAM);
    assert_eq!(crate::decompress(&packed).unwrap(), data);
}

#[test]
fn test_end_marker_matches_reference_stream() {
    let data = b"abcde".repeat(4);
    let mut packed = Vec::new();
    crate::compress_stream(
        &data[..],
        &mut packed,
        &EncoderOptions::default(),
        crate::parsing::HeaderFormat::Full,
        None,
    )
    .unwrap();
    assert_eq!(&packed[..5], &PERIOD5_STREAM[..5]);
    assert!(packed[5..13].iter().all(|&b| b == 0xFF));
    assert_eq!(&packed[13..], PERIOD5_MARKER_BODY);
}
