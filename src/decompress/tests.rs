//! Decoder tests against the encoder and against reference streams.

use super::*;
use crate::compress::{Encoder, NoProgress};
use crate::error::LzmaError;
use crate::options::EncoderOptions;
use crate::parsing::{HeaderFormat, LzmaProperties, StreamHeaderParser};

fn pack(data: &[u8], options: &EncoderOptions) -> Vec<u8> {
    let mut encoder = Encoder::new(*options).unwrap();
    let mut out = Vec::new();
    encoder.code(data, &mut out, &mut NoProgress).unwrap();
    out
}

fn unpack(raw: &[u8], properties: LzmaProperties, size: Option<u64>) -> crate::Result<Vec<u8>> {
    let mut decoder = Decoder::new(properties)?;
    let mut out = Vec::new();
    let written = decoder.code(raw, &mut out, size)?;
    assert_eq!(written, out.len() as u64);
    Ok(out)
}

/// Deterministic noise, incompressible for practical purposes.
fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed | 1;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}

fn options() -> EncoderOptions {
    EncoderOptions::default().with_dictionary_size(1 << 16)
}

#[test]
fn test_known_size_roundtrip() {
    let data = b"The quick brown fox jumps over the lazy dog. ".repeat(40);
    let raw = pack(&data, &options());
    let out = unpack(&raw, options().properties(), Some(data.len() as u64)).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_end_marker_roundtrip() {
    let data = b"abracadabra abracadabra cadabra".repeat(25);
    let options = options().with_end_marker(true);
    let raw = pack(&data, &options);
    let out = unpack(&raw, options.properties(), None).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_known_size_stops_before_marker() {
    let data = b"hello world".to_vec();
    let options = options().with_end_marker(true);
    let raw = pack(&data, &options);
    let out = unpack(&raw, options.properties(), Some(data.len() as u64)).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_early_marker_is_incomplete() {
    let data = b"0123456789".repeat(10);
    let options = options().with_end_marker(true);
    let raw = pack(&data, &options);
    let result = unpack(&raw, options.properties(), Some(200));
    assert!(matches!(
        result,
        Err(LzmaError::Decompress(DecompressError::IncompleteData {
            expected: 200,
            actual: 100
        }))
    ));
}

#[test]
fn test_truncated_stream_without_size() {
    let data = noise(4000, 7);
    let options = options().with_end_marker(true);
    let raw = pack(&data, &options);
    let result = unpack(&raw[..raw.len() / 2], options.properties(), None);
    assert!(matches!(
        result,
        Err(LzmaError::Decompress(DecompressError::MissingEndMarker))
    ));
}

#[test]
fn test_truncated_stream_with_size() {
    let data = noise(4000, 11);
    let raw = pack(&data, &options());
    let result = unpack(&raw[..raw.len() / 2], options().properties(), Some(4000));
    assert!(matches!(
        result,
        Err(LzmaError::Decompress(DecompressError::UnexpectedEof))
    ));
}

#[test]
fn test_truncated_range_coder_init() {
    let result = unpack(&[0, 1], options().properties(), None);
    assert!(matches!(
        result,
        Err(LzmaError::Decompress(DecompressError::UnexpectedEof))
    ));
}

#[test]
fn test_distance_beyond_dictionary() {
    // Second copy of the block sits 5000 bytes back.
    let block = noise(5000, 3);
    let data = [block.clone(), block].concat();
    let raw = pack(&data, &options());

    let mut properties = options().properties();
    properties.dictionary_size = 4096;
    let result = unpack(&raw, properties, Some(data.len() as u64));
    assert!(matches!(
        result,
        Err(LzmaError::Decompress(DecompressError::InvalidDistance { distance, .. }))
            if distance >= 4096
    ));
}

#[test]
fn test_rejects_out_of_range_properties() {
    let properties = LzmaProperties {
        lc: 9,
        lp: 0,
        pb: 2,
        dictionary_size: 1 << 16,
    };
    assert!(matches!(
        Decoder::new(properties),
        Err(LzmaError::InvalidProperties(_))
    ));
}

#[test]
fn test_decoder_is_reusable() {
    let first = b"first stream first stream".to_vec();
    let second = noise(3000, 5);
    let options = options().with_end_marker(true);

    let mut decoder = Decoder::new(options.properties()).unwrap();
    for data in [&first, &second, &first] {
        let raw = pack(data, &options);
        let mut out = Vec::new();
        decoder.code(&raw[..], &mut out, None).unwrap();
        assert_eq!(&out, data);
    }
}

#[test]
fn test_window_smaller_than_output() {
    // Output far exceeds the 4 KiB window, so it wraps many times.
    let mut data = Vec::new();
    for i in 0..200u32 {
        data.extend_from_slice(format!("line {:05} of a long listing\n", i % 37).as_bytes());
    }
    let options = options().with_dictionary_size(1 << 12);
    let raw = pack(&data, &options);
    let out = unpack(&raw, options.properties(), Some(data.len() as u64)).unwrap();
    assert_eq!(out, data);
}

// Streams written by `xz --format=lzma`: unknown size, end marker, distances
// from slot 0 up to the align-coded slots.

fn decode_fixture(data: &[u8]) -> Vec<u8> {
    let header = StreamHeaderParser::parse(data, HeaderFormat::Full).unwrap();
    assert_eq!(header.uncompressed_size, None);
    unpack(&data[StreamHeaderParser::HEADER_SIZE..], header.properties, None).unwrap()
}

#[test]
fn test_decode_xz_stream() {
    let data = include_bytes!("../../__fixtures__/lzma/sample_xz9.lzma");
    let expected = include_bytes!("../../__fixtures__/lzma/sample.txt.expected");
    let header = StreamHeaderParser::parse(data, HeaderFormat::Full).unwrap();
    assert_eq!(header.properties.dictionary_size, 1 << 26);
    assert_eq!(decode_fixture(data), expected.as_slice());
}

#[test]
fn test_decode_xz_stream_with_literal_position_bits() {
    let data = include_bytes!("../../__fixtures__/lzma/sample_xz_lc1_lp2_pb0.lzma");
    let expected = include_bytes!("../../__fixtures__/lzma/sample.txt.expected");
    let header = StreamHeaderParser::parse(data, HeaderFormat::Full).unwrap();
    assert_eq!(
        (header.properties.lc, header.properties.lp, header.properties.pb),
        (1, 2, 0)
    );
    assert_eq!(decode_fixture(data), expected.as_slice());
}

#[test]
fn test_decode_xz_stream_with_known_size() {
    let data = include_bytes!("../../__fixtures__/lzma/sample_xz9.lzma");
    let expected = include_bytes!("../../__fixtures__/lzma/sample.txt.expected");
    let header = StreamHeaderParser::parse(data, HeaderFormat::Full).unwrap();
    // The size cuts decoding short of the marker.
    let out = unpack(
        &data[StreamHeaderParser::HEADER_SIZE..],
        header.properties,
        Some(1000),
    )
    .unwrap();
    assert_eq!(out, &expected[..1000]);
}

#[test]
fn test_decode_distance_four_reference_stream() {
    // Five literals and one match of length 15 at distance 4.
    let data = [
        0x5D, 0x00, 0x00, 0x40, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x30,
        0x98, 0x88, 0x98, 0x3E, 0xD4, 0x6A, 0xE9, 0x50, 0x00, 0x00,
    ];
    assert_eq!(crate::decompress(&data).unwrap(), b"abcde".repeat(4));
}
