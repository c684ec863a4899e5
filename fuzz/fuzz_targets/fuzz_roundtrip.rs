#![no_main]
use libfuzzer_sys::fuzz_target;
use lzma_stream::{compress, decompress, EncoderOptions, MatchFinderKind};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    // Byte 0: lc/lp/pb, byte 1: dictionary size log, byte 2: fast bytes,
    // byte 3: match finder and end marker
    let lc = u32::from(data[0] % 9);
    let lp = u32::from((data[0] / 9) % 5);
    let pb = u32::from((data[0] / 45) % 5);
    let dictionary_size = 1u32 << (data[1] % 21);
    let fast_bytes = 5 + u32::from(data[2]) % 269;
    let match_finder = if data[3] & 1 == 0 {
        MatchFinderKind::Bt4
    } else {
        MatchFinderKind::Bt2
    };

    let options = EncoderOptions::default()
        .with_lc_lp_pb(lc, lp, pb)
        .with_dictionary_size(dictionary_size)
        .with_fast_bytes(fast_bytes)
        .with_match_finder(match_finder)
        .with_end_marker(data[3] & 2 != 0);

    let input = &data[4..];
    let packed = compress(input, &options).expect("valid options");
    let unpacked = decompress(&packed).expect("own output decodes");
    assert_eq!(unpacked, input);
});
