#![no_main]
use libfuzzer_sys::fuzz_target;
use lzma_stream::{decompress_stream, DecoderOptions, HeaderFormat};

fuzz_target!(|data: &[u8]| {
    let Some((&mode, stream)) = data.split_first() else {
        return;
    };

    // Byte 0: header layout and whether to trust the size field
    let format = if mode & 1 == 0 {
        HeaderFormat::Full
    } else {
        HeaderFormat::PropertiesOnly
    };
    let options = DecoderOptions::default()
        .with_format(format)
        .with_ignore_size(mode & 2 != 0);

    let _ = decompress_stream(stream, &mut std::io::sink(), &options);
});
