//! Compress stdin to stdout (or the reverse with `-d`) through the
//! worker-thread adapters.
//!
//! Usage:
//!   cargo run --release --example pipe --features threaded < input > output.lzma
//!   cargo run --release --example pipe --features threaded -- -d < output.lzma > input

use std::io::{self, Write};

use lzma_stream::{DecoderOptions, EncoderOptions, HeaderFormat, LzmaReader, LzmaWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let decompress = std::env::args().any(|a| a == "-d");

    if decompress {
        let mut reader = LzmaReader::new(io::stdin(), DecoderOptions::default())?;
        let mut stdout = io::stdout().lock();
        let n = io::copy(&mut reader, &mut stdout)?;
        stdout.flush()?;
        eprintln!("{} bytes out", n);
    } else {
        let mut writer = LzmaWriter::new(io::stdout(), EncoderOptions::default(), HeaderFormat::Full)?;
        let n = io::copy(&mut io::stdin().lock(), &mut writer)?;
        writer.finish()?.flush()?;
        eprintln!("{} bytes in", n);
    }
    Ok(())
}
