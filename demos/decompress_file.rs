//! Decompress a `.lzma` stream into a file.
//!
//! Usage:
//!   cargo run --release --example decompress_file -- input.lzma output

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::time::Instant;

use lzma_stream::{decompress_stream, DecoderOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: decompress_file <input.lzma> <output>");
        eprintln!("  decompress_file ./data.bin.lzma ./data.bin");
        std::process::exit(1);
    }

    let input = BufReader::new(File::open(&args[1])?);
    let mut output = BufWriter::new(File::create(&args[2])?);

    let start = Instant::now();
    let written = decompress_stream(input, &mut output, &DecoderOptions::default())?;
    output.flush()?;

    eprintln!("Decompressed {} bytes in {:.2?}", written, start.elapsed());
    Ok(())
}
