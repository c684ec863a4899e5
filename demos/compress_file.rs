//! Compress a file into a `.lzma` stream, reporting progress.
//!
//! Usage:
//!   cargo run --release --example compress_file -- input output.lzma [fast_bytes]

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::ControlFlow;
use std::time::Instant;

use lzma_stream::{Encoder, EncoderOptions, HeaderFormat, StreamHeader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: compress_file <input> <output.lzma> [fast_bytes]");
        eprintln!("  compress_file ./data.bin ./data.bin.lzma 64");
        std::process::exit(1);
    }

    let fast_bytes: u32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(32);
    let options = EncoderOptions::default().with_fast_bytes(fast_bytes);

    let input = File::open(&args[1])?;
    let size = input.metadata()?.len();
    let mut output = BufWriter::new(File::create(&args[2])?);

    let mut encoder = Encoder::new(options)?;
    let header = StreamHeader {
        properties: encoder.properties(),
        uncompressed_size: Some(size),
    };
    header.write_to(&mut output, HeaderFormat::Full)?;

    let start = Instant::now();
    let mut last_report = 0u64;
    let mut report = |processed_in: u64, processed_out: u64| {
        if processed_in - last_report >= 1 << 22 {
            last_report = processed_in;
            eprintln!(
                "  {:>6.1}% {} -> {} bytes",
                processed_in as f64 * 100.0 / size.max(1) as f64,
                processed_in,
                processed_out
            );
        }
        ControlFlow::Continue(())
    };
    encoder.code(BufReader::new(input), &mut output, &mut report)?;
    output.flush()?;

    let packed = output.get_ref().metadata()?.len();
    eprintln!(
        "Compressed {} bytes into {} ({:.1}%) in {:.2?}",
        size,
        packed,
        packed as f64 * 100.0 / size.max(1) as f64,
        start.elapsed()
    );
    Ok(())
}
