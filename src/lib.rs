//! LZMA compression and decompression.
//!
//! A streaming LZMA codec: binary-tree match finding, a price-driven optimal
//! parser, and adaptive range coding, with the matching decoder.
//!
//! Streams are framed by a 13-byte header (properties and the uncompressed
//! size) or by the 5-byte properties-only variant; see [`HeaderFormat`].
//!
//! ## Features
//! - Core library depends only on `log`
//! - `threaded` - Worker-thread `Read`/`Write` adapters
//!
//! ## Example
//!
//! ```rust
//! use lzma_stream::{compress, decompress, EncoderOptions};
//!
//! let data = b"one two three two one two three".repeat(10);
//! let packed = compress(&data, &EncoderOptions::default())?;
//! assert!(packed.len() < data.len());
//! assert_eq!(decompress(&packed)?, data);
//! # Ok::<(), lzma_stream::LzmaError>(())
//! ```

pub mod compress;
mod constants;
mod crc32;
pub mod decompress;
pub mod error;
pub mod lz;
pub mod options;
pub mod parsing;
pub mod rangecoder;
mod state;

// Worker-thread adapters (require 'threaded' feature)
#[cfg(feature = "threaded")]
pub mod streams;

use std::io::{Read, Write};

pub use compress::{CodeProgress, CodeStatus, Encoder, NoProgress};
pub use decompress::{DecompressError, Decoder};
pub use error::{LzmaError, Result};
pub use lz::MatchFinderKind;
pub use options::{DecoderOptions, EncoderOptions};
pub use parsing::{HeaderFormat, LzmaProperties, StreamHeader, StreamHeaderParser};

#[cfg(feature = "threaded")]
pub use streams::{LzmaReader, LzmaWriter};

/// Compress `data` into a stream with a full header declaring its size.
pub fn compress(data: &[u8], options: &EncoderOptions) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2 + 64);
    compress_stream(
        data,
        &mut out,
        options,
        HeaderFormat::Full,
        Some(data.len() as u64),
    )?;
    Ok(out)
}

/// Decompress a stream with a full 13-byte header.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress_stream(data, &mut out, &DecoderOptions::default())?;
    Ok(out)
}

/// Write a header and compress everything `input` yields.
///
/// With `uncompressed_size` set, exactly that many bytes are read and the
/// full header declares them. Otherwise, and always for
/// [`HeaderFormat::PropertiesOnly`], the stream ends with an end marker.
/// Returns the number of input bytes coded.
pub fn compress_stream<R: Read, W: Write>(
    input: R,
    output: &mut W,
    options: &EncoderOptions,
    format: HeaderFormat,
    uncompressed_size: Option<u64>,
) -> Result<u64> {
    let uncompressed_size = match format {
        HeaderFormat::Full => uncompressed_size,
        HeaderFormat::PropertiesOnly => None,
    };
    let options = match uncompressed_size {
        Some(_) => *options,
        None => options.with_end_marker(true),
    };
    let mut encoder = Encoder::new(options)?;

    let header = StreamHeader {
        properties: options.properties(),
        uncompressed_size,
    };
    header.write_to(output, format)?;

    match uncompressed_size {
        Some(size) => {
            encoder.code(input.take(size), output, &mut NoProgress)?;
            if encoder.processed_in() != size {
                return Err(LzmaError::InvalidHeader(
                    "input ended before the declared size",
                ));
            }
        }
        None => {
            encoder.code(input, output, &mut NoProgress)?;
        }
    }
    Ok(encoder.processed_in())
}

/// Read a header and decompress the stream behind it.
///
/// Returns the number of bytes written to `output`.
pub fn decompress_stream<R: Read, W: Write>(
    mut input: R,
    output: &mut W,
    options: &DecoderOptions,
) -> Result<u64> {
    let header = StreamHeaderParser::read_from(&mut input, options.format)?;
    let mut decoder = Decoder::new(header.properties)?;

    let size = if options.ignore_size {
        None
    } else {
        header.uncompressed_size
    };
    let written = decoder.code(input, output, size)?;

    if options.ignore_size {
        if let Some(declared) = header.uncompressed_size {
            log::warn!(
                "header declares {} bytes; decoded {} bytes up to the end marker",
                declared,
                written
            );
        }
    }
    Ok(written)
}
