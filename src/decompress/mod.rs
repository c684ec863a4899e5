//! LZMA decompression.
//!
//! The decoder mirrors the encoder's context model bit for bit: every
//! adaptive probability the encoder updates, the decoder updates in the same
//! order, so both sides agree on every range split.
//!
//! ## Example
//!
//! ```rust
//! use lzma_stream::parsing::LzmaPropertiesParser;
//! use lzma_stream::{compress, Decoder, EncoderOptions};
//!
//! let options = EncoderOptions::default();
//! let packed = compress(b"hello hello hello", &options)?;
//!
//! // Raw data starts after the 13-byte header.
//! let properties = LzmaPropertiesParser::parse(&packed)?;
//! let mut decoder = Decoder::new(properties)?;
//! let mut out = Vec::new();
//! decoder.code(&packed[13..], &mut out, Some(17))?;
//! assert_eq!(out, b"hello hello hello");
//! # Ok::<(), lzma_stream::LzmaError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Compressed Data
//!       ↓
//! ┌──────────────┐
//! │ RangeDecoder │ ← adaptive binary arithmetic decoding
//! └──────────────┘
//!       ↓
//! ┌──────────────┐
//! │ Decoder      │ ← literals, matches, reps, end marker
//! └──────────────┘
//!       ↓
//! ┌──────────────┐
//! │ OutWindow    │ ← dictionary for back-references, streams to the sink
//! └──────────────┘
//!       ↓
//! Decompressed Data
//! ```
//!
//! ## Termination
//!
//! A stream ends after the declared number of bytes, or at the end marker
//! when the size is unknown. A marker before the declared size is reported
//! as [`DecompressError::IncompleteData`].

mod decoder;
mod out_window;

#[cfg(test)]
mod tests;

pub use decoder::Decoder;
pub use out_window::OutWindow;

use std::fmt;
use std::io;

/// Decompression errors.
#[derive(Debug)]
pub enum DecompressError {
    /// The compressed input ended inside a symbol.
    UnexpectedEof,
    /// A match refers to data before the start of the output or beyond the
    /// dictionary.
    InvalidDistance { distance: u32, position: u64 },
    /// An end marker arrived before the declared size was reached.
    IncompleteData { expected: u64, actual: u64 },
    /// The input ended without the end marker a size-less stream requires.
    MissingEndMarker,
    Io(io::Error),
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "Unexpected end of data"),
            Self::InvalidDistance { distance, position } => {
                write!(
                    f,
                    "Invalid match distance: {} at output position {}",
                    distance, position
                )
            }
            Self::IncompleteData { expected, actual } => {
                write!(
                    f,
                    "Incomplete data: expected {} bytes, end marker after {}",
                    expected, actual
                )
            }
            Self::MissingEndMarker => write!(f, "Stream ended without end marker"),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DecompressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DecompressError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, DecompressError>;
