//! Error types for LZMA compression and decompression.
//!
//! This module provides the [`LzmaError`] type which covers every failure the
//! public API can report.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Configuration | [`InvalidConfiguration`] | Parameter out of range, rejected before coding |
//! | Format | [`InvalidHeader`], [`InvalidProperties`], [`BufferTooSmall`] | Missing or malformed stream header |
//! | Data | [`Decompress`] | Corrupt or truncated compressed data |
//! | I/O | [`Io`], [`WorkerPanicked`] | Source/sink failures |
//!
//! Nothing is retried. A stream that failed halfway is not resumable: range
//! coded data cannot be resynchronized, so callers start over.
//!
//! ## Example
//!
//! ```rust
//! use lzma_stream::{decompress, LzmaError};
//!
//! match decompress(&[0xFF; 13]) {
//!     Err(LzmaError::InvalidProperties(byte)) => assert_eq!(byte, 0xFF),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```
//!
//! [`InvalidConfiguration`]: LzmaError::InvalidConfiguration
//! [`InvalidHeader`]: LzmaError::InvalidHeader
//! [`InvalidProperties`]: LzmaError::InvalidProperties
//! [`BufferTooSmall`]: LzmaError::BufferTooSmall
//! [`Decompress`]: LzmaError::Decompress
//! [`Io`]: LzmaError::Io
//! [`WorkerPanicked`]: LzmaError::WorkerPanicked

use std::fmt;
use std::io;

use crate::decompress::DecompressError;

/// Error type for LZMA operations.
#[derive(Debug)]
pub enum LzmaError {
    /// An encoder parameter is outside its valid range.
    ///
    /// `parameter` is one of `lc`, `lp`, `pb`, `dictionary_size`,
    /// `fast_bytes`.
    InvalidConfiguration {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The rejected value.
        value: u32,
    },

    /// The stream header is malformed.
    InvalidHeader(&'static str),

    /// The lc/lp/pb byte of the header does not describe a valid model.
    ///
    /// Valid bytes are `(pb * 5 + lp) * 9 + lc` with `pb <= 4`, `lp <= 4`,
    /// `lc <= 8`, i.e. anything below 225.
    InvalidProperties(u8),

    /// The header buffer is too short.
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        have: usize,
    },

    /// The compressed data is corrupt or truncated.
    Decompress(DecompressError),

    /// An I/O error occurred.
    ///
    /// Wraps [`std::io::Error`] from the source or the sink.
    Io(io::Error),

    /// The worker thread of a streaming adapter panicked.
    WorkerPanicked,
}

impl fmt::Display for LzmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { parameter, value } => {
                write!(f, "Invalid configuration: {} = {}", parameter, value)
            }
            Self::InvalidHeader(msg) => write!(f, "Invalid header: {}", msg),
            Self::InvalidProperties(b) => write!(f, "Invalid properties byte: 0x{:02x}", b),
            Self::BufferTooSmall { needed, have } => {
                write!(f, "Buffer too small: need {} bytes, have {}", needed, have)
            }
            Self::Decompress(e) => write!(f, "Decompression failed: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::WorkerPanicked => write!(f, "Worker thread panicked"),
        }
    }
}

impl std::error::Error for LzmaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decompress(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LzmaError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecompressError> for LzmaError {
    fn from(e: DecompressError) -> Self {
        match e {
            DecompressError::Io(e) => Self::Io(e),
            other => Self::Decompress(other),
        }
    }
}

impl From<LzmaError> for io::Error {
    fn from(e: LzmaError) -> Self {
        match e {
            LzmaError::Io(e) => e,
            LzmaError::InvalidConfiguration { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LzmaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display() {
        let e = LzmaError::InvalidConfiguration {
            parameter: "fast_bytes",
            value: 300,
        };
        assert_eq!(e.to_string(), "Invalid configuration: fast_bytes = 300");
        assert_eq!(
            LzmaError::InvalidProperties(0xE1).to_string(),
            "Invalid properties byte: 0xe1"
        );
    }

    #[test]
    fn test_io_passes_through() {
        let e: LzmaError = DecompressError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).into();
        assert!(matches!(e, LzmaError::Io(_)));
        let back: io::Error = e.into();
        assert_eq!(back.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_data_error_has_source() {
        let e: LzmaError = DecompressError::UnexpectedEof.into();
        assert!(e.source().is_some());
        let io_err: io::Error = e.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
    }
}
