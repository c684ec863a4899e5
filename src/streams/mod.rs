//! Worker-thread stream adapters.
//!
//! Both adapters run the codec on a dedicated thread and talk to it through a
//! bounded [`crossbeam_channel`] queue of byte buffers. A full queue blocks
//! the producer; disconnecting the channel signals end of input.
//!
//! | Adapter | Caller side | Worker side | Queue |
//! |---------|-------------|-------------|-------|
//! | [`LzmaWriter`] | `Write` of plain bytes | encoder into the sink | 4 buffers |
//! | [`LzmaReader`] | `Read` of plain bytes | decoder from the source | 8 chunks of 1 KiB |
//!
//! A failure on the worker is reported by the next call on the caller side.
//! A panicking worker is reported as [`LzmaError::WorkerPanicked`].
//!
//! ## Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use lzma_stream::{DecoderOptions, EncoderOptions, HeaderFormat, LzmaReader, LzmaWriter};
//!
//! let mut writer = LzmaWriter::new(Vec::new(), EncoderOptions::default(), HeaderFormat::Full)?;
//! writer.write_all(b"streamed through a worker thread")?;
//! let packed = writer.finish()?;
//!
//! let mut reader = LzmaReader::new(std::io::Cursor::new(packed), DecoderOptions::default())?;
//! let mut text = String::new();
//! reader.read_to_string(&mut text)?;
//! assert_eq!(text, "streamed through a worker thread");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`LzmaError::WorkerPanicked`]: crate::LzmaError::WorkerPanicked

mod reader;
mod writer;

pub use reader::LzmaReader;
pub use writer::LzmaWriter;

use std::io;
use std::thread::JoinHandle;

use crate::error::{LzmaError, Result};

/// Join a finished worker, turning a panic into an error.
fn join_worker<T>(worker: JoinHandle<Result<T>>) -> Result<T> {
    match worker.join() {
        Ok(result) => result,
        Err(_) => {
            log::warn!("stream worker panicked");
            Err(LzmaError::WorkerPanicked)
        }
    }
}

fn finished_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "stream worker has already stopped")
}
