//! Decompressing `Read` adapter.

use std::io::{self, Read, Write};
use std::mem;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use super::join_worker;
use crate::error::Result;
use crate::options::DecoderOptions;

/// Decoded chunks queued between the decoder thread and the caller.
const QUEUE_CAPACITY: usize = 8;

/// Size of one decoded chunk.
const CHUNK_SIZE: usize = 1 << 10;

/// Sink of the decoder thread: cuts the output into chunks and queues them.
struct ChannelSink {
    sender: Sender<Vec<u8>>,
    chunk: Vec<u8>,
}

impl ChannelSink {
    fn send_chunk(&mut self) -> io::Result<()> {
        if self.chunk.is_empty() {
            return Ok(());
        }
        let chunk = mem::replace(&mut self.chunk, Vec::with_capacity(CHUNK_SIZE));
        self.sender
            .send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "reader dropped"))
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(CHUNK_SIZE - self.chunk.len());
        self.chunk.extend_from_slice(&buf[..n]);
        if self.chunk.len() == CHUNK_SIZE {
            self.send_chunk()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_chunk()
    }
}

/// `Read` adapter that decompresses on a worker thread.
///
/// The header is read on the worker, so a malformed header is reported by
/// the first `read`.
pub struct LzmaReader {
    receiver: Receiver<Vec<u8>>,
    worker: Option<JoinHandle<Result<u64>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl LzmaReader {
    /// Start the decoder thread over `source`.
    pub fn new<R: Read + Send + 'static>(source: R, options: DecoderOptions) -> Result<Self> {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        let worker = thread::Builder::new()
            .name("lzma-reader".into())
            .spawn(move || {
                let mut sink = ChannelSink {
                    sender,
                    chunk: Vec::with_capacity(CHUNK_SIZE),
                };
                let written = crate::decompress_stream(source, &mut sink, &options)?;
                sink.flush()?;
                log::trace!("reader worker done after {} bytes", written);
                Ok(written)
            })?;

        Ok(Self {
            receiver,
            worker: Some(worker),
            chunk: Vec::new(),
            pos: 0,
        })
    }
}

impl Read for LzmaReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.chunk.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                // Queue drained and worker gone: end of data or its error.
                Err(_) => {
                    return match self.worker.take() {
                        Some(worker) => join_worker(worker).map(|_| 0).map_err(Into::into),
                        None => Ok(0),
                    };
                }
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::DecompressError;
    use crate::error::LzmaError;
    use crate::options::EncoderOptions;
    use crate::parsing::HeaderFormat;
    use std::io::Cursor;

    #[test]
    fn test_reader_roundtrip() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 13) as u8 + b'a').collect();
        let packed = crate::compress(&data, &EncoderOptions::default()).unwrap();
        let mut reader = LzmaReader::new(Cursor::new(packed), DecoderOptions::default()).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
        // Stays at end of stream.
        assert_eq!(reader.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn test_reader_ignore_size() {
        let data = b"size field present but ignored".to_vec();
        let mut packed = Vec::new();
        let options = EncoderOptions::default().with_end_marker(true);
        crate::compress_stream(&data[..], &mut packed, &options, HeaderFormat::Full, Some(data.len() as u64))
            .unwrap();
        let decoder_options = DecoderOptions::default().with_ignore_size(true);
        let mut reader = LzmaReader::new(Cursor::new(packed), decoder_options).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_reader_reports_bad_header() {
        let mut reader = LzmaReader::new(Cursor::new(vec![0xFFu8; 13]), DecoderOptions::default()).unwrap();
        let err = reader.read(&mut [0u8; 16]).unwrap_err();
        let inner = err.into_inner().unwrap();
        assert!(matches!(
            inner.downcast_ref::<LzmaError>(),
            Some(LzmaError::InvalidProperties(0xFF))
        ));
    }

    #[test]
    fn test_reader_reports_truncation_after_data() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i.wrapping_mul(2654435761) >> 11) as u8).collect();
        let packed = crate::compress(&data, &EncoderOptions::default()).unwrap();
        let cut = packed[..packed.len() - 200].to_vec();
        let mut reader = LzmaReader::new(Cursor::new(cut), DecoderOptions::default()).unwrap();
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert!(out.len() < data.len());
        assert_eq!(&out[..], &data[..out.len()]);
        let inner = err.into_inner().unwrap();
        assert!(matches!(
            inner.downcast_ref::<LzmaError>(),
            Some(LzmaError::Decompress(DecompressError::UnexpectedEof))
        ));
    }
}
