//! Compressing `Write` adapter.

use std::io::{self, Read, Write};
use std::mem;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use super::{finished_error, join_worker};
use crate::error::Result;
use crate::options::EncoderOptions;
use crate::parsing::HeaderFormat;

/// Buffers queued between the caller and the encoder thread.
const QUEUE_CAPACITY: usize = 4;

/// Bytes collected before a buffer is handed to the worker.
const BUFFER_SIZE: usize = 1 << 16;

/// Reads the buffers the writer sends; the closed channel is end of input.
struct ChannelSource {
    receiver: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for ChannelSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.chunk.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// `Write` adapter that compresses on a worker thread.
///
/// The stream has an unknown size and always ends with an end marker.
/// Call [`finish`](Self::finish) to terminate it and get the sink back;
/// dropping the writer also terminates the stream but discards errors.
pub struct LzmaWriter<W> {
    sender: Option<Sender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<W>>>,
    buffer: Vec<u8>,
}

impl<W: Write + Send + 'static> LzmaWriter<W> {
    /// Validate `options` and start the encoder thread.
    pub fn new(sink: W, options: EncoderOptions, format: HeaderFormat) -> Result<Self> {
        options.validate()?;
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        let worker = thread::Builder::new()
            .name("lzma-writer".into())
            .spawn(move || {
                let mut sink = sink;
                let source = ChannelSource {
                    receiver,
                    chunk: Vec::new(),
                    pos: 0,
                };
                let consumed = crate::compress_stream(source, &mut sink, &options, format, None)?;
                log::trace!("writer worker done after {} bytes", consumed);
                Ok(sink)
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            buffer: Vec::with_capacity(BUFFER_SIZE),
        })
    }

    /// End the input, wait for the encoder and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.send_buffer()?;
        self.sender = None;
        match self.worker.take() {
            Some(worker) => join_worker(worker),
            None => Err(finished_error().into()),
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = mem::replace(&mut self.buffer, Vec::with_capacity(BUFFER_SIZE));
        let sender = self.sender.as_ref().ok_or_else(finished_error)?;
        if sender.send(chunk).is_ok() {
            return Ok(());
        }

        // The worker hung up early; report why.
        self.sender = None;
        match self.worker.take() {
            Some(worker) => match join_worker(worker) {
                Err(e) => Err(e.into()),
                Ok(_) => Err(finished_error()),
            },
            None => Err(finished_error()),
        }
    }
}

impl<W: Write + Send + 'static> Write for LzmaWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sender.is_none() {
            return Err(finished_error());
        }
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= BUFFER_SIZE {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    /// Hands buffered bytes to the worker. The encoder decides when they
    /// reach the sink.
    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

impl<W> Drop for LzmaWriter<W> {
    fn drop(&mut self) {
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
