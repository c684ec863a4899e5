//! Range decoder.

use std::io::{ErrorKind, Read};

use super::{BIT_MODEL_TOTAL, NUM_BIT_MODEL_TOTAL_BITS, NUM_MOVE_BITS, TOP_VALUE};
use crate::decompress::{DecompressError, Result};

const INPUT_BUFFER_SIZE: usize = 1 << 14;

/// Range decoder reading compressed bytes from `R`.
pub struct RangeDecoder<R> {
    inner: R,
    buffer: Box<[u8]>,
    pos: usize,
    filled: usize,
    range: u32,
    code: u32,
}

impl<R: Read> RangeDecoder<R> {
    /// Prime the decoder with the first five stream bytes.
    pub fn new(inner: R) -> Result<Self> {
        let mut decoder = Self {
            inner,
            buffer: vec![0; INPUT_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            filled: 0,
            range: 0xFFFF_FFFF,
            code: 0,
        };
        for _ in 0..5 {
            decoder.code = (decoder.code << 8) | decoder.next_byte()? as u32;
        }
        Ok(decoder)
    }

    #[inline]
    fn next_byte(&mut self) -> Result<u8> {
        if self.pos == self.filled {
            self.refill()?;
        }
        let byte = self.buffer[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn refill(&mut self) -> Result<()> {
        loop {
            match self.inner.read(&mut self.buffer) {
                Ok(0) => return Err(DecompressError::UnexpectedEof),
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    #[inline]
    fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            self.code = (self.code << 8) | self.next_byte()? as u32;
            self.range <<= 8;
        }
        Ok(())
    }

    /// Decode one bit against `prob`, adapting it.
    #[inline]
    pub fn decode_bit(&mut self, prob: &mut u16) -> Result<u32> {
        let p = *prob as u32;
        let bound = (self.range >> NUM_BIT_MODEL_TOTAL_BITS) * p;
        let bit = if self.code < bound {
            self.range = bound;
            *prob = (p + ((BIT_MODEL_TOTAL - p) >> NUM_MOVE_BITS)) as u16;
            0
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob = (p - (p >> NUM_MOVE_BITS)) as u16;
            1
        };
        self.normalize()?;
        Ok(bit)
    }

    /// Decode `num_bits` fixed-probability bits, high bit first.
    pub fn decode_direct_bits(&mut self, num_bits: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..num_bits {
            self.range >>= 1;
            let bit = if self.code >= self.range {
                self.code -= self.range;
                1
            } else {
                0
            };
            result = (result << 1) | bit;
            self.normalize()?;
        }
        Ok(result)
    }

    /// Whether the final code is zero, which a well-formed stream guarantees.
    pub fn is_finished_ok(&self) -> bool {
        self.code == 0
    }
}
