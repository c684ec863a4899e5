//! Range encoder.
//!
//! Output is collected in memory; the block coder drains it to the real sink
//! between blocks, so a failing sink aborts the block that was being written.

use super::{BIT_MODEL_TOTAL, NUM_BIT_MODEL_TOTAL_BITS, NUM_MOVE_BITS, TOP_VALUE};

/// Carry-propagating range encoder.
#[derive(Debug)]
pub struct RangeEncoder {
    low: u64,
    range: u32,
    /// Byte held back until we know whether a carry reaches it.
    cache: u8,
    /// 1 + number of pending 0xFF bytes behind `cache`.
    cache_size: u64,
    /// Bytes already moved out of `cache` (drained or not).
    position: u64,
    output: Vec<u8>,
}

impl RangeEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            range: 0xFFFF_FFFF,
            cache: 0,
            cache_size: 1,
            position: 0,
            output: Vec::with_capacity(1 << 16),
        }
    }

    /// Reset for a new stream. Pending output is discarded.
    pub fn reset(&mut self) {
        self.low = 0;
        self.range = 0xFFFF_FFFF;
        self.cache = 0;
        self.cache_size = 1;
        self.position = 0;
        self.output.clear();
    }

    /// Encode `bit` against `prob` and adapt `prob` toward it.
    #[inline]
    pub fn encode_bit(&mut self, prob: &mut u16, bit: u32) {
        let p = *prob as u32;
        let bound = (self.range >> NUM_BIT_MODEL_TOTAL_BITS) * p;
        if bit == 0 {
            self.range = bound;
            *prob = (p + ((BIT_MODEL_TOTAL - p) >> NUM_MOVE_BITS)) as u16;
        } else {
            self.low += bound as u64;
            self.range -= bound;
            *prob = (p - (p >> NUM_MOVE_BITS)) as u16;
        }
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.shift_low();
        }
    }

    /// Encode the low `num_bits` of `value` at fixed 50% probability, high bit first.
    pub fn encode_direct_bits(&mut self, value: u32, num_bits: u32) {
        for i in (0..num_bits).rev() {
            self.range >>= 1;
            if (value >> i) & 1 == 1 {
                self.low += self.range as u64;
            }
            if self.range < TOP_VALUE {
                self.range <<= 8;
                self.shift_low();
            }
        }
    }

    fn shift_low(&mut self) {
        let carry = (self.low >> 32) as u8;
        if carry != 0 || self.low < 0xFF00_0000 {
            self.position += self.cache_size;
            let mut byte = self.cache;
            loop {
                self.output.push(byte.wrapping_add(carry));
                byte = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low & 0x00FF_FFFF) << 8;
    }

    /// Push the remaining state out. The stream is complete afterwards.
    pub fn flush(&mut self) {
        for _ in 0..5 {
            self.shift_low();
        }
    }

    /// Bytes the stream will occupy if flushed now.
    pub fn processed_size(&self) -> u64 {
        self.cache_size + self.position + 4
    }

    /// Bytes ready to be written to the sink.
    pub fn pending(&self) -> &[u8] {
        &self.output
    }

    /// Forget bytes already written to the sink.
    pub fn clear_pending(&mut self) {
        self.output.clear();
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RangeDecoder, PROB_INIT};
    use super::*;

    #[test]
    fn test_empty_stream_is_five_bytes() {
        let mut rc = RangeEncoder::new();
        rc.flush();
        assert_eq!(rc.pending(), &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_probability_adapts() {
        let mut rc = RangeEncoder::new();
        let mut prob = PROB_INIT;
        rc.encode_bit(&mut prob, 0);
        assert!(prob > PROB_INIT);
        let after_zero = prob;
        rc.encode_bit(&mut prob, 1);
        assert!(prob < after_zero);
    }

    #[test]
    fn test_bits_roundtrip_through_decoder() {
        let bits: Vec<u32> = (0..2000u32).map(|i| ((i * 7) % 5 == 0) as u32).collect();
        let mut rc = RangeEncoder::new();
        let mut probs = [PROB_INIT; 4];
        for (i, &bit) in bits.iter().enumerate() {
            rc.encode_bit(&mut probs[i % 4], bit);
        }
        rc.encode_direct_bits(0x2A5, 10);
        rc.flush();

        let data = rc.pending().to_vec();
        let mut reader = &data[..];
        let mut dec = RangeDecoder::new(&mut reader).unwrap();
        let mut probs = [PROB_INIT; 4];
        for (i, &bit) in bits.iter().enumerate() {
            assert_eq!(dec.decode_bit(&mut probs[i % 4]).unwrap(), bit, "bit {}", i);
        }
        assert_eq!(dec.decode_direct_bits(10).unwrap(), 0x2A5);
    }

    #[test]
    fn test_processed_size_tracks_output() {
        let mut rc = RangeEncoder::new();
        let mut prob = PROB_INIT;
        for i in 0..10_000u32 {
            rc.encode_bit(&mut prob, i & 1);
        }
        let estimate = rc.processed_size();
        rc.flush();
        assert_eq!(estimate, rc.pending().len() as u64);
    }
}
