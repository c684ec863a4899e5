//! Bit-tree coding of fixed-width symbols.
//!
//! A `w`-bit symbol is coded as `w` adaptive bits. The model slot of each bit
//! is the path taken so far (`m = (m << 1) | bit`, starting at 1), giving one
//! slot per tree node. The reverse variants walk the bits low-first and are
//! used for distance footers, whose low bits are close to uniform.

use std::io::Read;

use super::{init_probs, price, RangeDecoder, RangeEncoder, PROB_INIT};
use crate::decompress::Result;

/// Adaptive model for `num_bits`-wide symbols.
#[derive(Debug, Clone)]
pub struct BitTree {
    probs: Vec<u16>,
    num_bits: u32,
}

impl BitTree {
    pub fn new(num_bits: u32) -> Self {
        Self {
            probs: vec![PROB_INIT; 1 << num_bits],
            num_bits,
        }
    }

    pub fn init(&mut self) {
        init_probs(&mut self.probs);
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub fn encode(&mut self, rc: &mut RangeEncoder, symbol: u32) {
        let mut m = 1usize;
        for i in (0..self.num_bits).rev() {
            let bit = (symbol >> i) & 1;
            rc.encode_bit(&mut self.probs[m], bit);
            m = (m << 1) | bit as usize;
        }
    }

    pub fn reverse_encode(&mut self, rc: &mut RangeEncoder, symbol: u32) {
        reverse_encode(&mut self.probs, 1, rc, self.num_bits, symbol);
    }

    pub fn price(&self, symbol: u32) -> u32 {
        let mut total = 0;
        let mut m = 1usize;
        for i in (0..self.num_bits).rev() {
            let bit = (symbol >> i) & 1;
            total += price(self.probs[m], bit);
            m = (m << 1) | bit as usize;
        }
        total
    }

    pub fn reverse_price(&self, symbol: u32) -> u32 {
        reverse_price(&self.probs, 1, self.num_bits, symbol)
    }

    pub fn decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>) -> Result<u32> {
        let mut m = 1usize;
        for _ in 0..self.num_bits {
            m = (m << 1) | rc.decode_bit(&mut self.probs[m])? as usize;
        }
        Ok(m as u32 - (1 << self.num_bits))
    }

    pub fn reverse_decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>) -> Result<u32> {
        reverse_decode(&mut self.probs, 1, rc, self.num_bits)
    }
}

// Free functions address a window of a shared slot array: the distance
// footers of all mid-range slots live side by side in one array. Node `m`
// (starting at 1) of a tree at `offset` is `probs[offset + m - 1]`.

/// Reverse-encode `symbol` into `probs[offset..]`.
pub fn reverse_encode(
    probs: &mut [u16],
    offset: usize,
    rc: &mut RangeEncoder,
    num_bits: u32,
    mut symbol: u32,
) {
    let mut m = 1usize;
    for _ in 0..num_bits {
        let bit = symbol & 1;
        rc.encode_bit(&mut probs[offset + m - 1], bit);
        m = (m << 1) | bit as usize;
        symbol >>= 1;
    }
}

/// Price of reverse-encoding `symbol` against `probs[offset..]`.
pub fn reverse_price(probs: &[u16], offset: usize, num_bits: u32, mut symbol: u32) -> u32 {
    let mut total = 0;
    let mut m = 1usize;
    for _ in 0..num_bits {
        let bit = symbol & 1;
        symbol >>= 1;
        total += price(probs[offset + m - 1], bit);
        m = (m << 1) | bit as usize;
    }
    total
}

/// Reverse-decode a symbol from `probs[offset..]`.
pub fn reverse_decode<R: Read>(
    probs: &mut [u16],
    offset: usize,
    rc: &mut RangeDecoder<R>,
    num_bits: u32,
) -> Result<u32> {
    let mut m = 1usize;
    let mut symbol = 0u32;
    for i in 0..num_bits {
        let bit = rc.decode_bit(&mut probs[offset + m - 1])?;
        m = (m << 1) | bit as usize;
        symbol |= bit << i;
    }
    Ok(symbol)
}
