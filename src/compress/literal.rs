//! Literal coder.
//!
//! Each context owns 0x300 probabilities: slots `1..0x100` are the plain
//! 8-bit tree, `0x100..0x300` hold the matched-mode trees for a match bit of
//! 0 and 1. The context is chosen from the low `lp` bits of the position and
//! the high `lc` bits of the previous byte.

use crate::constants::LITERAL_CODER_SIZE;
use crate::rangecoder::{init_probs, price, RangeEncoder, PROB_INIT};

pub struct LiteralEncoder {
    probs: Vec<u16>,
    lc: u32,
    pos_mask: u32,
}

impl LiteralEncoder {
    pub fn new(lc: u32, lp: u32) -> Self {
        let contexts = 1usize << (lc + lp);
        Self {
            probs: vec![PROB_INIT; contexts * LITERAL_CODER_SIZE],
            lc,
            pos_mask: (1 << lp) - 1,
        }
    }

    pub fn init(&mut self) {
        init_probs(&mut self.probs);
    }

    #[inline]
    fn base(&self, position: u64, prev_byte: u8) -> usize {
        let context = (((position as u32) & self.pos_mask) << self.lc)
            + ((prev_byte as u32) >> (8 - self.lc));
        context as usize * LITERAL_CODER_SIZE
    }

    pub fn encode(&mut self, rc: &mut RangeEncoder, position: u64, prev_byte: u8, symbol: u8) {
        let base = self.base(position, prev_byte);
        let probs = &mut self.probs[base..base + LITERAL_CODER_SIZE];
        let mut context = 1usize;
        for i in (0..8).rev() {
            let bit = ((symbol >> i) & 1) as u32;
            rc.encode_bit(&mut probs[context], bit);
            context = (context << 1) | bit as usize;
        }
    }

    /// Code `symbol` while the bits still agree with `match_byte`.
    pub fn encode_matched(
        &mut self,
        rc: &mut RangeEncoder,
        position: u64,
        prev_byte: u8,
        match_byte: u8,
        symbol: u8,
    ) {
        let base = self.base(position, prev_byte);
        let probs = &mut self.probs[base..base + LITERAL_CODER_SIZE];
        let mut context = 1usize;
        let mut same = true;
        for i in (0..8).rev() {
            let bit = ((symbol >> i) & 1) as u32;
            let mut slot = context;
            if same {
                let match_bit = ((match_byte >> i) & 1) as usize;
                slot += (1 + match_bit) << 8;
                same = match_bit == bit as usize;
            }
            rc.encode_bit(&mut probs[slot], bit);
            context = (context << 1) | bit as usize;
        }
    }

    pub fn price(
        &self,
        position: u64,
        prev_byte: u8,
        matched: bool,
        match_byte: u8,
        symbol: u8,
    ) -> u32 {
        let base = self.base(position, prev_byte);
        let probs = &self.probs[base..base + LITERAL_CODER_SIZE];
        let mut total = 0;
        let mut context = 1usize;
        let mut i = 8;
        if matched {
            while i > 0 {
                i -= 1;
                let match_bit = ((match_byte >> i) & 1) as usize;
                let bit = ((symbol >> i) & 1) as u32;
                total += price(probs[((1 + match_bit) << 8) + context], bit);
                context = (context << 1) | bit as usize;
                if match_bit != bit as usize {
                    break;
                }
            }
        }
        while i > 0 {
            i -= 1;
            let bit = ((symbol >> i) & 1) as u32;
            total += price(probs[context], bit);
            context = (context << 1) | bit as usize;
        }
        total
    }
}
