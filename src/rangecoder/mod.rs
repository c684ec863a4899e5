//! Adaptive binary range coder.
//!
//! Every modelled bit is coded against an 11-bit probability that the bit is
//! zero. After each coded bit the probability moves toward the observed value
//! by `1/32` of the remaining distance, so the model adapts without keeping
//! any frequency counts.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`RangeEncoder`] | Narrows `[low, low + range)` and emits carry-propagated bytes |
//! | [`RangeDecoder`] | Mirrors the encoder, pulling bytes from a [`std::io::Read`] |
//! | [`BitTree`] | Fixed-width symbols as chains of adaptive bits |
//!
//! ## Prices
//!
//! The optimal parser never emits bits while it searches. It asks for the
//! *price* of a bit instead: an estimate of `-log2(p)` in units of
//! `1 / (1 << PRICE_SHIFT_BITS)` bits, looked up in a table built at compile
//! time.

pub mod bit_tree;
mod decoder;
mod encoder;

pub use bit_tree::BitTree;
pub use decoder::RangeDecoder;
pub use encoder::RangeEncoder;

/// Width of a probability in bits.
pub const NUM_BIT_MODEL_TOTAL_BITS: u32 = 11;

/// Probability scale (2048).
pub const BIT_MODEL_TOTAL: u32 = 1 << NUM_BIT_MODEL_TOTAL_BITS;

/// Adaptation shift applied after each coded bit.
pub const NUM_MOVE_BITS: u32 = 5;

/// Initial value of every model slot (50%).
pub const PROB_INIT: u16 = (BIT_MODEL_TOTAL / 2) as u16;

/// Renormalization threshold for `range`.
pub const TOP_VALUE: u32 = 1 << 24;

/// Fixed-point shift of prices (1/64 bit units).
pub const PRICE_SHIFT_BITS: u32 = 6;

/// Probabilities are bucketed by this many low bits for price lookup.
const NUM_MOVE_REDUCING_BITS: u32 = 2;

const PRICE_TABLE_SIZE: usize = (BIT_MODEL_TOTAL >> NUM_MOVE_REDUCING_BITS) as usize;

/// Price lookup table indexed by `probability >> NUM_MOVE_REDUCING_BITS`.
const PROB_PRICES: [u32; PRICE_TABLE_SIZE] = {
    let mut table = [0u32; PRICE_TABLE_SIZE];
    let num_bits = NUM_BIT_MODEL_TOTAL_BITS - NUM_MOVE_REDUCING_BITS;
    let mut i = num_bits as i32 - 1;
    while i >= 0 {
        let start = 1u32 << (num_bits - i as u32 - 1);
        let end = 1u32 << (num_bits - i as u32);
        let mut j = start;
        while j < end {
            table[j as usize] = ((i as u32) << PRICE_SHIFT_BITS)
                + (((end - j) << PRICE_SHIFT_BITS) >> (num_bits - i as u32 - 1));
            j += 1;
        }
        i -= 1;
    }
    table
};

/// Price of coding `bit` against probability `prob`.
#[inline]
pub fn price(prob: u16, bit: u32) -> u32 {
    let prob = prob as u32;
    let index = ((prob.wrapping_sub(bit)) ^ (0u32.wrapping_sub(bit))) & (BIT_MODEL_TOTAL - 1);
    PROB_PRICES[(index >> NUM_MOVE_REDUCING_BITS) as usize]
}

/// Price of coding a zero bit.
#[inline]
pub fn price0(prob: u16) -> u32 {
    PROB_PRICES[(prob as u32 >> NUM_MOVE_REDUCING_BITS) as usize]
}

/// Price of coding a one bit.
#[inline]
pub fn price1(prob: u16) -> u32 {
    PROB_PRICES[((BIT_MODEL_TOTAL - prob as u32) >> NUM_MOVE_REDUCING_BITS) as usize]
}

/// Price of `num_bits` direct (50/50) bits.
#[inline]
pub fn direct_bits_price(num_bits: u32) -> u32 {
    num_bits << PRICE_SHIFT_BITS
}

/// Reset a probability array to the midpoint.
pub fn init_probs(probs: &mut [u16]) {
    probs.fill(PROB_INIT);
}
