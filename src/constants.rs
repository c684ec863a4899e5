//! Model layout shared by the encoder and the decoder.
//!
//! ## Lengths
//!
//! | Range | Coding |
//! |-------|--------|
//! | 2..=9 | choice 0, 3-bit tree per `posState` |
//! | 10..=17 | choice 1/0, 3-bit tree per `posState` |
//! | 18..=273 | choice 1/1, shared 8-bit tree |
//!
//! ## Distances
//!
//! | Slot | Footer |
//! |------|--------|
//! | 0..=3 | none, the slot is the distance |
//! | 4..=13 | reverse tree per slot (`pos_special` probabilities) |
//! | 14..=63 | direct bits, then a shared 4-bit reverse align tree |

/// Number of recent distances kept for rep matches.
pub const NUM_REP_DISTANCES: usize = 4;

/// Number of states of the token-history automaton.
pub const NUM_STATES: usize = 12;

pub const NUM_POS_STATES_BITS_MAX: u32 = 4;
pub const NUM_POS_STATES_MAX: usize = 1 << NUM_POS_STATES_BITS_MAX;

/// Largest `lc` accepted in a header.
pub const NUM_LIT_CONTEXT_BITS_MAX: u32 = 8;
/// Largest `lp` accepted by the encoder.
pub const NUM_LIT_POS_STATES_BITS_MAX: u32 = 4;
/// Largest `pb` accepted anywhere.
pub const NUM_POS_STATES_BITS_ENCODING_MAX: u32 = 4;

pub const MATCH_MIN_LEN: u32 = 2;
pub const MATCH_MAX_LEN: u32 = 273;

pub const NUM_LOW_LEN_BITS: u32 = 3;
pub const NUM_MID_LEN_BITS: u32 = 3;
pub const NUM_HIGH_LEN_BITS: u32 = 8;
pub const NUM_LOW_LEN_SYMBOLS: u32 = 1 << NUM_LOW_LEN_BITS;
pub const NUM_MID_LEN_SYMBOLS: u32 = 1 << NUM_MID_LEN_BITS;
pub const NUM_LEN_SYMBOLS: u32 =
    NUM_LOW_LEN_SYMBOLS + NUM_MID_LEN_SYMBOLS + (1 << NUM_HIGH_LEN_BITS);

pub const NUM_LEN_TO_POS_STATES: usize = 4;
pub const NUM_POS_SLOT_BITS: u32 = 6;

pub const START_POS_MODEL_INDEX: u32 = 4;
pub const END_POS_MODEL_INDEX: u32 = 14;
pub const NUM_FULL_DISTANCES: u32 = 1 << (END_POS_MODEL_INDEX >> 1);
/// Probabilities for the reverse-tree footers of slots 4..=13.
pub const NUM_POS_SPECIAL: usize = (NUM_FULL_DISTANCES - END_POS_MODEL_INDEX) as usize;

pub const NUM_ALIGN_BITS: u32 = 4;
pub const ALIGN_TABLE_SIZE: u32 = 1 << NUM_ALIGN_BITS;
pub const ALIGN_MASK: u32 = ALIGN_TABLE_SIZE - 1;

/// Probabilities per literal coder: plain tree plus the two matched halves.
pub const LITERAL_CODER_SIZE: usize = 0x300;

/// Distance value written by the end-of-stream marker.
pub const END_MARKER_DISTANCE: u32 = 0xFFFF_FFFF;

/// Slot lookup for distances below 2^11.
static FAST_POS: [u8; 1 << 11] = {
    let mut table = [0u8; 1 << 11];
    table[1] = 1;
    let mut c = 2usize;
    let mut slot = 2u32;
    while slot < 22 {
        let k = 1usize << ((slot >> 1) - 1);
        let mut j = 0;
        while j < k {
            table[c] = slot as u8;
            c += 1;
            j += 1;
        }
        slot += 1;
    }
    table
};

/// Distance slot of `distance` (the zero-based distance).
#[inline]
pub fn pos_slot(distance: u32) -> u32 {
    if distance < 1 << 11 {
        return FAST_POS[distance as usize] as u32;
    }
    let bits = 31 - distance.leading_zeros();
    (bits << 1) | ((distance >> (bits - 1)) & 1)
}

/// Length bucket that selects the slot tree.
#[inline]
pub fn len_to_pos_state(len: u32) -> usize {
    let len = len - MATCH_MIN_LEN;
    if (len as usize) < NUM_LEN_TO_POS_STATES {
        len as usize
    } else {
        NUM_LEN_TO_POS_STATES - 1
    }
}

/// Number of footer bits below `slot` (valid for slots >= 4).
#[inline]
pub fn footer_bits(slot: u32) -> u32 {
    (slot >> 1) - 1
}

/// Smallest distance with the given slot (valid for slots >= 4).
#[inline]
pub fn slot_base(slot: u32) -> u32 {
    (2 | (slot & 1)) << footer_bits(slot)
}
