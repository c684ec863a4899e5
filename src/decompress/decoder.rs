//! LZMA stream decoder.

use std::io::{Read, Write};

use super::out_window::OutWindow;
use super::{DecompressError, Result};
use crate::constants::{
    footer_bits, len_to_pos_state, slot_base, END_MARKER_DISTANCE, END_POS_MODEL_INDEX,
    LITERAL_CODER_SIZE, MATCH_MIN_LEN, NUM_ALIGN_BITS, NUM_HIGH_LEN_BITS, NUM_LEN_TO_POS_STATES,
    NUM_LIT_CONTEXT_BITS_MAX, NUM_LIT_POS_STATES_BITS_MAX, NUM_LOW_LEN_BITS, NUM_LOW_LEN_SYMBOLS,
    NUM_MID_LEN_BITS, NUM_MID_LEN_SYMBOLS, NUM_POS_SLOT_BITS, NUM_POS_SPECIAL,
    NUM_POS_STATES_BITS_ENCODING_MAX, NUM_POS_STATES_BITS_MAX, NUM_POS_STATES_MAX,
    NUM_REP_DISTANCES, NUM_STATES, START_POS_MODEL_INDEX,
};
use crate::error::LzmaError;
use crate::parsing::LzmaProperties;
use crate::rangecoder::{bit_tree, init_probs, BitTree, RangeDecoder, PROB_INIT};
use crate::state::State;

/// Smallest window allocated regardless of the dictionary size.
const MIN_WINDOW_SIZE: u32 = 1 << 12;

struct LenDecoder {
    choice: [u16; 2],
    low: Vec<BitTree>,
    mid: Vec<BitTree>,
    high: BitTree,
}

impl LenDecoder {
    fn new() -> Self {
        Self {
            choice: [PROB_INIT; 2],
            low: (0..NUM_POS_STATES_MAX).map(|_| BitTree::new(NUM_LOW_LEN_BITS)).collect(),
            mid: (0..NUM_POS_STATES_MAX).map(|_| BitTree::new(NUM_MID_LEN_BITS)).collect(),
            high: BitTree::new(NUM_HIGH_LEN_BITS),
        }
    }

    fn init(&mut self) {
        init_probs(&mut self.choice);
        for tree in self.low.iter_mut().chain(self.mid.iter_mut()) {
            tree.init();
        }
        self.high.init();
    }

    /// Decode a length symbol (length minus 2).
    fn decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>, pos_state: usize) -> Result<u32> {
        if rc.decode_bit(&mut self.choice[0])? == 0 {
            return self.low[pos_state].decode(rc);
        }
        if rc.decode_bit(&mut self.choice[1])? == 0 {
            return Ok(NUM_LOW_LEN_SYMBOLS + self.mid[pos_state].decode(rc)?);
        }
        Ok(NUM_LOW_LEN_SYMBOLS + NUM_MID_LEN_SYMBOLS + self.high.decode(rc)?)
    }
}

struct LiteralDecoder {
    probs: Vec<u16>,
    lc: u32,
    pos_mask: u32,
}

impl LiteralDecoder {
    fn new(lc: u32, lp: u32) -> Self {
        Self {
            probs: vec![PROB_INIT; (1usize << (lc + lp)) * LITERAL_CODER_SIZE],
            lc,
            pos_mask: (1 << lp) - 1,
        }
    }

    fn probs(&mut self, position: u64, prev_byte: u8) -> &mut [u16] {
        let context = (((position as u32) & self.pos_mask) << self.lc)
            + ((prev_byte as u32) >> (8 - self.lc));
        let base = context as usize * LITERAL_CODER_SIZE;
        &mut self.probs[base..base + LITERAL_CODER_SIZE]
    }

    fn decode<R: Read>(
        &mut self,
        rc: &mut RangeDecoder<R>,
        position: u64,
        prev_byte: u8,
    ) -> Result<u8> {
        let probs = self.probs(position, prev_byte);
        let mut symbol = 1usize;
        while symbol < 0x100 {
            symbol = (symbol << 1) | rc.decode_bit(&mut probs[symbol])? as usize;
        }
        Ok(symbol as u8)
    }

    /// Decode with the byte at rep0 as context until the first mismatch.
    fn decode_matched<R: Read>(
        &mut self,
        rc: &mut RangeDecoder<R>,
        position: u64,
        prev_byte: u8,
        match_byte: u8,
    ) -> Result<u8> {
        let probs = self.probs(position, prev_byte);
        let mut symbol = 1usize;
        let mut match_byte = match_byte as usize;
        while symbol < 0x100 {
            let match_bit = (match_byte >> 7) & 1;
            match_byte <<= 1;
            let bit = rc.decode_bit(&mut probs[((1 + match_bit) << 8) + symbol])? as usize;
            symbol = (symbol << 1) | bit;
            if match_bit != bit {
                while symbol < 0x100 {
                    symbol = (symbol << 1) | rc.decode_bit(&mut probs[symbol])? as usize;
                }
                break;
            }
        }
        Ok(symbol as u8)
    }
}

#[inline]
fn complex(state: State, pos_state: usize) -> usize {
    (state.index() << NUM_POS_STATES_BITS_MAX) + pos_state
}

/// LZMA decoder for one set of properties.
///
/// Reusable: every call to [`code`](Decoder::code) starts from a fresh model.
pub struct Decoder {
    properties: LzmaProperties,
    is_match: [u16; NUM_STATES << NUM_POS_STATES_BITS_MAX],
    is_rep: [u16; NUM_STATES],
    is_rep_g0: [u16; NUM_STATES],
    is_rep_g1: [u16; NUM_STATES],
    is_rep_g2: [u16; NUM_STATES],
    is_rep0_long: [u16; NUM_STATES << NUM_POS_STATES_BITS_MAX],
    pos_slot: Vec<BitTree>,
    pos_special: [u16; NUM_POS_SPECIAL],
    pos_align: BitTree,
    len: LenDecoder,
    rep_len: LenDecoder,
    literal: LiteralDecoder,
    pos_mask: u32,
    /// Largest distance a match may use, plus one.
    dict_size_check: u32,
}

impl Decoder {
    /// Create a decoder; rejects `lc > 8`, `lp > 4` or `pb > 4`.
    pub fn new(properties: LzmaProperties) -> crate::Result<Self> {
        let (lc, lp, pb) = (
            properties.lc as u32,
            properties.lp as u32,
            properties.pb as u32,
        );
        if lc > NUM_LIT_CONTEXT_BITS_MAX
            || lp > NUM_LIT_POS_STATES_BITS_MAX
            || pb > NUM_POS_STATES_BITS_ENCODING_MAX
        {
            return Err(LzmaError::InvalidProperties(properties.lc_lp_pb_byte()));
        }

        Ok(Self {
            properties,
            is_match: [PROB_INIT; NUM_STATES << NUM_POS_STATES_BITS_MAX],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep_g0: [PROB_INIT; NUM_STATES],
            is_rep_g1: [PROB_INIT; NUM_STATES],
            is_rep_g2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [PROB_INIT; NUM_STATES << NUM_POS_STATES_BITS_MAX],
            pos_slot: (0..NUM_LEN_TO_POS_STATES)
                .map(|_| BitTree::new(NUM_POS_SLOT_BITS))
                .collect(),
            pos_special: [PROB_INIT; NUM_POS_SPECIAL],
            pos_align: BitTree::new(NUM_ALIGN_BITS),
            len: LenDecoder::new(),
            rep_len: LenDecoder::new(),
            literal: LiteralDecoder::new(lc, lp),
            pos_mask: (1 << pb) - 1,
            dict_size_check: properties.dictionary_size.max(1),
        })
    }

    pub fn properties(&self) -> &LzmaProperties {
        &self.properties
    }

    fn init(&mut self) {
        init_probs(&mut self.is_match);
        init_probs(&mut self.is_rep);
        init_probs(&mut self.is_rep_g0);
        init_probs(&mut self.is_rep_g1);
        init_probs(&mut self.is_rep_g2);
        init_probs(&mut self.is_rep0_long);
        init_probs(&mut self.pos_special);
        init_probs(&mut self.literal.probs);
        for tree in &mut self.pos_slot {
            tree.init();
        }
        self.pos_align.init();
        self.len.init();
        self.rep_len.init();
    }

    /// Decode raw LZMA data from `input` into `output`.
    ///
    /// With `uncompressed_size` set, decoding stops after that many bytes and
    /// a trailing end marker, if any, is left unread. Without it the stream
    /// must end with an end marker. Returns the number of bytes written.
    pub fn code<R: Read, W: Write>(
        &mut self,
        input: R,
        output: &mut W,
        uncompressed_size: Option<u64>,
    ) -> crate::Result<u64> {
        log::debug!(
            "decoding: lc={} lp={} pb={} dictionary={} size={:?}",
            self.properties.lc,
            self.properties.lp,
            self.properties.pb,
            self.properties.dictionary_size,
            uncompressed_size
        );
        self.init();
        let rc = RangeDecoder::new(input)?;
        let window_size = self.dict_size_check.max(MIN_WINDOW_SIZE) as usize;
        let mut window = OutWindow::new(output, window_size);

        let result = self.decode_symbols(rc, &mut window, uncompressed_size);
        let written = match result {
            Err(DecompressError::UnexpectedEof) if uncompressed_size.is_none() => {
                Err(DecompressError::MissingEndMarker)
            }
            other => other,
        }?;
        window.flush()?;
        log::debug!("decoded {} bytes", written);
        Ok(written)
    }

    fn decode_symbols<R: Read, W: Write>(
        &mut self,
        mut rc: RangeDecoder<R>,
        window: &mut OutWindow<&mut W>,
        uncompressed_size: Option<u64>,
    ) -> Result<u64> {
        let mut state = State::new();
        let mut reps = [0u32; NUM_REP_DISTANCES];

        loop {
            let position = window.total();
            if uncompressed_size.is_some_and(|size| position >= size) {
                return Ok(position);
            }
            let pos_state = (position as u32 & self.pos_mask) as usize;

            if rc.decode_bit(&mut self.is_match[complex(state, pos_state)])? == 0 {
                let prev_byte = if window.is_empty() { 0 } else { window.get_byte(0) };
                let byte = if state.is_char() {
                    self.literal.decode(&mut rc, position, prev_byte)?
                } else {
                    let match_byte = window.get_byte(reps[0]);
                    self.literal
                        .decode_matched(&mut rc, position, prev_byte, match_byte)?
                };
                window.put_byte(byte)?;
                state.update_literal();
                continue;
            }

            let len = if rc.decode_bit(&mut self.is_rep[state.index()])? == 1 {
                if window.is_empty() {
                    return Err(DecompressError::InvalidDistance {
                        distance: reps[0],
                        position,
                    });
                }
                let s = state.index();
                if rc.decode_bit(&mut self.is_rep_g0[s])? == 0 {
                    if rc.decode_bit(&mut self.is_rep0_long[complex(state, pos_state)])? == 0 {
                        state.update_short_rep();
                        let byte = window.get_byte(reps[0]);
                        window.put_byte(byte)?;
                        continue;
                    }
                } else {
                    let distance = if rc.decode_bit(&mut self.is_rep_g1[s])? == 0 {
                        reps[1]
                    } else {
                        let distance = if rc.decode_bit(&mut self.is_rep_g2[s])? == 0 {
                            reps[2]
                        } else {
                            let distance = reps[3];
                            reps[3] = reps[2];
                            distance
                        };
                        reps[2] = reps[1];
                        distance
                    };
                    reps[1] = reps[0];
                    reps[0] = distance;
                }
                let len = self.rep_len.decode(&mut rc, pos_state)? + MATCH_MIN_LEN;
                state.update_rep();
                len
            } else {
                reps.copy_within(0..3, 1);
                let len = self.len.decode(&mut rc, pos_state)? + MATCH_MIN_LEN;
                state.update_match();
                reps[0] = self.decode_distance(&mut rc, len)?;

                if reps[0] == END_MARKER_DISTANCE {
                    if !rc.is_finished_ok() {
                        log::trace!("end marker reached with non-zero range code");
                    }
                    return match uncompressed_size {
                        Some(expected) => Err(DecompressError::IncompleteData {
                            expected,
                            actual: position,
                        }),
                        None => Ok(position),
                    };
                }
                if reps[0] as u64 >= position || reps[0] >= self.dict_size_check {
                    return Err(DecompressError::InvalidDistance {
                        distance: reps[0],
                        position,
                    });
                }
                len
            };

            // A match running past the declared size is cut at the size.
            let len = match uncompressed_size {
                Some(size) => len.min((size - position).min(u32::MAX as u64) as u32),
                None => len,
            };
            window.copy_match(reps[0], len)?;
        }
    }

    fn decode_distance<R: Read>(&mut self, rc: &mut RangeDecoder<R>, len: u32) -> Result<u32> {
        let slot = self.pos_slot[len_to_pos_state(len)].decode(rc)?;
        if slot < START_POS_MODEL_INDEX {
            return Ok(slot);
        }
        let footer = footer_bits(slot);
        let base = slot_base(slot);
        if slot < END_POS_MODEL_INDEX {
            let reduced = bit_tree::reverse_decode(
                &mut self.pos_special,
                (base - slot) as usize,
                rc,
                footer,
            )?;
            Ok(base + reduced)
        } else {
            let high = rc.decode_direct_bits(footer - NUM_ALIGN_BITS)? << NUM_ALIGN_BITS;
            let low = self.pos_align.reverse_decode(rc)?;
            Ok(base + high + low)
        }
    }
}
