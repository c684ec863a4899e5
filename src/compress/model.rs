//! Probability model of the encoder and the prices derived from it.
//!
//! One struct owns every adaptive probability. The optimal parser reads it to
//! price candidate tokens; the block coder mutates it when a token is
//! committed. Nothing else holds a reference to it.

use crate::constants::{
    footer_bits, len_to_pos_state, pos_slot, slot_base, ALIGN_MASK, ALIGN_TABLE_SIZE,
    END_POS_MODEL_INDEX, MATCH_MIN_LEN, NUM_ALIGN_BITS, NUM_FULL_DISTANCES,
    NUM_LEN_TO_POS_STATES, NUM_POS_SLOT_BITS, NUM_POS_SPECIAL, NUM_POS_STATES_BITS_MAX,
    NUM_POS_STATES_MAX, NUM_STATES, START_POS_MODEL_INDEX,
};
use crate::rangecoder::{
    bit_tree, direct_bits_price, init_probs, price, price0, price1, BitTree, RangeEncoder,
    PROB_INIT,
};
use crate::state::State;

use super::length::LenEncoder;
use super::literal::LiteralEncoder;

/// Distance codes coded since the slot/distance prices were refreshed.
pub const DISTANCE_PRICE_REFRESH: u32 = 1 << 7;

pub struct ContextModel {
    pub is_match: [u16; NUM_STATES << NUM_POS_STATES_BITS_MAX],
    pub is_rep: [u16; NUM_STATES],
    pub is_rep_g0: [u16; NUM_STATES],
    pub is_rep_g1: [u16; NUM_STATES],
    pub is_rep_g2: [u16; NUM_STATES],
    pub is_rep0_long: [u16; NUM_STATES << NUM_POS_STATES_BITS_MAX],
    pub pos_slot: Vec<BitTree>,
    pub pos_special: [u16; NUM_POS_SPECIAL],
    pub pos_align: BitTree,
    pub len: LenEncoder,
    pub rep_len: LenEncoder,
    pub literal: LiteralEncoder,

    slot_prices: Vec<u32>,
    distance_prices: Vec<u32>,
    align_prices: [u32; ALIGN_TABLE_SIZE as usize],
    dist_table_size: u32,
    pub match_price_count: u32,
    pub align_price_count: u32,
}

#[inline]
fn complex(state: State, pos_state: usize) -> usize {
    (state.index() << NUM_POS_STATES_BITS_MAX) + pos_state
}

impl ContextModel {
    pub fn new(lc: u32, lp: u32, dist_table_size: u32) -> Self {
        Self {
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
            len: LenEncoder::new(),
            rep_len: LenEncoder::new(),
            literal: LiteralEncoder::new(lc, lp),
            slot_prices: vec![0; NUM_LEN_TO_POS_STATES << NUM_POS_SLOT_BITS],
            distance_prices: vec![0; NUM_LEN_TO_POS_STATES * NUM_FULL_DISTANCES as usize],
            align_prices: [0; ALIGN_TABLE_SIZE as usize],
            dist_table_size,
            match_price_count: 0,
            align_price_count: 0,
        }
    }

    /// Reset all probabilities and rebuild every price table.
    pub fn init(&mut self, num_pos_states: usize, len_table_size: u32) {
        init_probs(&mut self.is_match);
        init_probs(&mut self.is_rep);
        init_probs(&mut self.is_rep_g0);
        init_probs(&mut self.is_rep_g1);
        init_probs(&mut self.is_rep_g2);
        init_probs(&mut self.is_rep0_long);
        init_probs(&mut self.pos_special);
        for tree in &mut self.pos_slot {
            tree.init();
        }
        self.pos_align.init();
        self.literal.init();
        self.len.init(num_pos_states);
        self.rep_len.init(num_pos_states);

        self.fill_distances_prices();
        self.fill_align_prices();
        self.len.set_table_size(len_table_size);
        self.len.update_tables(num_pos_states);
        self.rep_len.set_table_size(len_table_size);
        self.rep_len.update_tables(num_pos_states);
    }

    // Prices

    #[inline]
    pub fn is_match_price(&self, state: State, pos_state: usize, bit: u32) -> u32 {
        price(self.is_match[complex(state, pos_state)], bit)
    }

    #[inline]
    pub fn is_rep_price(&self, state: State, bit: u32) -> u32 {
        price(self.is_rep[state.index()], bit)
    }

    /// Price of the rep-selection bits of a short rep (rep0, length 1).
    #[inline]
    pub fn rep_len1_price(&self, state: State, pos_state: usize) -> u32 {
        price0(self.is_rep_g0[state.index()])
            + price0(self.is_rep0_long[complex(state, pos_state)])
    }

    /// Price of the bits that select rep distance `rep_index` for a long rep.
    pub fn pure_rep_price(&self, rep_index: usize, state: State, pos_state: usize) -> u32 {
        let s = state.index();
        if rep_index == 0 {
            price0(self.is_rep_g0[s]) + price1(self.is_rep0_long[complex(state, pos_state)])
        } else {
            let mut total = price1(self.is_rep_g0[s]);
            if rep_index == 1 {
                total += price0(self.is_rep_g1[s]);
            } else {
                total += price1(self.is_rep_g1[s]);
                total += price(self.is_rep_g2[s], rep_index as u32 - 2);
            }
            total
        }
    }

    #[inline]
    pub fn rep_price(&self, rep_index: usize, len: u32, state: State, pos_state: usize) -> u32 {
        self.rep_len.price(len - MATCH_MIN_LEN, pos_state)
            + self.pure_rep_price(rep_index, state, pos_state)
    }

    /// Price of a new match: distance (zero-based) plus length.
    pub fn pos_len_price(&self, distance: u32, len: u32, pos_state: usize) -> u32 {
        let len_to_pos = len_to_pos_state(len);
        let distance_price = if distance < NUM_FULL_DISTANCES {
            self.distance_prices[len_to_pos * NUM_FULL_DISTANCES as usize + distance as usize]
        } else {
            self.slot_prices[(len_to_pos << NUM_POS_SLOT_BITS) + pos_slot(distance) as usize]
                + self.align_prices[(distance & ALIGN_MASK) as usize]
        };
        distance_price + self.len.price(len - MATCH_MIN_LEN, pos_state)
    }

    /// Price of `distance` computed from the probabilities, bypassing the
    /// cached tables.
    #[cfg(test)]
    pub fn direct_distance_price(&self, distance: u32, len: u32) -> u32 {
        let slot = pos_slot(distance);
        let mut total = self.pos_slot[len_to_pos_state(len)].price(slot);
        if slot >= START_POS_MODEL_INDEX {
            let footer = footer_bits(slot);
            let base = slot_base(slot);
            let reduced = distance - base;
            if slot < END_POS_MODEL_INDEX {
                total += bit_tree::reverse_price(
                    &self.pos_special,
                    (base - slot) as usize,
                    footer,
                    reduced,
                );
            } else {
                total += direct_bits_price(footer - NUM_ALIGN_BITS);
                total += self.pos_align.reverse_price(reduced & ALIGN_MASK);
            }
        }
        total
    }

    /// Rebuild the slot and full-distance price tables.
    pub fn fill_distances_prices(&mut self) {
        let mut footer_prices = [0u32; NUM_FULL_DISTANCES as usize];
        for distance in START_POS_MODEL_INDEX..NUM_FULL_DISTANCES {
            let slot = pos_slot(distance);
            let base = slot_base(slot);
            footer_prices[distance as usize] = bit_tree::reverse_price(
                &self.pos_special,
                (base - slot) as usize,
                footer_bits(slot),
                distance - base,
            );
        }

        let table_size = self.dist_table_size.min(1 << NUM_POS_SLOT_BITS);
        for len_to_pos in 0..NUM_LEN_TO_POS_STATES {
            let tree = &self.pos_slot[len_to_pos];
            let start = len_to_pos << NUM_POS_SLOT_BITS;
            for slot in 0..table_size {
                let mut slot_price = tree.price(slot);
                if slot >= END_POS_MODEL_INDEX {
                    slot_price += direct_bits_price(footer_bits(slot) - NUM_ALIGN_BITS);
                }
                self.slot_prices[start + slot as usize] = slot_price;
            }

            let start2 = len_to_pos * NUM_FULL_DISTANCES as usize;
            for distance in 0..NUM_FULL_DISTANCES {
                let slot_price = self.slot_prices[start + pos_slot(distance) as usize];
                self.distance_prices[start2 + distance as usize] =
                    slot_price + footer_prices[distance as usize];
            }
        }
        self.match_price_count = 0;
        log::trace!("distance prices refreshed");
    }

    pub fn fill_align_prices(&mut self) {
        for (i, slot) in self.align_prices.iter_mut().enumerate() {
            *slot = self.pos_align.reverse_price(i as u32);
        }
        self.align_price_count = 0;
    }

    /// Refresh whichever price tables have seen enough coded distances.
    pub fn refresh_prices(&mut self) {
        if self.match_price_count >= DISTANCE_PRICE_REFRESH {
            self.fill_distances_prices();
        }
        if self.align_price_count >= ALIGN_TABLE_SIZE {
            self.fill_align_prices();
        }
    }

    // Emission

    pub fn encode_is_match(&mut self, rc: &mut RangeEncoder, state: State, pos_state: usize, bit: u32) {
        rc.encode_bit(&mut self.is_match[complex(state, pos_state)], bit);
    }

    pub fn encode_is_rep(&mut self, rc: &mut RangeEncoder, state: State, bit: u32) {
        rc.encode_bit(&mut self.is_rep[state.index()], bit);
    }

    /// Emit the choice bits of a rep token (everything but the length).
    pub fn encode_rep_choice(
        &mut self,
        rc: &mut RangeEncoder,
        rep_index: usize,
        len: u32,
        state: State,
        pos_state: usize,
    ) {
        let s = state.index();
        self.encode_is_rep(rc, state, 1);
        if rep_index == 0 {
            rc.encode_bit(&mut self.is_rep_g0[s], 0);
            let long = (len != 1) as u32;
            rc.encode_bit(&mut self.is_rep0_long[complex(state, pos_state)], long);
        } else {
            rc.encode_bit(&mut self.is_rep_g0[s], 1);
            if rep_index == 1 {
                rc.encode_bit(&mut self.is_rep_g1[s], 0);
            } else {
                rc.encode_bit(&mut self.is_rep_g1[s], 1);
                rc.encode_bit(&mut self.is_rep_g2[s], rep_index as u32 - 2);
            }
        }
    }

    /// Emit slot and footer of `distance` for a match of `len` bytes.
    pub fn encode_distance(&mut self, rc: &mut RangeEncoder, distance: u32, len: u32) {
        let slot = pos_slot(distance);
        self.pos_slot[len_to_pos_state(len)].encode(rc, slot);
        if slot >= START_POS_MODEL_INDEX {
            let footer = footer_bits(slot);
            let base = slot_base(slot);
            let reduced = distance - base;
            if slot < END_POS_MODEL_INDEX {
                bit_tree::reverse_encode(
                    &mut self.pos_special,
                    (base - slot) as usize,
                    rc,
                    footer,
                    reduced,
                );
            } else {
                rc.encode_direct_bits(reduced >> NUM_ALIGN_BITS, footer - NUM_ALIGN_BITS);
                self.pos_align.reverse_encode(rc, reduced & ALIGN_MASK);
                self.align_price_count += 1;
            }
        }
        self.match_price_count += 1;
    }
}

/// Number of `posState` values for `pb`.
pub fn num_pos_states(pb: u32) -> usize {
    (1usize << pb).min(NUM_POS_STATES_MAX)
}
