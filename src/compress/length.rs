//! Match length coder with per-`posState` price tables.

use crate::constants::{
    NUM_HIGH_LEN_BITS, NUM_LEN_SYMBOLS, NUM_LOW_LEN_BITS, NUM_LOW_LEN_SYMBOLS, NUM_MID_LEN_BITS,
    NUM_MID_LEN_SYMBOLS, NUM_POS_STATES_MAX,
};
use crate::rangecoder::{init_probs, price0, price1, BitTree, RangeEncoder, PROB_INIT};

/// Length coder: two choice bits select the low, mid or high tree.
pub struct LenEncoder {
    choice: [u16; 2],
    low: Vec<BitTree>,
    mid: Vec<BitTree>,
    high: BitTree,
    prices: Vec<u32>,
    table_size: u32,
    counters: [u32; NUM_POS_STATES_MAX],
}

impl LenEncoder {
    pub fn new() -> Self {
        Self {
            choice: [PROB_INIT; 2],
            low: (0..NUM_POS_STATES_MAX).map(|_| BitTree::new(NUM_LOW_LEN_BITS)).collect(),
            mid: (0..NUM_POS_STATES_MAX).map(|_| BitTree::new(NUM_MID_LEN_BITS)).collect(),
            high: BitTree::new(NUM_HIGH_LEN_BITS),
            prices: vec![0; NUM_LEN_SYMBOLS as usize * NUM_POS_STATES_MAX],
            table_size: 0,
            counters: [0; NUM_POS_STATES_MAX],
        }
    }

    pub fn init(&mut self, num_pos_states: usize) {
        init_probs(&mut self.choice);
        for pos_state in 0..num_pos_states {
            self.low[pos_state].init();
            self.mid[pos_state].init();
        }
        self.high.init();
    }

    /// Encode `symbol` (length minus 2) and count it against the price table.
    pub fn encode(&mut self, rc: &mut RangeEncoder, symbol: u32, pos_state: usize) {
        if symbol < NUM_LOW_LEN_SYMBOLS {
            rc.encode_bit(&mut self.choice[0], 0);
            self.low[pos_state].encode(rc, symbol);
        } else {
            rc.encode_bit(&mut self.choice[0], 1);
            let symbol = symbol - NUM_LOW_LEN_SYMBOLS;
            if symbol < NUM_MID_LEN_SYMBOLS {
                rc.encode_bit(&mut self.choice[1], 0);
                self.mid[pos_state].encode(rc, symbol);
            } else {
                rc.encode_bit(&mut self.choice[1], 1);
                self.high.encode(rc, symbol - NUM_MID_LEN_SYMBOLS);
            }
        }
        self.counters[pos_state] -= 1;
        if self.counters[pos_state] == 0 {
            self.update_table(pos_state);
        }
    }

    /// Price of `symbol` computed from the current probabilities.
    #[cfg(test)]
    pub fn direct_price(&self, symbol: u32, pos_state: usize) -> u32 {
        if symbol < NUM_LOW_LEN_SYMBOLS {
            return price0(self.choice[0]) + self.low[pos_state].price(symbol);
        }
        let a1 = price1(self.choice[0]);
        let symbol = symbol - NUM_LOW_LEN_SYMBOLS;
        if symbol < NUM_MID_LEN_SYMBOLS {
            a1 + price0(self.choice[1]) + self.mid[pos_state].price(symbol)
        } else {
            a1 + price1(self.choice[1]) + self.high.price(symbol - NUM_MID_LEN_SYMBOLS)
        }
    }

    /// Number of symbols kept in each price table.
    pub fn set_table_size(&mut self, table_size: u32) {
        self.table_size = table_size;
    }

    fn update_table(&mut self, pos_state: usize) {
        let a0 = price0(self.choice[0]);
        let a1 = price1(self.choice[0]);
        let b0 = a1 + price0(self.choice[1]);
        let b1 = a1 + price1(self.choice[1]);
        let start = pos_state * NUM_LEN_SYMBOLS as usize;
        for i in 0..self.table_size {
            self.prices[start + i as usize] = if i < NUM_LOW_LEN_SYMBOLS {
                a0 + self.low[pos_state].price(i)
            } else if i < NUM_LOW_LEN_SYMBOLS + NUM_MID_LEN_SYMBOLS {
                b0 + self.mid[pos_state].price(i - NUM_LOW_LEN_SYMBOLS)
            } else {
                b1 + self.high.price(i - NUM_LOW_LEN_SYMBOLS - NUM_MID_LEN_SYMBOLS)
            };
        }
        self.counters[pos_state] = self.table_size;
    }

    pub fn update_tables(&mut self, num_pos_states: usize) {
        for pos_state in 0..num_pos_states {
            self.update_table(pos_state);
        }
    }

    /// Cached price of `symbol`; valid for symbols below the table size.
    #[inline]
    pub fn price(&self, symbol: u32, pos_state: usize) -> u32 {
        self.prices[pos_state * NUM_LEN_SYMBOLS as usize + symbol as usize]
    }
}
