//! Optimal parser.
//!
//! A shortest-path search over the next few kilobytes of input. Node `i` of
//! the arena stands for "`i` bytes past the committed position" and records
//! the cheapest known way to get there: its price, the node it came from, the
//! token that made the step, and the state and rep distances at the end of
//! that path.
//!
//! The search advances `cur` one node at a time. At each node it relaxes the
//! edges leaving it: a literal, a short rep, a rep of every usable length for
//! each of the four distances, a match of every length the finder reported,
//! and the two-step combinations "literal then rep0" and "rep/match, literal,
//! then rep0". When `cur` reaches the horizon, [`Optimizer::backward`]
//! reverses the winning chain in place so the block coder can replay it
//! front to back, one token per call.
//!
//! | Step | Price compared with |
//! |------|---------------------|
//! | literal, rep, match | `<` |
//! | short rep during the search | `<=` (ties go to the short rep) |
//! | short rep at the first node | `<` |

use std::io;

use crate::constants::{MATCH_MAX_LEN, MATCH_MIN_LEN, NUM_REP_DISTANCES};
use crate::lz::{Match, MatchFinder};
use crate::state::State;

use super::model::ContextModel;

/// Size of the node arena, and so the furthest the parser looks ahead.
pub const NUM_OPTS: usize = 1 << 12;

const INFINITY_PRICE: u32 = 0xFFF_FFFF;

/// The token that leads into a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Back {
    #[default]
    Literal,
    /// Reuse of rep distance `n`. With length 1 and `n == 0` this is a short rep.
    Rep(usize),
    /// New match; the distance is zero-based.
    Match(u32),
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    state: State,
    /// The step into this node is a literal followed by rep0.
    prev1_is_char: bool,
    /// ... and that literal itself follows a rep or match.
    prev2: bool,
    pos_prev2: usize,
    back_prev2: Back,
    price: u32,
    pos_prev: usize,
    back_prev: Back,
    backs: [u32; NUM_REP_DISTANCES],
}

impl Node {
    fn make_as_char(&mut self) {
        self.back_prev = Back::Literal;
        self.prev1_is_char = false;
    }

    fn make_as_short_rep(&mut self) {
        self.back_prev = Back::Rep(0);
        self.prev1_is_char = false;
    }

    fn is_short_rep(&self) -> bool {
        self.back_prev == Back::Rep(0)
    }
}

/// Coder state at the committed position.
#[derive(Debug, Clone, Copy)]
pub struct Committed<'a> {
    pub state: State,
    pub prev_byte: u8,
    pub reps: &'a [u32; NUM_REP_DISTANCES],
    pub position: u64,
}

pub struct Optimizer {
    nodes: Vec<Node>,
    end_index: usize,
    current_index: usize,
    longest_match_found: bool,
    longest_match_len: u32,
    matches: Vec<Match>,
    fast_bytes: u32,
    pos_state_mask: u32,
    /// Bytes the match finder is ahead of the committed position.
    pub additional_offset: u32,
}

impl Optimizer {
    pub fn new(fast_bytes: u32, pb: u32) -> Self {
        Self {
            nodes: vec![Node::default(); NUM_OPTS],
            end_index: 0,
            current_index: 0,
            longest_match_found: false,
            longest_match_len: 0,
            matches: Vec::with_capacity(MATCH_MAX_LEN as usize),
            fast_bytes,
            pos_state_mask: (1 << pb) - 1,
            additional_offset: 0,
        }
    }

    pub fn reset(&mut self) {
        self.end_index = 0;
        self.current_index = 0;
        self.longest_match_found = false;
        self.longest_match_len = 0;
        self.matches.clear();
        self.additional_offset = 0;
    }

    #[inline]
    fn pos_state(&self, position: u64) -> usize {
        (position as u32 & self.pos_state_mask) as usize
    }

    /// Fetch the matches at the finder's position and advance it.
    ///
    /// Returns the longest length, extended past `fast_bytes` when the finder
    /// stopped there.
    pub fn read_match_distances<M: MatchFinder>(&mut self, mf: &mut M) -> io::Result<u32> {
        mf.find_matches(&mut self.matches)?;
        let mut len = 0;
        if let Some(longest) = self.matches.last() {
            len = longest.len;
            if len == self.fast_bytes {
                len += mf.match_len(len as i32 - 1, longest.dist, MATCH_MAX_LEN - len);
            }
        }
        self.additional_offset += 1;
        Ok(len)
    }

    fn move_pos<M: MatchFinder>(&mut self, mf: &mut M, num: u32) -> io::Result<()> {
        if num > 0 {
            mf.skip(num)?;
            self.additional_offset += num;
        }
        Ok(())
    }

    fn extend_horizon(&mut self, len_end: &mut usize, target: usize) {
        while *len_end < target {
            *len_end += 1;
            self.nodes[*len_end].price = INFINITY_PRICE;
        }
    }

    /// Next token to emit at the committed position: `(length, token)`.
    pub fn get_optimum<M: MatchFinder>(
        &mut self,
        mf: &mut M,
        model: &ContextModel,
        at: Committed<'_>,
    ) -> io::Result<(u32, Back)> {
        if self.end_index != self.current_index {
            let node = self.nodes[self.current_index];
            let len = (node.pos_prev - self.current_index) as u32;
            self.current_index = node.pos_prev;
            return Ok((len, node.back_prev));
        }
        self.current_index = 0;
        self.end_index = 0;

        let len_main = if self.longest_match_found {
            self.longest_match_found = false;
            self.longest_match_len
        } else {
            self.read_match_distances(mf)?
        };

        if mf.available_bytes() + 1 < 2 {
            return Ok((1, Back::Literal));
        }

        let state = at.state;
        let mut reps = *at.reps;
        let mut rep_lens = [0u32; NUM_REP_DISTANCES];
        let mut rep_max = 0;
        for i in 0..NUM_REP_DISTANCES {
            rep_lens[i] = mf.match_len(-1, reps[i], MATCH_MAX_LEN);
            if rep_lens[i] > rep_lens[rep_max] {
                rep_max = i;
            }
        }
        if rep_lens[rep_max] >= self.fast_bytes {
            let len = rep_lens[rep_max];
            self.move_pos(mf, len - 1)?;
            return Ok((len, Back::Rep(rep_max)));
        }
        if len_main >= self.fast_bytes {
            let dist = self.matches.last().map_or(0, |m| m.dist);
            self.move_pos(mf, len_main - 1)?;
            return Ok((len_main, Back::Match(dist)));
        }

        let mut current_byte = mf.index_byte(-1);
        let mut match_byte = mf.index_byte(-(reps[0] as i32) - 2);

        if len_main < 2 && current_byte != match_byte && rep_lens[rep_max] < 2 {
            return Ok((1, Back::Literal));
        }

        self.nodes[0].state = state;
        let mut position = at.position;
        let mut pos_state = self.pos_state(position);

        self.nodes[1].price = model.is_match_price(state, pos_state, 0)
            + model
                .literal
                .price(position, at.prev_byte, !state.is_char(), match_byte, current_byte);
        self.nodes[1].make_as_char();

        let mut match_price = model.is_match_price(state, pos_state, 1);
        let mut rep_match_price = match_price + model.is_rep_price(state, 1);

        if match_byte == current_byte {
            let short_rep_price = rep_match_price + model.rep_len1_price(state, pos_state);
            if short_rep_price < self.nodes[1].price {
                self.nodes[1].price = short_rep_price;
                self.nodes[1].make_as_short_rep();
            }
        }

        let mut len_end = len_main.max(rep_lens[rep_max]) as usize;
        if len_end < 2 {
            return Ok((1, self.nodes[1].back_prev));
        }

        self.nodes[1].pos_prev = 0;
        self.nodes[0].backs = reps;
        for node in &mut self.nodes[2..=len_end] {
            node.price = INFINITY_PRICE;
        }

        for (i, &rep_len) in rep_lens.iter().enumerate() {
            if rep_len < 2 {
                continue;
            }
            let price = rep_match_price + model.pure_rep_price(i, state, pos_state);
            for len in (2..=rep_len).rev() {
                let total = price + model.rep_len.price(len - MATCH_MIN_LEN, pos_state);
                let node = &mut self.nodes[len as usize];
                if total < node.price {
                    node.price = total;
                    node.pos_prev = 0;
                    node.back_prev = Back::Rep(i);
                    node.prev1_is_char = false;
                }
            }
        }

        let normal_match_price = match_price + model.is_rep_price(state, 0);
        let mut len = if rep_lens[0] >= 2 { rep_lens[0] + 1 } else { 2 };
        if len <= len_main {
            let mut offs = 0;
            while len > self.matches[offs].len {
                offs += 1;
            }
            loop {
                let distance = self.matches[offs].dist;
                let total = normal_match_price + model.pos_len_price(distance, len, pos_state);
                let node = &mut self.nodes[len as usize];
                if total < node.price {
                    node.price = total;
                    node.pos_prev = 0;
                    node.back_prev = Back::Match(distance);
                    node.prev1_is_char = false;
                }
                if len == self.matches[offs].len {
                    offs += 1;
                    if offs == self.matches.len() {
                        break;
                    }
                }
                len += 1;
            }
        }

        let mut cur = 0usize;
        loop {
            cur += 1;
            if cur == len_end {
                return Ok(self.backward(cur));
            }
            let mut new_len = self.read_match_distances(mf)?;
            if new_len >= self.fast_bytes {
                self.longest_match_len = new_len;
                self.longest_match_found = true;
                return Ok(self.backward(cur));
            }
            position += 1;

            // Rebuild the state and rep distances at `cur` from the path into it.
            let node = self.nodes[cur];
            let mut pos_prev = node.pos_prev;
            let mut state;
            if node.prev1_is_char {
                pos_prev -= 1;
                if node.prev2 {
                    state = self.nodes[node.pos_prev2].state;
                    if matches!(node.back_prev2, Back::Rep(_)) {
                        state.update_rep();
                    } else {
                        state.update_match();
                    }
                } else {
                    state = self.nodes[pos_prev].state;
                }
                state.update_literal();
            } else {
                state = self.nodes[pos_prev].state;
            }

            if pos_prev == cur - 1 {
                if node.is_short_rep() {
                    state.update_short_rep();
                } else {
                    state.update_literal();
                }
                reps = self.nodes[pos_prev].backs;
            } else {
                let back = if node.prev1_is_char && node.prev2 {
                    pos_prev = node.pos_prev2;
                    state.update_rep();
                    node.back_prev2
                } else {
                    if matches!(node.back_prev, Back::Rep(_)) {
                        state.update_rep();
                    } else {
                        state.update_match();
                    }
                    node.back_prev
                };
                let backs = self.nodes[pos_prev].backs;
                reps = match back {
                    Back::Rep(index) => {
                        let mut rotated = backs;
                        rotated.copy_within(0..index, 1);
                        rotated[0] = backs[index];
                        rotated
                    }
                    Back::Match(distance) => [distance, backs[0], backs[1], backs[2]],
                    Back::Literal => backs,
                };
            }
            self.nodes[cur].state = state;
            self.nodes[cur].backs = reps;
            let cur_price = self.nodes[cur].price;

            current_byte = mf.index_byte(-1);
            match_byte = mf.index_byte(-(reps[0] as i32) - 2);
            pos_state = self.pos_state(position);

            let cur_and1_price = cur_price
                + model.is_match_price(state, pos_state, 0)
                + model.literal.price(
                    position,
                    mf.index_byte(-2),
                    !state.is_char(),
                    match_byte,
                    current_byte,
                );

            let mut next_is_char = false;
            {
                let next = &mut self.nodes[cur + 1];
                if cur_and1_price < next.price {
                    next.price = cur_and1_price;
                    next.pos_prev = cur;
                    next.make_as_char();
                    next_is_char = true;
                }
            }

            match_price = cur_price + model.is_match_price(state, pos_state, 1);
            rep_match_price = match_price + model.is_rep_price(state, 1);

            {
                let next = &mut self.nodes[cur + 1];
                if match_byte == current_byte && !(next.pos_prev < cur && next.back_prev == Back::Rep(0))
                {
                    let short_rep_price = rep_match_price + model.rep_len1_price(state, pos_state);
                    if short_rep_price <= next.price {
                        next.price = short_rep_price;
                        next.pos_prev = cur;
                        next.make_as_short_rep();
                        next_is_char = true;
                    }
                }
            }

            let num_available_full = (mf.available_bytes() + 1).min((NUM_OPTS - 1 - cur) as u32);
            if num_available_full < 2 {
                continue;
            }
            let num_available = num_available_full.min(self.fast_bytes);

            if !next_is_char && match_byte != current_byte {
                // Literal, then rep0.
                let limit = (num_available_full - 1).min(self.fast_bytes);
                let len_test2 = mf.match_len(0, reps[0], limit);
                if len_test2 >= 2 {
                    let mut state2 = state;
                    state2.update_literal();
                    let pos_state_next = self.pos_state(position + 1);
                    let next_rep_match_price = cur_and1_price
                        + model.is_match_price(state2, pos_state_next, 1)
                        + model.is_rep_price(state2, 1);
                    let offset = cur + 1 + len_test2 as usize;
                    self.extend_horizon(&mut len_end, offset);
                    let total =
                        next_rep_match_price + model.rep_price(0, len_test2, state2, pos_state_next);
                    let node = &mut self.nodes[offset];
                    if total < node.price {
                        node.price = total;
                        node.pos_prev = cur + 1;
                        node.back_prev = Back::Rep(0);
                        node.prev1_is_char = true;
                        node.prev2 = false;
                    }
                }
            }

            let mut start_len = 2;
            for rep_index in 0..NUM_REP_DISTANCES {
                let len_test = mf.match_len(-1, reps[rep_index], num_available);
                if len_test < 2 {
                    continue;
                }
                self.extend_horizon(&mut len_end, cur + len_test as usize);
                for len in (2..=len_test).rev() {
                    let total = rep_match_price + model.rep_price(rep_index, len, state, pos_state);
                    let node = &mut self.nodes[cur + len as usize];
                    if total < node.price {
                        node.price = total;
                        node.pos_prev = cur;
                        node.back_prev = Back::Rep(rep_index);
                        node.prev1_is_char = false;
                    }
                }

                if rep_index == 0 {
                    start_len = len_test + 1;
                }

                // Rep, literal, then rep0.
                if len_test < num_available_full {
                    let limit = (num_available_full - 1 - len_test).min(self.fast_bytes);
                    let len_test2 = mf.match_len(len_test as i32, reps[rep_index], limit);
                    if len_test2 >= 2 {
                        let mut state2 = state;
                        state2.update_rep();
                        let mut pos_state_next = self.pos_state(position + len_test as u64);
                        let lt = len_test as i32;
                        let cur_and_len_char_price = rep_match_price
                            + model.rep_price(rep_index, len_test, state, pos_state)
                            + model.is_match_price(state2, pos_state_next, 0)
                            + model.literal.price(
                                position + len_test as u64,
                                mf.index_byte(lt - 2),
                                true,
                                mf.index_byte(lt - 1 - (reps[rep_index] as i32 + 1)),
                                mf.index_byte(lt - 1),
                            );
                        state2.update_literal();
                        pos_state_next = self.pos_state(position + len_test as u64 + 1);
                        let next_rep_match_price = cur_and_len_char_price
                            + model.is_match_price(state2, pos_state_next, 1)
                            + model.is_rep_price(state2, 1);

                        let offset = cur + (len_test + 1 + len_test2) as usize;
                        self.extend_horizon(&mut len_end, offset);
                        let total = next_rep_match_price
                            + model.rep_price(0, len_test2, state2, pos_state_next);
                        let node = &mut self.nodes[offset];
                        if total < node.price {
                            node.price = total;
                            node.pos_prev = cur + len_test as usize + 1;
                            node.back_prev = Back::Rep(0);
                            node.prev1_is_char = true;
                            node.prev2 = true;
                            node.pos_prev2 = cur;
                            node.back_prev2 = Back::Rep(rep_index);
                        }
                    }
                }
            }

            if new_len > num_available {
                new_len = num_available;
                let keep = self
                    .matches
                    .iter()
                    .position(|m| m.len >= new_len)
                    .unwrap_or(self.matches.len() - 1);
                self.matches.truncate(keep + 1);
                self.matches[keep].len = new_len;
            }

            if new_len >= start_len {
                let normal_match_price = match_price + model.is_rep_price(state, 0);
                self.extend_horizon(&mut len_end, cur + new_len as usize);

                let mut offs = 0;
                while start_len > self.matches[offs].len {
                    offs += 1;
                }

                let mut len_test = start_len;
                loop {
                    let cur_back = self.matches[offs].dist;
                    let total = normal_match_price + model.pos_len_price(cur_back, len_test, pos_state);
                    {
                        let node = &mut self.nodes[cur + len_test as usize];
                        if total < node.price {
                            node.price = total;
                            node.pos_prev = cur;
                            node.back_prev = Back::Match(cur_back);
                            node.prev1_is_char = false;
                        }
                    }

                    if len_test == self.matches[offs].len {
                        // Match, literal, then rep0.
                        if len_test < num_available_full {
                            let limit = (num_available_full - 1 - len_test).min(self.fast_bytes);
                            let len_test2 = mf.match_len(len_test as i32, cur_back, limit);
                            if len_test2 >= 2 {
                                let mut state2 = state;
                                state2.update_match();
                                let mut pos_state_next = self.pos_state(position + len_test as u64);
                                let lt = len_test as i32;
                                let cur_and_len_char_price = total
                                    + model.is_match_price(state2, pos_state_next, 0)
                                    + model.literal.price(
                                        position + len_test as u64,
                                        mf.index_byte(lt - 2),
                                        true,
                                        mf.index_byte(lt - (cur_back as i32 + 1) - 1),
                                        mf.index_byte(lt - 1),
                                    );
                                state2.update_literal();
                                pos_state_next = self.pos_state(position + len_test as u64 + 1);
                                let next_rep_match_price = cur_and_len_char_price
                                    + model.is_match_price(state2, pos_state_next, 1)
                                    + model.is_rep_price(state2, 1);

                                let offset = cur + (len_test + 1 + len_test2) as usize;
                                self.extend_horizon(&mut len_end, offset);
                                let total2 = next_rep_match_price
                                    + model.rep_price(0, len_test2, state2, pos_state_next);
                                let node = &mut self.nodes[offset];
                                if total2 < node.price {
                                    node.price = total2;
                                    node.pos_prev = cur + len_test as usize + 1;
                                    node.back_prev = Back::Rep(0);
                                    node.prev1_is_char = true;
                                    node.prev2 = true;
                                    node.pos_prev2 = cur;
                                    node.back_prev2 = Back::Match(cur_back);
                                }
                            }
                        }
                        offs += 1;
                        if offs == self.matches.len() {
                            break;
                        }
                    }
                    len_test += 1;
                }
            }
        }
    }

    /// Reverse the predecessor chain ending at `cur` and return its first step.
    fn backward(&mut self, mut cur: usize) -> (u32, Back) {
        self.end_index = cur;
        let mut pos_mem = self.nodes[cur].pos_prev;
        let mut back_mem = self.nodes[cur].back_prev;
        loop {
            if self.nodes[cur].prev1_is_char {
                let node = self.nodes[cur];
                self.nodes[pos_mem].make_as_char();
                self.nodes[pos_mem].pos_prev = pos_mem - 1;
                if node.prev2 {
                    let before = &mut self.nodes[pos_mem - 1];
                    before.prev1_is_char = false;
                    before.pos_prev = node.pos_prev2;
                    before.back_prev = node.back_prev2;
                }
            }
            let pos_prev = pos_mem;
            let back_cur = back_mem;

            back_mem = self.nodes[pos_prev].back_prev;
            pos_mem = self.nodes[pos_prev].pos_prev;

            self.nodes[pos_prev].back_prev = back_cur;
            self.nodes[pos_prev].pos_prev = cur;
            cur = pos_prev;
            if cur == 0 {
                break;
            }
        }
        self.current_index = self.nodes[0].pos_prev;
        (self.current_index as u32, self.nodes[0].back_prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_relinks_path() {
        let mut opt = Optimizer::new(32, 2);
        // 0 --literal--> 1 --match(len 3)--> 4 --rep0(len 2)--> 6
        opt.nodes[1].pos_prev = 0;
        opt.nodes[1].back_prev = Back::Literal;
        opt.nodes[4].pos_prev = 1;
        opt.nodes[4].back_prev = Back::Match(10);
        opt.nodes[6].pos_prev = 4;
        opt.nodes[6].back_prev = Back::Rep(0);

        assert_eq!(opt.backward(6), (1, Back::Literal));
        let replay: Vec<(usize, Back)> = {
            let mut out = Vec::new();
            let mut at = opt.current_index;
            while at != opt.end_index {
                let node = opt.nodes[at];
                out.push((node.pos_prev - at, node.back_prev));
                at = node.pos_prev;
            }
            out
        };
        assert_eq!(replay, vec![(3, Back::Match(10)), (2, Back::Rep(0))]);
    }

    #[test]
    fn test_backward_expands_two_step_nodes() {
        let mut opt = Optimizer::new(32, 2);
        // 0 --rep1(len 2)--> 2 --literal--> 3 --rep0(len 4)--> 7, stored on node 7.
        opt.nodes[7].pos_prev = 3;
        opt.nodes[7].back_prev = Back::Rep(0);
        opt.nodes[7].prev1_is_char = true;
        opt.nodes[7].prev2 = true;
        opt.nodes[7].pos_prev2 = 0;
        opt.nodes[7].back_prev2 = Back::Rep(1);

        assert_eq!(opt.backward(7), (2, Back::Rep(1)));
        let second = opt.nodes[2];
        assert_eq!((second.pos_prev, second.back_prev), (3, Back::Literal));
        let third = opt.nodes[3];
        assert_eq!((third.pos_prev, third.back_prev), (7, Back::Rep(0)));
    }

    #[test]
    fn test_short_rep_flag() {
        let mut node = Node::default();
        node.make_as_short_rep();
        assert!(node.is_short_rep());
        node.make_as_char();
        assert!(!node.is_short_rep());
    }
}
