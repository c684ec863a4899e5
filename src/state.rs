//! Token-history automaton.
//!
//! | State | Last tokens |
//! |-------|-------------|
//! | 0 | lit, lit, lit |
//! | 1 | match, lit, lit |
//! | 2 | rep, lit, lit |
//! | 3 | short-rep, lit, lit |
//! | 4 | match, lit |
//! | 5 | rep, lit |
//! | 6 | short-rep, lit |
//! | 7 | lit, match |
//! | 8 | lit, rep |
//! | 9 | lit, short-rep |
//! | 10 | non-lit, match |
//! | 11 | non-lit, rep or short-rep |
//!
//! States below 7 end in a literal ("char states"). After any other state
//! the next literal is coded in matched mode.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(u8);

impl State {
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    #[inline]
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    #[inline]
    pub fn update_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }

    #[inline]
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    #[inline]
    pub fn is_char(self) -> bool {
        self.0 < 7
    }

    /// Every state, for exhaustive checks.
    #[cfg(test)]
    pub fn all() -> impl Iterator<Item = State> {
        (0..crate::constants::NUM_STATES as u8).map(State)
    }
}
