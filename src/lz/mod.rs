//! LZ dictionary match finding.
//!
//! The optimal parser only talks to the [`MatchFinder`] trait. It asks for
//! the match candidates at the current position, measures matches against
//! specific past distances, and advances without searching when it has
//! already decided what to emit.
//!
//! [`BinTree`] is the provided implementation: a binary tree over the
//! dictionary window, keyed by a 2-byte hash ([`MatchFinderKind::Bt2`]) or a
//! mix of 2/3/4-byte hashes ([`MatchFinderKind::Bt4`]).

mod bin_tree;
mod window;

pub use bin_tree::BinTree;
pub use window::Window;

use std::io;

/// One match candidate: `len` bytes match `dist + 1` bytes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub len: u32,
    pub dist: u32,
}

/// Match finder flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchFinderKind {
    /// Binary tree keyed by the first two bytes.
    Bt2,
    /// Binary tree keyed by hashes of the first two, three and four bytes.
    #[default]
    Bt4,
}

impl MatchFinderKind {
    /// Number of bytes hashed into the main table.
    pub fn hash_bytes(self) -> u32 {
        match self {
            Self::Bt2 => 2,
            Self::Bt4 => 4,
        }
    }
}

/// Capability the optimal parser needs from a dictionary index.
///
/// Indexes passed to [`index_byte`](Self::index_byte) and
/// [`match_len`](Self::match_len) are relative to the finder's current
/// position and may be negative.
pub trait MatchFinder {
    /// Bytes between the current position and the end of buffered input.
    fn available_bytes(&self) -> u32;

    /// Byte at `index` relative to the current position.
    fn index_byte(&self, index: i32) -> u8;

    /// Length of the match at `index` against `distance + 1` bytes back,
    /// capped at `limit` and at the end of input.
    fn match_len(&self, index: i32, distance: u32, limit: u32) -> u32;

    /// Replace `matches` with the candidates at the current position and
    /// advance by one byte.
    ///
    /// Candidates are sorted by increasing length; each one's distance is
    /// the closest seen for that length.
    fn find_matches(&mut self, matches: &mut Vec<Match>) -> io::Result<()>;

    /// Advance by `num` bytes, indexing them without reporting matches.
    fn skip(&mut self, num: u32) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kind_is_bt4() {
        assert_eq!(MatchFinderKind::default(), MatchFinderKind::Bt4);
        assert_eq!(MatchFinderKind::Bt2.hash_bytes(), 2);
    }
}
