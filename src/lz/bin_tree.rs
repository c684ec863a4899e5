//! Binary-tree match finder.
//!
//! Every dictionary position is a node in a binary search tree ordered by the
//! bytes that follow it. The hash of the first bytes at the current position
//! selects the tree root; walking down finds progressively longer matches
//! and relinks the tree so that the current position becomes the new root.
//! `son` stores the left/right links of the last `cyclic_buffer_size`
//! positions.

use std::io::{self, Read};

use super::{Match, MatchFinder, MatchFinderKind, Window};
use crate::crc32::CRC32_TABLE;

const HASH2_SIZE: u32 = 1 << 10;
const HASH3_SIZE: u32 = 1 << 16;
const BT2_HASH_SIZE: u32 = 1 << 16;
const HASH3_OFFSET: u32 = HASH2_SIZE;
const START_MAX_LEN: u32 = 1;
const EMPTY_HASH_VALUE: u32 = 0;
const MAX_VAL_FOR_NORMALIZE: u32 = (1 << 30) - 1;

/// Binary-tree match finder over a [`Window`].
pub struct BinTree<R> {
    window: Window<R>,
    cyclic_buffer_pos: u32,
    cyclic_buffer_size: u32,
    match_max_len: u32,
    son: Vec<u32>,
    hash: Vec<u32>,
    cut_value: u32,
    hash_mask: u32,
    /// BT4: hash tables for 2 and 3 bytes sit in front of the main table.
    hash_array: bool,
    num_hash_direct_bytes: u32,
    min_match_check: u32,
    fix_hash_size: u32,
}

impl<R: Read> BinTree<R> {
    /// Build a finder reading from `source`.
    ///
    /// `history_size` is the dictionary size; `keep_add_before` and
    /// `keep_add_after` extend the window for the parser's lookahead.
    /// Matches are reported up to `match_max_len` bytes.
    pub fn new(
        kind: MatchFinderKind,
        source: R,
        history_size: u32,
        keep_add_before: u32,
        match_max_len: u32,
        keep_add_after: u32,
    ) -> io::Result<Self> {
        if history_size > MAX_VAL_FOR_NORMALIZE - 256 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "dictionary too large for match finder",
            ));
        }
        let hash_array = kind.hash_bytes() > 2;
        let (num_hash_direct_bytes, min_match_check, fix_hash_size) = if hash_array {
            (0, 4, HASH2_SIZE + HASH3_SIZE)
        } else {
            (2, 3, 0)
        };

        let reserve = (history_size + keep_add_before + match_max_len + keep_add_after) / 2 + 256;
        let window = Window::new(
            source,
            history_size + keep_add_before,
            match_max_len + keep_add_after,
            reserve,
        )?;

        let cyclic_buffer_size = history_size + 1;
        let (hash_mask, hash_size) = if hash_array {
            let mut hs = history_size.saturating_sub(1);
            hs |= hs >> 1;
            hs |= hs >> 2;
            hs |= hs >> 4;
            hs |= hs >> 8;
            hs >>= 1;
            hs |= 0xFFFF;
            if hs > 1 << 24 {
                hs >>= 1;
            }
            (hs, hs + 1 + fix_hash_size)
        } else {
            (0, BT2_HASH_SIZE)
        };

        let mut tree = Self {
            window,
            cyclic_buffer_pos: 0,
            cyclic_buffer_size,
            match_max_len,
            son: vec![EMPTY_HASH_VALUE; cyclic_buffer_size as usize * 2],
            hash: vec![EMPTY_HASH_VALUE; hash_size as usize],
            cut_value: 16 + (match_max_len >> 1),
            hash_mask,
            hash_array,
            num_hash_direct_bytes,
            min_match_check,
            fix_hash_size,
        };
        // Positions start at 1 so that 0 can mark an empty slot.
        tree.window.reduce_offsets(0u32.wrapping_sub(1));
        Ok(tree)
    }

    fn move_pos(&mut self) -> io::Result<()> {
        self.cyclic_buffer_pos += 1;
        if self.cyclic_buffer_pos >= self.cyclic_buffer_size {
            self.cyclic_buffer_pos = 0;
        }
        self.window.move_pos()?;
        if self.window.pos() == MAX_VAL_FOR_NORMALIZE {
            self.normalize();
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let sub_value = self.window.pos() - self.cyclic_buffer_size;
        normalize_links(&mut self.son, sub_value);
        normalize_links(&mut self.hash, sub_value);
        self.window.reduce_offsets(sub_value);
        log::trace!("match finder normalized by {}", sub_value);
    }

    /// Hash the bytes at `cur`. Returns (hash2, hash3, main hash).
    #[inline]
    fn hashes(&self, buffer: &[u8], cur: usize) -> (u32, u32, u32) {
        if self.hash_array {
            let mut temp = CRC32_TABLE[buffer[cur] as usize] ^ buffer[cur + 1] as u32;
            let hash2 = temp & (HASH2_SIZE - 1);
            temp ^= (buffer[cur + 2] as u32) << 8;
            let hash3 = temp & (HASH3_SIZE - 1);
            let main = (temp ^ (CRC32_TABLE[buffer[cur + 3] as usize] << 5)) & self.hash_mask;
            (hash2, hash3, main)
        } else {
            (0, 0, buffer[cur] as u32 ^ ((buffer[cur + 1] as u32) << 8))
        }
    }

    /// Bytes available for a match here, or `None` when too close to the end.
    fn len_limit(&self) -> Option<u32> {
        let available = self.window.available_bytes();
        if available >= self.match_max_len {
            Some(self.match_max_len)
        } else if available < self.min_match_check {
            None
        } else {
            Some(available)
        }
    }

    /// Walk the tree for the current position and relink it.
    ///
    /// With `matches`, every strictly longer match on the way is recorded.
    fn walk_tree(
        &mut self,
        mut cur_match: u32,
        len_limit: u32,
        mut matches: Option<&mut Vec<Match>>,
        mut max_len: u32,
    ) {
        let pos = self.window.pos();
        let match_min_pos = pos.saturating_sub(self.cyclic_buffer_size);
        let offset = self.window.buffer_offset();
        let buffer = self.window.buffer();
        let cur = offset.wrapping_add(pos) as usize;

        let mut ptr0 = ((self.cyclic_buffer_pos << 1) + 1) as usize;
        let mut ptr1 = (self.cyclic_buffer_pos << 1) as usize;
        let mut len0 = self.num_hash_direct_bytes;
        let mut len1 = self.num_hash_direct_bytes;
        let mut count = self.cut_value;

        loop {
            if cur_match <= match_min_pos || count == 0 {
                self.son[ptr0] = EMPTY_HASH_VALUE;
                self.son[ptr1] = EMPTY_HASH_VALUE;
                break;
            }
            count -= 1;

            let delta = pos - cur_match;
            let cyclic_pos = if delta <= self.cyclic_buffer_pos {
                self.cyclic_buffer_pos - delta
            } else {
                self.cyclic_buffer_pos + self.cyclic_buffer_size - delta
            };
            let cyclic_pos = (cyclic_pos << 1) as usize;
            let pby1 = offset.wrapping_add(cur_match) as usize;

            let mut len = len0.min(len1);
            if buffer[pby1 + len as usize] == buffer[cur + len as usize] {
                len += 1;
                while len != len_limit && buffer[pby1 + len as usize] == buffer[cur + len as usize] {
                    len += 1;
                }
                if max_len < len {
                    max_len = len;
                    if let Some(out) = matches.as_deref_mut() {
                        out.push(Match { len, dist: delta - 1 });
                    }
                }
                if len == len_limit {
                    self.son[ptr1] = self.son[cyclic_pos];
                    self.son[ptr0] = self.son[cyclic_pos + 1];
                    break;
                }
            }

            if buffer[pby1 + len as usize] < buffer[cur + len as usize] {
                self.son[ptr1] = cur_match;
                ptr1 = cyclic_pos + 1;
                cur_match = self.son[ptr1];
                len1 = len;
            } else {
                self.son[ptr0] = cur_match;
                ptr0 = cyclic_pos;
                cur_match = self.son[ptr0];
                len0 = len;
            }
        }
    }
}

impl<R: Read> MatchFinder for BinTree<R> {
    fn available_bytes(&self) -> u32 {
        self.window.available_bytes()
    }

    fn index_byte(&self, index: i32) -> u8 {
        self.window.index_byte(index)
    }

    fn match_len(&self, index: i32, distance: u32, limit: u32) -> u32 {
        self.window.match_len(index, distance, limit)
    }

    fn find_matches(&mut self, matches: &mut Vec<Match>) -> io::Result<()> {
        matches.clear();
        let len_limit = match self.len_limit() {
            Some(limit) => limit,
            None => return self.move_pos(),
        };

        let pos = self.window.pos();
        let match_min_pos = pos.saturating_sub(self.cyclic_buffer_size);
        let offset = self.window.buffer_offset();
        let cur = offset.wrapping_add(pos) as usize;
        let (hash2, hash3, hash_value) = self.hashes(self.window.buffer(), cur);
        let mut max_len = START_MAX_LEN;

        let main_slot = (self.fix_hash_size + hash_value) as usize;
        let cur_match = self.hash[main_slot];

        if self.hash_array {
            let buffer = self.window.buffer();
            let mut cur_match2 = self.hash[hash2 as usize];
            let cur_match3 = self.hash[(HASH3_OFFSET + hash3) as usize];
            self.hash[hash2 as usize] = pos;
            self.hash[(HASH3_OFFSET + hash3) as usize] = pos;

            if cur_match2 > match_min_pos
                && buffer[offset.wrapping_add(cur_match2) as usize] == buffer[cur]
            {
                max_len = 2;
                matches.push(Match { len: 2, dist: pos - cur_match2 - 1 });
            }
            if cur_match3 > match_min_pos
                && buffer[offset.wrapping_add(cur_match3) as usize] == buffer[cur]
            {
                if cur_match3 == cur_match2 {
                    matches.pop();
                }
                max_len = 3;
                matches.push(Match { len: 3, dist: pos - cur_match3 - 1 });
                cur_match2 = cur_match3;
            }
            if !matches.is_empty() && cur_match2 == cur_match {
                matches.pop();
                max_len = START_MAX_LEN;
            }
        }

        self.hash[main_slot] = pos;

        if self.num_hash_direct_bytes != 0 && cur_match > match_min_pos {
            let buffer = self.window.buffer();
            let direct = self.num_hash_direct_bytes as usize;
            if buffer[offset.wrapping_add(cur_match) as usize + direct] != buffer[cur + direct] {
                max_len = self.num_hash_direct_bytes;
                matches.push(Match {
                    len: max_len,
                    dist: pos - cur_match - 1,
                });
            }
        }

        self.walk_tree(cur_match, len_limit, Some(matches), max_len);
        self.move_pos()
    }

    fn skip(&mut self, num: u32) -> io::Result<()> {
        for _ in 0..num {
            let len_limit = match self.len_limit() {
                Some(limit) => limit,
                None => {
                    self.move_pos()?;
                    continue;
                }
            };

            let pos = self.window.pos();
            let cur = self.window.buffer_offset().wrapping_add(pos) as usize;
            let (hash2, hash3, hash_value) = self.hashes(self.window.buffer(), cur);
            if self.hash_array {
                self.hash[hash2 as usize] = pos;
                self.hash[(HASH3_OFFSET + hash3) as usize] = pos;
            }
            let main_slot = (self.fix_hash_size + hash_value) as usize;
            let cur_match = self.hash[main_slot];
            self.hash[main_slot] = pos;

            self.walk_tree(cur_match, len_limit, None, u32::MAX);
            self.move_pos()?;
        }
        Ok(())
    }
}

fn normalize_links(items: &mut [u32], sub_value: u32) {
    for item in items.iter_mut() {
        *item = if *item <= sub_value {
            EMPTY_HASH_VALUE
        } else {
            *item - sub_value
        };
    }
}
