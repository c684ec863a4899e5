//! Sliding input window for the match finder.
//!
//! The window keeps `keep_size_before` bytes of history behind the current
//! position and tries to keep `keep_size_after` bytes of lookahead in front
//! of it. When the position gets too close to the end of the buffer, the
//! live region is moved back to the start and more input is read.
//!
//! Positions are `u32` counters that only ever grow (until the match finder
//! normalizes them). `buffer_offset` maps a position to a buffer index with
//! wrapping arithmetic: `index = buffer_offset + pos (mod 2^32)`.

use std::io::{self, ErrorKind, Read};

/// Buffered view of the input stream.
pub struct Window<R> {
    source: R,
    buffer: Vec<u8>,
    buffer_offset: u32,
    pos: u32,
    pos_limit: u32,
    stream_pos: u32,
    keep_size_before: u32,
    keep_size_after: u32,
    last_safe_position: u32,
    stream_end: bool,
}

impl<R: Read> Window<R> {
    /// Allocate the window and read the first block from `source`.
    pub fn new(
        source: R,
        keep_size_before: u32,
        keep_size_after: u32,
        keep_size_reserve: u32,
    ) -> io::Result<Self> {
        let block_size = keep_size_before + keep_size_after + keep_size_reserve;
        let mut window = Self {
            source,
            buffer: vec![0; block_size as usize],
            buffer_offset: 0,
            pos: 0,
            pos_limit: 0,
            stream_pos: 0,
            keep_size_before,
            keep_size_after,
            last_safe_position: block_size - keep_size_after,
            stream_end: false,
        };
        window.read_block()?;
        Ok(window)
    }

    fn block_size(&self) -> u32 {
        self.buffer.len() as u32
    }

    /// Buffer index of the byte `index` positions away from the current one.
    #[inline]
    fn buffer_index(&self, index: i32) -> usize {
        self.buffer_offset
            .wrapping_add(self.pos)
            .wrapping_add(index as u32) as usize
    }

    fn move_block(&mut self) {
        let current = self.buffer_offset.wrapping_add(self.pos);
        let mut offset = current.saturating_sub(self.keep_size_before);
        if offset > 0 {
            offset -= 1;
        }
        let end = self.buffer_offset.wrapping_add(self.stream_pos);
        self.buffer
            .copy_within(offset as usize..end as usize, 0);
        self.buffer_offset = self.buffer_offset.wrapping_sub(offset);
    }

    fn read_block(&mut self) -> io::Result<()> {
        if self.stream_end {
            return Ok(());
        }
        loop {
            let start = self.buffer_offset.wrapping_add(self.stream_pos);
            let size = self.block_size() - start;
            if size == 0 {
                return Ok(());
            }
            let start = start as usize;
            let read = match self.source.read(&mut self.buffer[start..start + size as usize]) {
                Ok(n) => n as u32,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if read == 0 {
                self.pos_limit = self.stream_pos;
                let limit_index = self.buffer_offset.wrapping_add(self.pos_limit);
                if limit_index > self.last_safe_position {
                    self.pos_limit = self.last_safe_position.wrapping_sub(self.buffer_offset);
                }
                self.stream_end = true;
                return Ok(());
            }
            self.stream_pos = self.stream_pos.wrapping_add(read);
            if self.stream_pos >= self.pos.wrapping_add(self.keep_size_after) {
                self.pos_limit = self.stream_pos - self.keep_size_after;
            }
        }
    }

    /// Advance by one byte, refilling the buffer when the lookahead runs low.
    pub fn move_pos(&mut self) -> io::Result<()> {
        self.pos = self.pos.wrapping_add(1);
        if self.pos > self.pos_limit {
            if self.buffer_offset.wrapping_add(self.pos) > self.last_safe_position {
                self.move_block();
            }
            self.read_block()?;
        }
        Ok(())
    }

    /// Subtract `sub_value` from every position (wrapping).
    pub fn reduce_offsets(&mut self, sub_value: u32) {
        self.buffer_offset = self.buffer_offset.wrapping_add(sub_value);
        self.pos_limit = self.pos_limit.wrapping_sub(sub_value);
        self.pos = self.pos.wrapping_sub(sub_value);
        self.stream_pos = self.stream_pos.wrapping_sub(sub_value);
    }

    #[inline]
    pub fn index_byte(&self, index: i32) -> u8 {
        self.buffer[self.buffer_index(index)]
    }

    pub fn match_len(&self, index: i32, distance: u32, limit: u32) -> u32 {
        let start = self.pos as i64 + index as i64;
        let mut limit = limit as i64;
        if self.stream_end && start + limit > self.stream_pos as i64 {
            limit = (self.stream_pos as i64 - start).max(0);
        }
        let cur = self.buffer_index(index);
        let back = cur - (distance as usize + 1);
        let limit = limit as usize;
        let mut len = 0;
        while len < limit && self.buffer[cur + len] == self.buffer[back + len] {
            len += 1;
        }
        len as u32
    }

    pub fn available_bytes(&self) -> u32 {
        self.stream_pos.wrapping_sub(self.pos)
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    pub fn stream_pos(&self) -> u32 {
        self.stream_pos
    }

    pub fn stream_end(&self) -> bool {
        self.stream_end
    }

    pub(super) fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub(super) fn buffer_offset(&self) -> u32 {
        self.buffer_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_reads_until_full_or_eof() {
        let data: Vec<u8> = (0..100u8).collect();
        let window = Window::new(Trickle { data: &data, chunk: 7 }, 16, 8, 200).unwrap();
        assert_eq!(window.available_bytes(), 100);
        assert_eq!(window.index_byte(0), 0);
        assert_eq!(window.index_byte(99), 99);
    }

    #[test]
    fn test_slides_over_long_input() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut window = Window::new(&data[..], 64, 32, 64).unwrap();
        for i in 0..4990u32 {
            assert_eq!(window.index_byte(0), (i % 251) as u8, "position {}", i);
            if i >= 64 {
                assert_eq!(window.index_byte(-64), ((i - 64) % 251) as u8);
            }
            window.move_pos().unwrap();
        }
        assert_eq!(window.available_bytes(), 10);
    }

    #[test]
    fn test_match_len_stops_at_end_of_input() {
        let data = b"abcabcabcab";
        let mut window = Window::new(&data[..], 16, 16, 16).unwrap();
        for _ in 0..3 {
            window.move_pos().unwrap();
        }
        // "abcabcab" against distance 3 (index distance + 1).
        assert_eq!(window.match_len(0, 2, 100), 8);
        assert_eq!(window.match_len(0, 2, 5), 5);
        assert_eq!(window.match_len(0, 0, 100), 0);
    }
}
