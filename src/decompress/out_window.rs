//! Sliding output window.
//!
//! Holds the last `size` decoded bytes for back-references and streams
//! everything else to the sink. The buffer grows with the output until it
//! reaches the dictionary size, so small streams never allocate a full
//! dictionary.

use std::io::Write;

use super::Result;

/// Circular dictionary buffer in front of a `Write` sink.
pub struct OutWindow<W> {
    sink: W,
    buffer: Vec<u8>,
    /// Capacity of the window once fully grown.
    size: usize,
    /// Next write index in `buffer`.
    pos: usize,
    /// Start of the bytes not yet handed to the sink.
    flushed: usize,
    /// Total bytes written.
    total: u64,
}

impl<W: Write> OutWindow<W> {
    /// Create a window over the last `size` bytes.
    pub fn new(sink: W, size: usize) -> Self {
        let size = size.max(1);
        Self {
            sink,
            buffer: Vec::with_capacity(size.min(1 << 16)),
            size,
            pos: 0,
            flushed: 0,
            total: 0,
        }
    }

    /// Write a literal byte to the output.
    #[inline]
    pub fn put_byte(&mut self, byte: u8) -> Result<()> {
        if self.pos < self.buffer.len() {
            self.buffer[self.pos] = byte;
        } else {
            self.buffer.push(byte);
        }
        self.pos += 1;
        self.total += 1;
        if self.pos == self.size {
            self.flush()?;
            self.pos = 0;
            self.flushed = 0;
        }
        Ok(())
    }

    /// Byte `distance + 1` positions back. The caller checks that it exists.
    #[inline]
    pub fn get_byte(&self, distance: u32) -> u8 {
        let distance = distance as usize;
        let index = if distance < self.pos {
            self.pos - distance - 1
        } else {
            self.size - distance - 1 + self.pos
        };
        self.buffer[index]
    }

    /// Copy `len` bytes starting `distance + 1` positions back.
    ///
    /// Overlapping copies repeat the pattern, as LZ77 requires.
    pub fn copy_match(&mut self, distance: u32, len: u32) -> Result<()> {
        let dist = distance as usize + 1;
        let len = len as usize;

        // Fast paths: source and destination are contiguous and disjoint,
        // and the copy stops short of the wrap point.
        if dist >= len && self.pos >= dist && self.pos + len < self.size {
            let src = self.pos - dist;
            if self.pos + len <= self.buffer.len() {
                self.buffer.copy_within(src..src + len, self.pos);
            } else if self.pos == self.buffer.len() {
                self.buffer.extend_from_within(src..src + len);
            } else {
                return self.copy_bytes(distance, len);
            }
            self.pos += len;
            self.total += len as u64;
            return Ok(());
        }

        self.copy_bytes(distance, len)
    }

    fn copy_bytes(&mut self, distance: u32, len: usize) -> Result<()> {
        for _ in 0..len {
            let byte = self.get_byte(distance);
            self.put_byte(byte)?;
        }
        Ok(())
    }

    /// Hand pending bytes to the sink.
    pub fn flush(&mut self) -> Result<()> {
        if self.pos > self.flushed {
            self.sink.write_all(&self.buffer[self.flushed..self.pos])?;
            self.flushed = self.pos;
        }
        Ok(())
    }

    /// Total bytes written so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Flush and return the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_output() {
        let mut window = OutWindow::new(Vec::new(), 256);
        for &b in b"Hello" {
            window.put_byte(b).unwrap();
        }
        assert_eq!(window.total(), 5);
        assert_eq!(window.get_byte(0), b'o');
        assert_eq!(window.into_inner().unwrap(), b"Hello");
    }

    #[test]
    fn test_copy_match() {
        let mut window = OutWindow::new(Vec::new(), 256);
        for &b in b"abc" {
            window.put_byte(b).unwrap();
        }
        // Distance 3 (zero-based 2), length 6 -> "abcabc"
        window.copy_match(2, 6).unwrap();
        assert_eq!(window.total(), 9);
        assert_eq!(window.into_inner().unwrap(), b"abcabcabc");
    }

    #[test]
    fn test_overlapping_copy() {
        let mut window = OutWindow::new(Vec::new(), 256);
        window.put_byte(b'a').unwrap();
        window.copy_match(0, 5).unwrap();
        assert_eq!(window.into_inner().unwrap(), b"aaaaaa");
    }

    #[test]
    fn test_wraps_and_streams() {
        let mut window = OutWindow::new(Vec::new(), 8);
        for &b in b"0123456" {
            window.put_byte(b).unwrap();
        }
        // Crosses the wrap point.
        window.copy_match(6, 7).unwrap();
        assert_eq!(window.get_byte(0), b'6');
        assert_eq!(window.get_byte(7), b'6');
        assert_eq!(window.total(), 14);
        assert_eq!(window.into_inner().unwrap(), b"01234560123456");
    }

    #[test]
    fn test_sink_error_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut window = OutWindow::new(Broken, 4);
        for &b in b"abc" {
            window.put_byte(b).unwrap();
        }
        assert!(matches!(
            window.put_byte(b'd'),
            Err(super::super::DecompressError::Io(_))
        ));
    }
}
