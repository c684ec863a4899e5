//! Stream header parser.
//!
//! Two layouts are in use:
//!
//! | Format | Bytes | Contents |
//! |--------|-------|----------|
//! | [`HeaderFormat::Full`] | 13 | properties, 64-bit little-endian size |
//! | [`HeaderFormat::PropertiesOnly`] | 5 | properties |
//!
//! A size of all ones means "unknown": the stream ends with an end marker.
//! The properties-only layout never carries a size.

use std::io::{ErrorKind, Read, Write};

use super::properties::{LzmaProperties, LzmaPropertiesParser};
use crate::error::{LzmaError, Result};

/// Size field value meaning "unknown, terminated by end marker".
pub const UNKNOWN_SIZE: u64 = u64::MAX;

/// Header layout in front of the compressed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderFormat {
    /// Properties followed by the uncompressed size.
    #[default]
    Full,
    /// Properties only; the stream must end with an end marker.
    PropertiesOnly,
}

impl HeaderFormat {
    pub fn size(self) -> usize {
        match self {
            Self::Full => StreamHeaderParser::HEADER_SIZE,
            Self::PropertiesOnly => LzmaPropertiesParser::HEADER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub properties: LzmaProperties,
    /// `None` when the size is unknown or not part of the layout.
    pub uncompressed_size: Option<u64>,
}

pub struct StreamHeaderParser;

impl StreamHeaderParser {
    pub const HEADER_SIZE: usize = 13;

    /// Parse a header of the given layout from the start of `buffer`.
    pub fn parse(buffer: &[u8], format: HeaderFormat) -> Result<StreamHeader> {
        let needed = format.size();
        if buffer.len() < needed {
            return Err(LzmaError::BufferTooSmall {
                needed,
                have: buffer.len(),
            });
        }

        let properties = LzmaPropertiesParser::parse(buffer)?;
        let uncompressed_size = match format {
            HeaderFormat::PropertiesOnly => None,
            HeaderFormat::Full => {
                let mut size = [0u8; 8];
                size.copy_from_slice(&buffer[5..13]);
                match u64::from_le_bytes(size) {
                    UNKNOWN_SIZE => None,
                    n => Some(n),
                }
            }
        };

        Ok(StreamHeader {
            properties,
            uncompressed_size,
        })
    }

    /// Read and parse a header from `reader`.
    pub fn read_from<R: Read>(reader: &mut R, format: HeaderFormat) -> Result<StreamHeader> {
        let mut buffer = [0u8; Self::HEADER_SIZE];
        let needed = format.size();
        let mut have = 0;
        while have < needed {
            match reader.read(&mut buffer[have..needed]) {
                Ok(0) => break,
                Ok(n) => have += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Self::parse(&buffer[..have], format)
    }
}

impl StreamHeader {
    pub fn to_bytes(&self, format: HeaderFormat) -> Vec<u8> {
        let mut out = Vec::with_capacity(format.size());
        out.extend_from_slice(&self.properties.to_bytes());
        if format == HeaderFormat::Full {
            let size = self.uncompressed_size.unwrap_or(UNKNOWN_SIZE);
            out.extend_from_slice(&size.to_le_bytes());
        }
        out
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, format: HeaderFormat) -> Result<()> {
        writer.write_all(&self.to_bytes(format))?;
        Ok(())
    }
}
