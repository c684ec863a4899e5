//! Coder properties: the lc/lp/pb byte and the dictionary size.
//!
//! ```text
//! byte 0     (pb * 5 + lp) * 9 + lc
//! bytes 1-4  dictionary size, little-endian
//! ```

use crate::constants::NUM_POS_STATES_BITS_ENCODING_MAX;
use crate::error::{LzmaError, Result};

/// Model parameters written in front of every stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProperties {
    pub lc: u8,
    pub lp: u8,
    pub pb: u8,
    pub dictionary_size: u32,
}

pub struct LzmaPropertiesParser;

impl LzmaPropertiesParser {
    pub const HEADER_SIZE: usize = 5;

    /// Parse the five property bytes.
    pub fn parse(buffer: &[u8]) -> Result<LzmaProperties> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(LzmaError::BufferTooSmall {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }

        let (lc, lp, pb) = LzmaProperties::decode_lc_lp_pb(buffer[0])?;
        let dictionary_size = u32::from_le_bytes([buffer[1], buffer[2], buffer[3], buffer[4]]);

        Ok(LzmaProperties {
            lc,
            lp,
            pb,
            dictionary_size,
        })
    }
}

impl LzmaProperties {
    /// Split the properties byte. `pb` above 4 is rejected.
    pub fn decode_lc_lp_pb(byte: u8) -> Result<(u8, u8, u8)> {
        let lc = byte % 9;
        let rest = byte / 9;
        let lp = rest % 5;
        let pb = rest / 5;
        if pb as u32 > NUM_POS_STATES_BITS_ENCODING_MAX {
            return Err(LzmaError::InvalidProperties(byte));
        }
        Ok((lc, lp, pb))
    }

    pub fn lc_lp_pb_byte(&self) -> u8 {
        ((self.pb as u32 * 5 + self.lp as u32) * 9 + self.lc as u32) as u8
    }

    pub fn to_bytes(&self) -> [u8; LzmaPropertiesParser::HEADER_SIZE] {
        let dict = self.dictionary_size.to_le_bytes();
        [self.lc_lp_pb_byte(), dict[0], dict[1], dict[2], dict[3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_properties() {
        let props = LzmaPropertiesParser::parse(&[0x5D, 0x00, 0x00, 0x40, 0x00]).unwrap();
        assert_eq!((props.lc, props.lp, props.pb), (3, 0, 2));
        assert_eq!(props.dictionary_size, 1 << 22);
    }

    #[test]
    fn test_every_valid_combination_survives() {
        for lc in 0..=8u8 {
            for lp in 0..=4u8 {
                for pb in 0..=4u8 {
                    let props = LzmaProperties {
                        lc,
                        lp,
                        pb,
                        dictionary_size: 0x1234_5678,
                    };
                    assert_eq!(LzmaPropertiesParser::parse(&props.to_bytes()).unwrap(), props);
                }
            }
        }
    }

    #[test]
    fn test_rejects_large_pb() {
        assert!(matches!(
            LzmaPropertiesParser::parse(&[225, 0, 0, 1, 0]),
            Err(LzmaError::InvalidProperties(225))
        ));
        assert!(LzmaPropertiesParser::parse(&[224, 0, 0, 1, 0]).is_ok());
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            LzmaPropertiesParser::parse(&[0x5D, 0]),
            Err(LzmaError::BufferTooSmall { needed: 5, have: 2 })
        ));
    }
}
