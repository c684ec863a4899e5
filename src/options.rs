//! Encoder and decoder configuration.
//!
//! ## Encoder defaults
//!
//! | Field | Default | Range |
//! |-------|---------|-------|
//! | `lc` | 3 | 0..=8 |
//! | `lp` | 0 | 0..=4 |
//! | `pb` | 2 | 0..=4 |
//! | `dictionary_size` | 4 MiB | 1..=512 MiB |
//! | `fast_bytes` | 32 | 5..=273 |
//! | `match_finder` | BT4 | BT2, BT4 |
//! | `end_marker` | off | |
//!
//! ## Example
//!
//! ```rust
//! use lzma_stream::{EncoderOptions, MatchFinderKind};
//!
//! let options = EncoderOptions::default()
//!     .maximal_fast_bytes()
//!     .with_dictionary_size(1 << 20)
//!     .with_match_finder(MatchFinderKind::Bt2)
//!     .with_end_marker(true);
//! assert!(options.validate().is_ok());
//! ```

use crate::constants::{
    MATCH_MAX_LEN, NUM_LIT_CONTEXT_BITS_MAX, NUM_LIT_POS_STATES_BITS_MAX,
    NUM_POS_STATES_BITS_ENCODING_MAX,
};
use crate::error::{LzmaError, Result};
use crate::lz::MatchFinderKind;
use crate::parsing::{HeaderFormat, LzmaProperties};

/// Largest dictionary the encoder accepts (512 MiB).
pub const MAX_DICTIONARY_SIZE: u32 = 1 << 29;

/// Smallest fast-bytes value the encoder accepts.
pub const MIN_FAST_BYTES: u32 = 5;

/// Compression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Literal context bits: high bits of the previous byte.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits for match/length contexts.
    pub pb: u32,
    pub dictionary_size: u32,
    /// Match length at which the parser stops searching and commits.
    pub fast_bytes: u32,
    pub match_finder: MatchFinderKind,
    /// Terminate the stream with an end marker.
    pub end_marker: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            lc: 3,
            lp: 0,
            pb: 2,
            dictionary_size: 1 << 22,
            fast_bytes: 32,
            match_finder: MatchFinderKind::Bt4,
            end_marker: false,
        }
    }
}

impl EncoderOptions {
    pub fn minimal_dictionary_size(self) -> Self {
        self.with_dictionary_size(1)
    }

    pub fn medium_dictionary_size(self) -> Self {
        self.with_dictionary_size(1 << 15)
    }

    pub fn maximal_dictionary_size(self) -> Self {
        self.with_dictionary_size(1 << 28)
    }

    pub fn minimal_fast_bytes(self) -> Self {
        self.with_fast_bytes(MIN_FAST_BYTES)
    }

    pub fn medium_fast_bytes(self) -> Self {
        self.with_fast_bytes(32)
    }

    pub fn maximal_fast_bytes(self) -> Self {
        self.with_fast_bytes(MATCH_MAX_LEN)
    }

    pub fn with_dictionary_size(mut self, dictionary_size: u32) -> Self {
        self.dictionary_size = dictionary_size;
        self
    }

    pub fn with_fast_bytes(mut self, fast_bytes: u32) -> Self {
        self.fast_bytes = fast_bytes;
        self
    }

    pub fn with_end_marker(mut self, end_marker: bool) -> Self {
        self.end_marker = end_marker;
        self
    }

    pub fn with_match_finder(mut self, match_finder: MatchFinderKind) -> Self {
        self.match_finder = match_finder;
        self
    }

    pub fn with_lc_lp_pb(mut self, lc: u32, lp: u32, pb: u32) -> Self {
        self.lc = lc;
        self.lp = lp;
        self.pb = pb;
        self
    }

    /// Reject out-of-range parameters before any stream is touched.
    pub fn validate(&self) -> Result<()> {
        let check = |parameter: &'static str, value: u32, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(LzmaError::InvalidConfiguration { parameter, value })
            }
        };
        check("lc", self.lc, self.lc <= NUM_LIT_CONTEXT_BITS_MAX)?;
        check("lp", self.lp, self.lp <= NUM_LIT_POS_STATES_BITS_MAX)?;
        check("pb", self.pb, self.pb <= NUM_POS_STATES_BITS_ENCODING_MAX)?;
        check(
            "dictionary_size",
            self.dictionary_size,
            (1..=MAX_DICTIONARY_SIZE).contains(&self.dictionary_size),
        )?;
        check(
            "fast_bytes",
            self.fast_bytes,
            (MIN_FAST_BYTES..=MATCH_MAX_LEN).contains(&self.fast_bytes),
        )
    }

    /// The five property bytes describing a stream made with these options.
    pub fn properties(&self) -> LzmaProperties {
        LzmaProperties {
            lc: self.lc as u8,
            lp: self.lp as u8,
            pb: self.pb as u8,
            dictionary_size: self.dictionary_size,
        }
    }

    /// Number of distance slots the dictionary can produce: `2 * ceil(log2(dictionary))`.
    pub(crate) fn dist_table_size(&self) -> u32 {
        let mut log_size = 0;
        while self.dictionary_size > 1 << log_size {
            log_size += 1;
        }
        log_size * 2
    }
}

/// Decompression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderOptions {
    /// Header layout expected in front of the compressed data.
    pub format: HeaderFormat,
    /// Read the size field but decode until the end marker.
    pub ignore_size: bool,
}

impl DecoderOptions {
    pub fn with_format(mut self, format: HeaderFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_ignore_size(mut self, ignore_size: bool) -> Self {
        self.ignore_size = ignore_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = EncoderOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.dist_table_size(), 44);
        assert_eq!(options.properties().to_bytes(), [0x5D, 0x00, 0x00, 0x40, 0x00]);
    }

    #[test]
    fn test_presets() {
        let options = EncoderOptions::default().minimal_dictionary_size().minimal_fast_bytes();
        assert_eq!((options.dictionary_size, options.fast_bytes), (1, 5));
        assert!(options.validate().is_ok());
        assert_eq!(options.dist_table_size(), 0);

        let options = EncoderOptions::default().maximal_dictionary_size().maximal_fast_bytes();
        assert_eq!((options.dictionary_size, options.fast_bytes), (1 << 28, 273));
        assert!(options.validate().is_ok());

        let options = EncoderOptions::default().medium_dictionary_size().medium_fast_bytes();
        assert_eq!((options.dictionary_size, options.fast_bytes), (1 << 15, 32));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let cases = [
            (EncoderOptions::default().with_lc_lp_pb(9, 0, 2), "lc"),
            (EncoderOptions::default().with_lc_lp_pb(3, 5, 2), "lp"),
            (EncoderOptions::default().with_lc_lp_pb(3, 0, 5), "pb"),
            (EncoderOptions::default().with_dictionary_size(0), "dictionary_size"),
            (EncoderOptions::default().with_dictionary_size((1 << 29) + 1), "dictionary_size"),
            (EncoderOptions::default().with_fast_bytes(4), "fast_bytes"),
            (EncoderOptions::default().with_fast_bytes(274), "fast_bytes"),
        ];
        for (options, expected) in cases {
            match options.validate() {
                Err(LzmaError::InvalidConfiguration { parameter, .. }) => {
                    assert_eq!(parameter, expected)
                }
                other => panic!("{:?} accepted: {:?}", options, other),
            }
        }
    }

    #[test]
    fn test_decoder_options() {
        let options = DecoderOptions::default();
        assert_eq!(options.format, HeaderFormat::Full);
        assert!(!options.ignore_size);
        let options = options
            .with_format(HeaderFormat::PropertiesOnly)
            .with_ignore_size(true);
        assert_eq!(options.format, HeaderFormat::PropertiesOnly);
        assert!(options.ignore_size);
    }
}
