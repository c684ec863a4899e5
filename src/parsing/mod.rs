//! LZMA header parsing modules.

pub mod header;
pub mod properties;

pub use header::{HeaderFormat, StreamHeader, StreamHeaderParser, UNKNOWN_SIZE};
pub use properties::{LzmaProperties, LzmaPropertiesParser};
