pub mod compression;
pub mod tlv;

use crate::containers::compression::Decoded;
use crate::error::FormatError;

pub trait CompressionContainer {
    fn decompress(&self) -> Decoded;
}

/// Asset files identified by a leading tag.
pub trait ContainerHandler: Sized {
    fn magic_word() -> &'static [u8];
    fn matches(data: &[u8]) -> bool {
        data.starts_with(Self::magic_word())
    }
    fn deserialise(data: &[u8]) -> Result<Self, FormatError>;
}
