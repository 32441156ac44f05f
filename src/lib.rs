//! Decoders for the tagged-section asset containers of Front Page Sports:
//! Football Pro. Screens (`.SCR`), sprite bitmaps and VGA palettes.

pub mod binary_utils;
pub mod containers;
pub mod error;
pub mod formats;
pub mod graphics;

use std::hash::Hasher;

use twox_hash::XxHash64;

pub use containers::tlv::{walk, Section, SectionBody, SectionList, Tag, WalkOptions};
pub use containers::ContainerHandler;
pub use error::{DecodeIssue, FormatError};
pub use formats::{Palette, Screen, Sprite};

/// 64-bit hash of a decoded buffer, for comparing output against known-good
/// decodes.
pub fn fingerprint(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::default();
    hasher.write(data);
    hasher.finish()
}
