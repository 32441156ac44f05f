use log::{debug, warn};
use serde::Serialize;

use crate::binary_utils::read_u16_le;
use crate::containers::tlv::{self, Section, SectionList, Tag, WalkOptions};
use crate::containers::ContainerHandler;
use crate::error::{DecodeIssue, FormatError};
use crate::graphics::nibble;

pub const DEFAULT_WIDTH: usize = 320;
pub const DEFAULT_HEIGHT: usize = 200;
/// Larger `DIM:` values are treated as corrupt.
pub const MAX_SCREEN_PIXELS: usize = 1 << 22;

/// A full-screen image: `SCR:` container holding `DIM:`, `BIN:` and `VGA:`.
#[derive(Debug, Clone, Serialize)]
pub struct Screen {
    pub width: usize,
    pub height: usize,
    /// One palette index per pixel, row-major.
    #[serde(skip)]
    pub pixels: Vec<u8>,
    /// True when the high-nibble `VGA:` plane was present.
    pub has_high_plane: bool,
    /// Every condition met while walking and decoding, by tag.
    pub issues: Vec<(Tag, DecodeIssue)>,
    pub sections: SectionList,
}

impl Screen {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    fn dimensions(sections: &SectionList, data: &[u8]) -> (usize, usize) {
        let Some(body) = sections.find(Tag::DIM).and_then(|s| s.raw(data)) else {
            debug!("No DIM: section, assuming {}x{}", DEFAULT_WIDTH, DEFAULT_HEIGHT);
            return (DEFAULT_WIDTH, DEFAULT_HEIGHT);
        };
        match (read_u16_le(body, 0), read_u16_le(body, 2)) {
            (Some(w), Some(h))
                if w > 0 && h > 0 && (w as usize) * (h as usize) <= MAX_SCREEN_PIXELS =>
            {
                (w as usize, h as usize)
            }
            _ => {
                warn!(
                    "DIM: section {:02X?} is unusable, assuming {}x{}",
                    body,
                    DEFAULT_WIDTH,
                    DEFAULT_HEIGHT
                );
                (DEFAULT_WIDTH, DEFAULT_HEIGHT)
            }
        }
    }
}

/// Decoded plane bytes, already sized to the block's declared length.
fn plane(section: &Section) -> Option<&[u8]> {
    section.block().map(|block| block.data.as_slice())
}

impl ContainerHandler for Screen {
    fn magic_word() -> &'static [u8] {
        b"SCR:"
    }

    fn deserialise(data: &[u8]) -> Result<Self, FormatError> {
        if !Self::matches(data) {
            return Err(FormatError::InvalidMagic { expected: "SCR:" });
        }

        let sections = tlv::walk(data, &WalkOptions::default());
        let (width, height) = Self::dimensions(&sections, data);

        if sections.find(Tag::VQT).is_some() {
            warn!("VQT: sections are not supported and will be ignored");
        }

        let low_section = sections.find(Tag::BIN).ok_or(FormatError::MissingSection {
            asset: "screen",
            tag: "BIN:",
        })?;
        let Some(low) = plane(low_section) else {
            let issue = low_section.issue.clone().unwrap_or(DecodeIssue::StructuralTruncation {
                offset: low_section.offset,
                needed: low_section.span().len(),
                available: data.len().saturating_sub(low_section.offset),
            });
            return Err(FormatError::Undecodable {
                tag: Tag::BIN.to_string(),
                issue,
            });
        };
        let high = sections.find(Tag::VGA).and_then(plane);

        let pixels = nibble::reconstruct(low, high, width, height);
        let has_high_plane = high.is_some();

        let mut issues: Vec<(Tag, DecodeIssue)> = sections
            .issues()
            .into_iter()
            .map(|(section, issue)| (section.tag, issue.clone()))
            .collect();
        if let Some(issue) = &sections.issue {
            if !issues.iter().any(|(_, known)| known == issue) {
                issues.push((Tag::SCR, issue.clone()));
            }
        }
        for (tag, issue) in &issues {
            warn!("Screen section {}: {}", tag, issue);
        }

        debug!(
            "Decoded {}x{} screen, {} plane(s)",
            width,
            height,
            if has_high_plane { 2 } else { 1 }
        );

        Ok(Screen {
            width,
            height,
            pixels,
            has_high_plane,
            issues,
            sections,
        })
    }
}
