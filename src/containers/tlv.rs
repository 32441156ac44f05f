use std::fmt;
use std::ops::Range;

use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::binary_utils::{read_tag, read_u32_le};
use crate::containers::compression::{CompressedBlock, CompressionMethod, BLOCK_SUBHEADER_SIZE};
use crate::containers::CompressionContainer;
use crate::error::DecodeIssue;

// Tagged sections: 4 byte ASCII tag, u32 LE size, body. Bit 31 of the size
// marks a container whose body is a sequence of child sections.

pub const SECTION_HEADER_SIZE: usize = 8;
pub const CONTAINER_FLAG: u32 = 0x8000_0000;
/// Containers nested deeper than this are recorded without children.
pub const MAX_NESTING_DEPTH: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const SCR: Tag = Tag(*b"SCR:");
    pub const DIM: Tag = Tag(*b"DIM:");
    pub const BIN: Tag = Tag(*b"BIN:");
    pub const VGA: Tag = Tag(*b"VGA:");
    pub const VQT: Tag = Tag(*b"VQT:");

    pub fn is_ascii(&self) -> bool {
        self.0.is_ascii()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decoded image plane together with where its compressed payload sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedBlock {
    pub method: CompressionMethod,
    pub uncompressed_size: u32,
    pub payload: Range<usize>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionBody {
    Children { children: Vec<Section> },
    Block(DecodedBlock),
    Raw { span: Range<usize> },
    /// The declared body did not fit in the buffer.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub tag: Tag,
    pub offset: usize,
    pub declared_size: u32,
    pub is_container: bool,
    pub body: SectionBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<DecodeIssue>,
}

impl Section {
    pub fn children(&self) -> &[Section] {
        match &self.body {
            SectionBody::Children { children } => children,
            _ => &[],
        }
    }

    pub fn block(&self) -> Option<&DecodedBlock> {
        match &self.body {
            SectionBody::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Body bytes of a raw section.
    pub fn raw<'d>(&self, data: &'d [u8]) -> Option<&'d [u8]> {
        match &self.body {
            SectionBody::Raw { span } => data.get(span.clone()),
            _ => None,
        }
    }

    /// Byte range covered by header and declared body.
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + SECTION_HEADER_SIZE + self.declared_size as usize
    }
}

/// Result of walking a buffer: the top level sections, plus a condition if
/// the top level itself stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionList {
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<DecodeIssue>,
}

impl SectionList {
    /// Every section in file order, parents before their children.
    pub fn flatten(&self) -> Vec<&Section> {
        fn visit<'s>(sections: &'s [Section], out: &mut Vec<&'s Section>) {
            for section in sections {
                out.push(section);
                visit(section.children(), out);
            }
        }

        let mut out = Vec::new();
        visit(&self.sections, &mut out);
        out
    }

    /// First section with `tag`, searching depth first.
    pub fn find(&self, tag: Tag) -> Option<&Section> {
        self.flatten().into_iter().find(|s| s.tag == tag)
    }

    /// Every condition recorded anywhere in the tree.
    pub fn issues(&self) -> Vec<(&Section, &DecodeIssue)> {
        self.flatten()
            .into_iter()
            .filter_map(|s| s.issue.as_ref().map(|issue| (s, issue)))
            .collect()
    }
}

/// Which tags carry a compressed block behind the 5 byte sub-header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    pub block_tags: Vec<Tag>,
}

impl WalkOptions {
    /// Record every payload raw, decoding nothing.
    pub fn structural() -> Self {
        WalkOptions {
            block_tags: Vec::new(),
        }
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            block_tags: vec![Tag::BIN, Tag::VGA],
        }
    }
}

/// Walk every section in `data`, decoding the payloads of block tags.
pub fn walk(data: &[u8], options: &WalkOptions) -> SectionList {
    let walker = ContainerWalker { data, options };
    let (sections, issue) = walker.walk_level(0, data.len(), 0);
    SectionList { sections, issue }
}

struct ContainerWalker<'a> {
    data: &'a [u8],
    options: &'a WalkOptions,
}

impl ContainerWalker<'_> {
    /// Parse sections in `start..end`. Stops at the first section that does
    /// not fit and reports why.
    fn walk_level(
        &self,
        start: usize,
        end: usize,
        depth: usize,
    ) -> (Vec<Section>, Option<DecodeIssue>) {
        let mut sections = Vec::new();
        let mut pos = start;

        while pos < end {
            let available = end - pos;
            let header = (read_tag(self.data, pos), read_u32_le(self.data, pos + 4));
            let (Some(tag), Some(raw_size), true) =
                (header.0, header.1, available >= SECTION_HEADER_SIZE)
            else {
                warn!("Trailing {} bytes at offset {} are not a section", available, pos);
                return (sections, Some(truncated(pos, SECTION_HEADER_SIZE, available)));
            };

            let tag = Tag(tag);
            if !tag.is_ascii() {
                warn!("Non-ASCII tag {} at offset {}, stopping", tag, pos);
                return (sections, Some(truncated(pos, SECTION_HEADER_SIZE, available)));
            }

            let is_container = raw_size & CONTAINER_FLAG != 0;
            let declared_size = raw_size & !CONTAINER_FLAG;
            let needed = SECTION_HEADER_SIZE + declared_size as usize;

            debug!(
                "{:indent$}Section {} at offset {}, size {}{}",
                "",
                tag,
                pos,
                declared_size,
                if is_container { " (container)" } else { "" },
                indent = depth * 2
            );

            let too_deep = is_container && depth >= MAX_NESTING_DEPTH;
            if needed > available || too_deep {
                let issue = truncated(pos, needed, available);
                if too_deep {
                    warn!(
                        "Container {} at offset {} nests deeper than {} levels, stopping",
                        tag, pos, MAX_NESTING_DEPTH
                    );
                } else {
                    warn!("Section {} at offset {}: {}", tag, pos, issue);
                }
                let body = if is_container {
                    SectionBody::Children {
                        children: Vec::new(),
                    }
                } else {
                    SectionBody::Missing
                };
                sections.push(Section {
                    tag,
                    offset: pos,
                    declared_size,
                    is_container,
                    body,
                    issue: Some(issue.clone()),
                });
                return (sections, Some(issue));
            }

            let body_start = pos + SECTION_HEADER_SIZE;
            let body_end = pos + needed;

            let (body, issue) = if is_container {
                let (children, issue) = self.walk_level(body_start, body_end, depth + 1);
                (SectionBody::Children { children }, issue)
            } else if self.options.block_tags.contains(&tag) {
                self.decode_block(body_start, body_end)
            } else {
                (
                    SectionBody::Raw {
                        span: body_start..body_end,
                    },
                    None,
                )
            };

            sections.push(Section {
                tag,
                offset: pos,
                declared_size,
                is_container,
                body,
                issue,
            });
            pos = body_end;
        }

        (sections, None)
    }

    fn decode_block(&self, body_start: usize, body_end: usize) -> (SectionBody, Option<DecodeIssue>) {
        let body = &self.data[body_start..body_end];
        match CompressedBlock::parse(body, body_start) {
            Ok(block) => {
                let decoded = block.decompress();
                let issue = decoded.issue.clone();
                let body = SectionBody::Block(DecodedBlock {
                    method: block.method,
                    uncompressed_size: block.uncompressed_size,
                    payload: body_start + BLOCK_SUBHEADER_SIZE..body_end,
                    data: decoded.into_padded(block.uncompressed_size as usize),
                });
                (body, issue)
            }
            Err(issue) => {
                warn!("Block at offset {} not decoded: {}", body_start, issue);
                (
                    SectionBody::Raw {
                        span: body_start..body_end,
                    },
                    Some(issue),
                )
            }
        }
    }
}

fn truncated(offset: usize, needed: usize, available: usize) -> DecodeIssue {
    DecodeIssue::StructuralTruncation {
        offset,
        needed,
        available,
    }
}
