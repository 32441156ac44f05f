pub mod bit_reader;
pub mod lz77;
pub mod lzw;
pub mod rle;

use log::{debug, warn};
use serde::Serialize;

use crate::binary_utils::{read_u32_le, read_u8};
use crate::containers::CompressionContainer;
use crate::error::DecodeIssue;

/// Compression type byte followed by the little-endian uncompressed size.
pub const BLOCK_SUBHEADER_SIZE: usize = 5;
/// Declared uncompressed sizes above this are rejected before decoding.
pub const MAX_BLOCK_SIZE: usize = 1 << 24;

/// Output of a codec: the bytes produced and, when decoding stopped early,
/// the reason why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub data: Vec<u8>,
    pub issue: Option<DecodeIssue>,
}

impl Decoded {
    pub fn complete(data: Vec<u8>) -> Self {
        Decoded { data, issue: None }
    }

    pub fn partial(data: Vec<u8>, issue: DecodeIssue) -> Self {
        Decoded {
            data,
            issue: Some(issue),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.issue.is_none()
    }

    /// Zero-pad (or cut) to exactly `len` bytes.
    pub fn into_padded(self, len: usize) -> Vec<u8> {
        let mut data = self.data;
        data.resize(len, 0);
        data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    Raw,
    Rle,
    Lzw,
}

impl CompressionMethod {
    pub fn from_byte(method: u8) -> Result<Self, DecodeIssue> {
        match method {
            0x00 => Ok(CompressionMethod::Raw),
            0x01 => Ok(CompressionMethod::Rle),
            0x02 => Ok(CompressionMethod::Lzw),
            other => Err(DecodeIssue::UnrecognizedCodec { method: other }),
        }
    }
}

/// A compressed payload with its sub-header already parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedBlock<'a> {
    pub method: CompressionMethod,
    pub uncompressed_size: u32,
    pub payload: &'a [u8],
}

impl<'a> CompressedBlock<'a> {
    /// Parse the 5 byte sub-header of an image plane section body.
    /// `offset` is only used to report where a short body sits in the file.
    pub fn parse(body: &'a [u8], offset: usize) -> Result<Self, DecodeIssue> {
        let (Some(method), Some(uncompressed_size)) = (read_u8(body, 0), read_u32_le(body, 1))
        else {
            return Err(DecodeIssue::StructuralTruncation {
                offset,
                needed: BLOCK_SUBHEADER_SIZE,
                available: body.len(),
            });
        };

        let method = CompressionMethod::from_byte(method)?;
        if uncompressed_size as usize > MAX_BLOCK_SIZE {
            return Err(DecodeIssue::StructuralTruncation {
                offset,
                needed: uncompressed_size as usize,
                available: MAX_BLOCK_SIZE,
            });
        }

        Ok(CompressedBlock {
            method,
            uncompressed_size,
            payload: &body[BLOCK_SUBHEADER_SIZE..],
        })
    }
}

impl CompressionContainer for CompressedBlock<'_> {
    fn decompress(&self) -> Decoded {
        let expected = self.uncompressed_size as usize;
        debug!(
            "Decompressing {:?} block: {} -> {} bytes",
            self.method,
            self.payload.len(),
            expected
        );

        let decoded = match self.method {
            CompressionMethod::Raw => {
                let take = expected.min(self.payload.len());
                let data = self.payload[..take].to_vec();
                if take < expected {
                    Decoded::partial(
                        data,
                        DecodeIssue::StreamExhausted {
                            position: take,
                            produced: take,
                        },
                    )
                } else {
                    Decoded::complete(data)
                }
            }
            CompressionMethod::Rle => rle::decompress(self.payload, expected),
            CompressionMethod::Lzw => lzw::decompress(self.payload, expected),
        };

        if let Some(issue) = &decoded.issue {
            warn!(
                "{:?} block stopped after {}/{} bytes: {}",
                self.method,
                decoded.data.len(),
                expected,
                issue
            );
        }
        decoded
    }
}
