use serde::Serialize;
use thiserror::Error;

/// Conditions a codec or the container walker can hit. None of them abort a
/// decode: whatever output was produced so far travels alongside the issue.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeIssue {
    #[error("structural truncation at offset {offset}: need {needed} bytes, {available} available")]
    StructuralTruncation {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("unrecognised compression type 0x{method:02X}")]
    UnrecognizedCodec { method: u8 },
    #[error("invalid dictionary code {code} (table size {table_size})")]
    InvalidDictionaryCode { code: u16, table_size: usize },
    #[error("stream exhausted at input byte {position} after {produced} output bytes")]
    StreamExhausted { position: usize, produced: usize },
}

/// Asset-level failures, where a file cannot be turned into a usable image.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("missing magic word {expected:?}")]
    InvalidMagic { expected: &'static str },
    #[error("{asset} is missing its {tag} section")]
    MissingSection {
        asset: &'static str,
        tag: &'static str,
    },
    #[error("data too short for {what}: need {needed} bytes, got {got}")]
    TooShort {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("section {tag} could not be decoded: {issue}")]
    Undecodable { tag: String, issue: DecodeIssue },
}
