use log::{debug, trace};

use super::bit_reader::BitReader;
use super::Decoded;
use crate::error::DecodeIssue;

// Block-aligned LZW as used for screen planes. Codes are packed LSB first in
// blocks of `code_size * 8` bits. There is no end code, so decoding runs until
// the expected size is reached, the input runs out or a code makes no sense.

pub const CLEAR_CODE: u16 = 0x100;
pub const INITIAL_CODE_SIZE: u8 = 9;
pub const MAX_CODE_SIZE: u8 = 12;
pub const MAX_TABLE_SIZE: usize = 1 << MAX_CODE_SIZE;
// 256 literals plus the clear code
const INITIAL_TABLE_SIZE: usize = 0x101;
const LITERAL_COUNT: usize = 0x100;

/// Where a dictionary string lives in the output buffer.
///
/// Every string added to the table is the previous string followed by the
/// first byte of the current one, and both were emitted back to back, so the
/// whole entry already sits contiguously in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

/// Code table bookkeeping, updated once per emitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTableState {
    pub code_size: u8,
    pub table_size: usize,
    pub table_max: usize,
    pub is_full: bool,
}

impl CodeTableState {
    pub fn new() -> Self {
        CodeTableState {
            code_size: INITIAL_CODE_SIZE,
            table_size: INITIAL_TABLE_SIZE,
            table_max: 1 << INITIAL_CODE_SIZE,
            is_full: false,
        }
    }

    /// Account for one new entry. The code size grows when the table reaches
    /// the current power of two, and the table freezes at 12 bits / 4096 entries.
    pub fn grow(&mut self) {
        if self.is_full {
            return;
        }

        self.table_size += 1;
        if self.table_size == self.table_max && self.code_size < MAX_CODE_SIZE {
            self.code_size += 1;
            self.table_max = 1 << self.code_size;
            trace!(
                "LZW code size now {} bits at table size {}",
                self.code_size,
                self.table_size
            );
        } else if self.table_size >= self.table_max {
            self.is_full = true;
        }
    }
}

impl Default for CodeTableState {
    fn default() -> Self {
        Self::new()
    }
}

/// String table for codes 257 and up. Literals and the clear code are implicit.
#[derive(Debug)]
struct Dictionary {
    entries: Vec<Span>,
    state: CodeTableState,
}

impl Dictionary {
    fn new() -> Self {
        Dictionary {
            entries: Vec::with_capacity(MAX_TABLE_SIZE - INITIAL_TABLE_SIZE),
            state: CodeTableState::new(),
        }
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.state = CodeTableState::new();
    }

    fn lookup(&self, code: u16) -> Option<Span> {
        let code = code as usize;
        if code >= self.state.table_size || code < INITIAL_TABLE_SIZE {
            return None;
        }
        self.entries.get(code - INITIAL_TABLE_SIZE).copied()
    }

    fn push(&mut self, span: Span) {
        if self.state.is_full {
            return;
        }
        self.entries.push(span);
        self.state.grow();
    }
}

/// Passive block counter. It tracks bits read since the last realignment and
/// wraps every `code_size * 8` bits; only a clear code turns it into a skip.
#[derive(Debug, Default)]
struct BlockCounter {
    pending_bits: u32,
}

impl BlockCounter {
    fn consume(&mut self, code_size: u8) {
        let block = code_size as u32 * 8;
        self.pending_bits += code_size as u32;
        if self.pending_bits >= block {
            self.pending_bits -= block;
        }
    }

    fn bits_to_boundary(&self, code_size: u8) -> u32 {
        if self.pending_bits == 0 {
            0
        } else {
            code_size as u32 * 8 - self.pending_bits
        }
    }
}

/// Decompress a block-aligned LZW stream into at most `expected` bytes.
pub fn decompress(data: &[u8], expected: usize) -> Decoded {
    let mut reader = BitReader::new(data);
    let mut dictionary = Dictionary::new();
    let mut counter = BlockCounter::default();
    // Only a hint; the declared size is untrusted
    let mut output: Vec<u8> = Vec::with_capacity(expected.min(data.len().saturating_mul(8)));
    let mut previous: Option<Span> = None;
    let mut issue = None;

    while output.len() < expected {
        let code_size = dictionary.state.code_size;
        let Some(code) = reader.read_bits(code_size) else {
            break;
        };
        counter.consume(code_size);

        if code == CLEAR_CODE {
            realign(&mut reader, &counter, code_size);
            counter = BlockCounter::default();
            dictionary.reset();
            previous = None;
            continue;
        }

        let start = output.len();
        let current = if (code as usize) < LITERAL_COUNT {
            output.push(code as u8);
            Span { start, len: 1 }
        } else if let Some(entry) = dictionary.lookup(code) {
            output.extend_from_within(entry.start..entry.start + entry.len);
            Span {
                start,
                len: entry.len,
            }
        } else if let Some(prev) =
            previous.filter(|_| code as usize == dictionary.state.table_size)
        {
            // Code not in the table yet: previous string plus its own first byte
            let first = output[prev.start];
            output.extend_from_within(prev.start..prev.start + prev.len);
            output.push(first);
            Span {
                start,
                len: prev.len + 1,
            }
        } else {
            debug!(
                "Invalid LZW code {} (table size {}, output {}/{})",
                code,
                dictionary.state.table_size,
                output.len(),
                expected
            );
            issue = Some(DecodeIssue::InvalidDictionaryCode {
                code,
                table_size: dictionary.state.table_size,
            });
            break;
        };

        if let Some(prev) = previous {
            dictionary.push(Span {
                start: prev.start,
                len: prev.len + 1,
            });
        }
        previous = Some(current);
    }

    output.truncate(expected);
    if issue.is_none() && output.len() < expected {
        issue = Some(DecodeIssue::StreamExhausted {
            position: reader.position(),
            produced: output.len(),
        });
    }

    Decoded {
        data: output,
        issue,
    }
}

/// Skip to the end of the current block after a clear code.
///
/// The running counter decides the skip. The cursor-derived distance is
/// computed as well and any disagreement is logged, since the two only match
/// while the code size stays put between clears.
fn realign(reader: &mut BitReader, counter: &BlockCounter, code_size: u8) {
    let skip = counter.bits_to_boundary(code_size);
    let from_cursor = reader.bits_to_block_boundary(code_size);
    if skip != from_cursor {
        debug!(
            "LZW block skip mismatch: counter says {} bits, cursor says {} ({} bits since align)",
            skip,
            from_cursor,
            reader.bits_since_align()
        );
    }
    reader.skip_bits(skip);
    reader.mark_aligned();
}
