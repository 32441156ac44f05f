#![allow(dead_code)]

use std::collections::HashMap;

use dynapak::containers::compression::lzw::{CodeTableState, CLEAR_CODE, MAX_TABLE_SIZE};
use dynapak::containers::tlv::CONTAINER_FLAG;

/// LSB-first bit packer.
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_count: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            bit_count: 0,
        }
    }

    pub fn write(&mut self, value: u32, bits: u32) {
        for i in 0..bits {
            if self.bit_count % 8 == 0 {
                self.bytes.push(0);
            }
            if value.checked_shr(i).unwrap_or(0) & 1 != 0 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (self.bit_count % 8);
            }
            self.bit_count += 1;
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Greedy LZW encoder producing streams in the block-aligned screen layout.
///
/// Code widths follow the decoder's table schedule, and a clear code is
/// followed by zero bits up to the end of the current `code_size * 8` block.
pub struct LzwEncoder {
    writer: BitWriter,
    state: CodeTableState,
    table: HashMap<Vec<u8>, u16>,
    next_code: usize,
    codes_since_clear: usize,
    block_bits: u32,
    // Last string of the previous `encode` call, still waiting for its entry
    pending: Option<Vec<u8>>,
}

impl LzwEncoder {
    pub fn new() -> Self {
        LzwEncoder {
            writer: BitWriter::new(),
            state: CodeTableState::new(),
            table: HashMap::new(),
            next_code: CLEAR_CODE as usize + 1,
            codes_since_clear: 0,
            block_bits: 0,
            pending: None,
        }
    }

    fn emit(&mut self, code: u16) {
        let code_size = self.state.code_size as u32;
        self.writer.write(code as u32, code_size);
        self.block_bits += code_size;
        if self.block_bits >= code_size * 8 {
            self.block_bits -= code_size * 8;
        }
    }

    fn emit_data_code(&mut self, code: u16) {
        self.emit(code);
        if self.codes_since_clear > 0 {
            self.state.grow();
        }
        self.codes_since_clear += 1;
    }

    /// Encode `data` greedily. The dictionary carries over between calls
    /// until `clear` is called.
    pub fn encode(&mut self, data: &[u8]) {
        let mut current: Vec<u8> = Vec::new();
        if let (Some(mut tail), Some(&first)) = (self.pending.take(), data.first()) {
            tail.push(first);
            self.add_entry(tail);
        }
        for &byte in data {
            let mut candidate = current.clone();
            candidate.push(byte);
            if current.is_empty() || self.code_for(&candidate).is_some() {
                current = candidate;
                continue;
            }

            let code = self.code_for(&current).unwrap_or_default();
            self.emit_data_code(code);
            self.add_entry(candidate);
            current = vec![byte];
        }
        if !current.is_empty() {
            let code = self.code_for(&current).unwrap_or_default();
            self.emit_data_code(code);
            self.pending = Some(current);
        }
    }

    fn add_entry(&mut self, string: Vec<u8>) {
        if self.next_code < MAX_TABLE_SIZE {
            self.table.insert(string, self.next_code as u16);
            self.next_code += 1;
        }
    }

    fn code_for(&self, string: &[u8]) -> Option<u16> {
        if string.len() == 1 {
            return Some(string[0] as u16);
        }
        self.table.get(string).copied()
    }

    /// Emit a clear code, pad to the block boundary and reset the table.
    pub fn clear(&mut self) {
        let code_size = self.state.code_size as u32;
        self.emit(CLEAR_CODE);
        if self.block_bits != 0 {
            self.writer.write(0, code_size * 8 - self.block_bits);
        }
        self.block_bits = 0;
        self.state = CodeTableState::new();
        self.table.clear();
        self.next_code = CLEAR_CODE as usize + 1;
        self.codes_since_clear = 0;
        self.pending = None;
    }

    /// Current code width, for tests that check the schedule.
    pub fn code_size(&self) -> u8 {
        self.state.code_size
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

pub fn lzw_encode(data: &[u8]) -> Vec<u8> {
    let mut encoder = LzwEncoder::new();
    encoder.encode(data);
    encoder.finish()
}

/// RLE in the screen format: repeats for runs of 3 or more, literals otherwise.
pub fn rle_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut literals: Vec<u8> = Vec::new();
    let mut i = 0;

    let flush = |out: &mut Vec<u8>, literals: &mut Vec<u8>| {
        for chunk in literals.chunks(0x7F) {
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        literals.clear();
    };

    while i < data.len() {
        let byte = data[i];
        let run = data[i..]
            .iter()
            .take(0x7F)
            .take_while(|&&b| b == byte)
            .count();
        if run >= 3 {
            flush(&mut out, &mut literals);
            out.push(0x80 | run as u8);
            out.push(byte);
            i += run;
        } else {
            literals.push(byte);
            i += 1;
        }
    }
    flush(&mut out, &mut literals);
    out
}

/// Block sub-header (method, uncompressed size) followed by the payload.
pub fn block(method: u8, uncompressed_size: usize, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![method];
    out.extend_from_slice(&(uncompressed_size as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn section(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

pub fn container(tag: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let body = children.concat();
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32 | CONTAINER_FLAG).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn dim(width: u16, height: u16) -> Vec<u8> {
    let mut body = width.to_le_bytes().to_vec();
    body.extend_from_slice(&height.to_le_bytes());
    section(b"DIM:", &body)
}

/// Deterministic pseudo-random bytes below `limit`.
pub fn noise(len: usize, seed: u32, limit: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((state >> 16) % limit) as u8
        })
        .collect()
}

/// Pack 4-bit values two per byte, first pixel in the low nibble.
pub fn pack_low_first(nibbles: &[u8]) -> Vec<u8> {
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] & 0x0F) | (pair.get(1).copied().unwrap_or(0) << 4))
        .collect()
}

/// Pack 4-bit values two per byte, first pixel in the high nibble.
pub fn pack_high_first(nibbles: &[u8]) -> Vec<u8> {
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | (pair.get(1).copied().unwrap_or(0) & 0x0F))
        .collect()
}
