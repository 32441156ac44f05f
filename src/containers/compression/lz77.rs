use super::Decoded;
use crate::binary_utils::{read_u16_le, read_u8};
use crate::error::DecodeIssue;

// LZ77 variant used by sprite bitmaps. A 3 byte header gives the number of
// 8-decision groups (minus one) and the decisions left over for a final flag byte.

pub const LZ77_HEADER_SIZE: usize = 3;
const MIN_MATCH_LEN: usize = 3;
const MATCH_LEN_MASK: u16 = 0x0F;
const DISTANCE_SHIFT: u16 = 4;

/// Number of remappable literal values.
pub const COLOR_TABLE_SIZE: usize = 64;

/// Remaps literal bytes below 64 to palette indices. Back-reference bytes are
/// copied from the output and therefore already mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTable([u8; COLOR_TABLE_SIZE]);

impl ColorTable {
    pub const fn new(entries: [u8; COLOR_TABLE_SIZE]) -> Self {
        ColorTable(entries)
    }

    /// Passes every literal through unchanged.
    pub const fn identity() -> Self {
        let mut entries = [0u8; COLOR_TABLE_SIZE];
        let mut i = 0;
        while i < COLOR_TABLE_SIZE {
            entries[i] = i as u8;
            i += 1;
        }
        ColorTable(entries)
    }

    pub fn map(&self, literal: u8) -> u8 {
        match self.0.get(literal as usize) {
            Some(&mapped) => mapped,
            None => literal,
        }
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        ColorTable::identity()
    }
}

/// Decompress an LZ77 sprite stream starting at its 3 byte header.
///
/// There is no end marker: decoding ends once every declared group and tail
/// decision was consumed. The caller knows the sprite dimensions and checks
/// the length itself.
pub fn decompress(data: &[u8], color_table: &ColorTable) -> Decoded {
    let (Some(groups_minus_one), Some(tail_bits)) = (read_u16_le(data, 0), read_u8(data, 2))
    else {
        return Decoded::partial(
            Vec::new(),
            DecodeIssue::StreamExhausted {
                position: data.len(),
                produced: 0,
            },
        );
    };

    let mut decoder = Lz77Decoder {
        data,
        pos: LZ77_HEADER_SIZE,
        color_table,
        output: Vec::new(),
    };

    let groups = groups_minus_one as usize + 1;
    let mut result = Ok(());
    for _ in 0..groups {
        result = decoder.run_group(8);
        if result.is_err() {
            break;
        }
    }
    if result.is_ok() && tail_bits > 0 {
        result = decoder.run_group(tail_bits);
    }

    let pos = decoder.pos;
    let output = decoder.output;
    match result {
        Ok(()) => Decoded::complete(output),
        Err(()) => {
            let produced = output.len();
            Decoded::partial(
                output,
                DecodeIssue::StreamExhausted {
                    position: pos,
                    produced,
                },
            )
        }
    }
}

struct Lz77Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    color_table: &'a ColorTable,
    output: Vec<u8>,
}

impl Lz77Decoder<'_> {
    /// Read one flag byte and run `decisions` of its bits, most significant first.
    /// Decisions past the eighth have no flag bit left and are literals.
    /// `Err` means the input ran out.
    fn run_group(&mut self, decisions: u8) -> Result<(), ()> {
        let flags = self.next_byte()?;
        for bit in 0..decisions {
            let is_reference = bit < 8 && flags & (0x80 >> bit) != 0;
            if is_reference {
                self.back_reference()?;
            } else {
                self.literal()?;
            }
        }
        Ok(())
    }

    fn literal(&mut self) -> Result<(), ()> {
        let value = self.next_byte()?;
        let mapped = if (value as usize) < COLOR_TABLE_SIZE {
            self.color_table.map(value)
        } else {
            value
        };
        self.output.push(mapped);
        Ok(())
    }

    fn back_reference(&mut self) -> Result<(), ()> {
        let reference = read_u16_le(self.data, self.pos).ok_or(())?;
        self.pos += 2;

        let copy_len = (reference & MATCH_LEN_MASK) as usize + MIN_MATCH_LEN;
        let distance = (reference >> DISTANCE_SHIFT) as isize;
        let copy_pos = self.output.len() as isize - distance - 1;

        // Byte by byte so overlapping copies repeat the bytes they just wrote
        for i in 0..copy_len as isize {
            let src = copy_pos + i;
            let byte = if src >= 0 && (src as usize) < self.output.len() {
                self.output[src as usize]
            } else {
                0
            };
            self.output.push(byte);
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<u8, ()> {
        let byte = read_u8(self.data, self.pos).ok_or(())?;
        self.pos += 1;
        Ok(byte)
    }
}
