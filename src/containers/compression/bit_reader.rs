/// Largest code width a single `read_bits` call accepts.
pub const MAX_READ_BITS: u8 = 15;

const BIT_MASKS: [u16; 16] = [
    0x0000, 0x0001, 0x0003, 0x0007, 0x000F, 0x001F, 0x003F, 0x007F, 0x00FF, 0x01FF, 0x03FF,
    0x07FF, 0x0FFF, 0x1FFF, 0x3FFF, 0x7FFF,
];

/// LSB-first variable width code reader.
///
/// Bits are taken from the low end of each byte first, and a partially
/// consumed byte stays buffered between calls. The reader also counts how many
/// bits were consumed since the last alignment event so block-aligned formats
/// can realign to `code_size * 8` bit boundaries.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_buffer: u8,
    bits_available: u8,
    bits_since_align: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_pos: 0,
            bit_buffer: 0,
            bits_available: 0,
            bits_since_align: 0,
        }
    }

    /// Read an `n` bit code, 1 <= n <= 15. Returns `None` once the input runs
    /// out mid-code; the bits read up to that point are lost.
    pub fn read_bits(&mut self, n: u8) -> Option<u16> {
        debug_assert!((1..=MAX_READ_BITS).contains(&n), "bad code width {}", n);

        let mut result: u16 = 0;
        let mut placed = 0u8;

        while placed < n {
            if self.bits_available == 0 {
                self.bit_buffer = *self.data.get(self.byte_pos)?;
                self.byte_pos += 1;
                self.bits_available = 8;
            }

            let take = (n - placed).min(self.bits_available);
            let extracted = self.bit_buffer as u16 & BIT_MASKS[take as usize];
            result |= extracted << placed;

            // Shifting a u8 by 8 would overflow, and in that case the buffer is spent anyway
            self.bit_buffer = if take >= 8 { 0 } else { self.bit_buffer >> take };
            self.bits_available -= take;
            placed += take;
        }

        self.bits_since_align += n as u64;
        Some(result)
    }

    /// Discard `n` bits. Returns false if the input ran out first.
    pub fn skip_bits(&mut self, mut n: u32) -> bool {
        while n > 0 {
            let chunk = n.min(MAX_READ_BITS as u32) as u8;
            if self.read_bits(chunk).is_none() {
                return false;
            }
            n -= chunk as u32;
        }
        true
    }

    /// Bits still needed to reach the next `code_size * 8` boundary, counted
    /// from the last alignment event.
    pub fn bits_to_block_boundary(&self, code_size: u8) -> u32 {
        let block = code_size as u64 * 8;
        let into_block = self.bits_since_align % block;
        if into_block == 0 {
            0
        } else {
            (block - into_block) as u32
        }
    }

    /// Skip to the next `code_size * 8` bit boundary and start a new block.
    pub fn align_to_block(&mut self, code_size: u8) -> bool {
        let skip = self.bits_to_block_boundary(code_size);
        let ok = self.skip_bits(skip);
        self.mark_aligned();
        ok
    }

    pub fn mark_aligned(&mut self) {
        self.bits_since_align = 0;
    }

    pub fn bits_since_align(&self) -> u64 {
        self.bits_since_align
    }

    /// Index of the next unread byte in the source.
    pub fn position(&self) -> usize {
        self.byte_pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.bits_available == 0 && self.byte_pos >= self.data.len()
    }
}
