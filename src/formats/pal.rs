use crate::containers::ContainerHandler;
use crate::error::FormatError;

pub const PALETTE_COLORS: usize = 256;
// "PAL:" and "VGA:" section headers, 8 bytes each
const PAL_HEADER_SIZE: usize = 16;
const VGA_SCALE: u16 = 4;

/// 256 RGB colors. VGA palettes store 6-bit components which are scaled up
/// by 4 and clamped to 255 on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    /// Load from a `.PAL` file, or from bare triples when the magic is absent.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let offset = if Self::matches(data) {
            PAL_HEADER_SIZE
        } else {
            0
        };
        Self::from_vga_triples(data.get(offset..).unwrap_or(&[]))
    }

    fn from_vga_triples(data: &[u8]) -> Result<Self, FormatError> {
        let needed = PALETTE_COLORS * 3;
        if data.len() < needed {
            return Err(FormatError::TooShort {
                what: "palette",
                needed,
                got: data.len(),
            });
        }

        let scale = |v: u8| (v as u16 * VGA_SCALE).min(255) as u8;
        let colors = data[..needed]
            .chunks_exact(3)
            .map(|c| [scale(c[0]), scale(c[1]), scale(c[2])])
            .collect();
        Ok(Palette { colors })
    }

    /// Index `i` maps to gray level `i`.
    pub fn grayscale() -> Self {
        Palette {
            colors: (0..PALETTE_COLORS).map(|i| [i as u8; 3]).collect(),
        }
    }

    pub fn color(&self, index: u8) -> [u8; 3] {
        self.colors[index as usize]
    }
}

impl ContainerHandler for Palette {
    fn magic_word() -> &'static [u8] {
        b"PAL:"
    }

    fn deserialise(data: &[u8]) -> Result<Self, FormatError> {
        if !Self::matches(data) {
            return Err(FormatError::InvalidMagic { expected: "PAL:" });
        }
        Self::from_bytes(data)
    }
}
