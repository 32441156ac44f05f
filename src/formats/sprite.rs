use log::{debug, warn};

use crate::binary_utils::read_u8;
use crate::containers::compression::lz77::{self, ColorTable, COLOR_TABLE_SIZE};
use crate::error::{DecodeIssue, FormatError};

const SPRITE_HEADER_SIZE: usize = 2;

/// Palette index drawn as transparent in sprite bitmaps.
pub const TRANSPARENT_INDEX: u8 = 0;

const fn team_table(outline: [u8; 16], trim: [u8; 16]) -> ColorTable {
    let mut entries = [0u8; COLOR_TABLE_SIZE];
    let mut i = 0;
    while i < 4 {
        entries[16 + i] = 0x10 + i as u8;
        i += 1;
    }
    i = 0;
    while i < 16 {
        entries[32 + i] = outline[i];
        entries[48 + i] = trim[i];
        i += 1;
    }
    ColorTable::new(entries)
}

const fn run(base: u8) -> [u8; 16] {
    let mut out = [0u8; 16];
    let mut i = 0;
    while i < 12 {
        out[i] = base + i as u8;
        i += 1;
    }
    out
}

const fn jersey(base: u8) -> [u8; 16] {
    let mut out = run(base);
    out[12] = 0x2C;
    out[13] = 0x2D;
    out
}

const fn pants(base: u8) -> [u8; 16] {
    let mut out = run(base);
    out[12] = 0x3C;
    out[13] = 0x3D;
    out[14] = 0x3E;
    out[15] = 0x3F;
    out
}

const fn outline_only() -> ColorTable {
    let mut entries = [0u8; COLOR_TABLE_SIZE];
    entries[46] = 0x2E;
    entries[47] = 0x2F;
    ColorTable::new(entries)
}

/// Color tables shipped with the game. Table 0 keeps only outline colors,
/// tables 1 to 4 remap the two team color ramps.
pub const TEAM_COLOR_TABLES: [ColorTable; 5] = [
    outline_only(),
    team_table(jersey(0x30), pants(0x20)),
    team_table(jersey(0x20), pants(0x20)),
    team_table(jersey(0x30), pants(0x30)),
    team_table(jersey(0x20), pants(0x30)),
];

/// A sprite bitmap decoded to row-major palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    pub issue: Option<DecodeIssue>,
}

impl Sprite {
    /// Decode a sprite record: `width: u8`, `height: u8`, then an LZ77 stream
    /// of column-major pixels.
    pub fn from_bytes(data: &[u8], color_table: &ColorTable) -> Result<Self, FormatError> {
        let (Some(width), Some(height)) = (read_u8(data, 0), read_u8(data, 1)) else {
            return Err(FormatError::TooShort {
                what: "sprite header",
                needed: SPRITE_HEADER_SIZE,
                got: data.len(),
            });
        };
        let (width, height) = (width as usize, height as usize);

        let decoded = lz77::decompress(&data[SPRITE_HEADER_SIZE..], color_table);
        let expected = width * height;
        let mut issue = decoded.issue;

        if decoded.data.len() < expected {
            warn!(
                "Sprite {}x{} decoded to {} of {} pixels",
                width,
                height,
                decoded.data.len(),
                expected
            );
            if issue.is_none() {
                issue = Some(DecodeIssue::StreamExhausted {
                    position: data.len(),
                    produced: decoded.data.len(),
                });
            }
        }

        debug!("Decoded {}x{} sprite", width, height);
        Ok(Sprite {
            width,
            height,
            pixels: column_to_row_major(&decoded.data, width, height),
            issue,
        })
    }
}

/// Pixels are stored column by column. Missing pixels are 0.
fn column_to_row_major(column_major: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut row_major = vec![0u8; width * height];
    for x in 0..width {
        for y in 0..height {
            if let Some(&pixel) = column_major.get(x * height + y) {
                row_major[y * width + x] = pixel;
            }
        }
    }
    row_major
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sprite record whose body is all literals.
    fn literal_sprite(width: u8, height: u8, literals: &[u8]) -> Vec<u8> {
        let groups = literals.len() / 8;
        let tail = literals.len() % 8;
        let mut data = vec![width, height];
        data.extend_from_slice(&((groups as u16).wrapping_sub(1)).to_le_bytes());
        data.push(tail as u8);
        for chunk in literals.chunks(8) {
            data.push(0x00);
            data.extend_from_slice(chunk);
        }
        data
    }

    #[test]
    fn test_column_major_is_transposed() {
        // 2 wide, 3 tall: columns 41 42 43 and 44 45 46
        let data = literal_sprite(2, 3, &[0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48]);
        let sprite = Sprite::from_bytes(&data, &ColorTable::identity()).unwrap();
        assert_eq!(sprite.pixels, vec![0x41, 0x44, 0x42, 0x45, 0x43, 0x46]);
        assert!(sprite.issue.is_none());
    }

    #[test]
    fn test_team_table_remaps_literals() {
        let data = literal_sprite(2, 2, &[0x10, 0x20, 0x30, 0x2E, 0, 0, 0, 0]);
        let sprite = Sprite::from_bytes(&data, &TEAM_COLOR_TABLES[1]).unwrap();
        // column-major [0x10, 0x30, 0x20, 0x00] after remapping
        assert_eq!(sprite.pixels, vec![0x10, 0x20, 0x30, 0x00]);
    }

    #[test]
    fn test_short_body_pads_with_transparent() {
        let data = literal_sprite(4, 4, &[0x50; 8]);
        let sprite = Sprite::from_bytes(&data, &ColorTable::identity()).unwrap();
        assert_eq!(sprite.pixels.len(), 16);
        assert_eq!(sprite.pixels.iter().filter(|&&p| p == 0x50).count(), 8);
        assert!(matches!(sprite.issue, Some(DecodeIssue::StreamExhausted { .. })));
    }

    #[test]
    fn test_header_too_short() {
        assert!(matches!(
            Sprite::from_bytes(&[3], &ColorTable::identity()),
            Err(FormatError::TooShort { .. })
        ));
    }

    #[test]
    fn test_team_tables_match_game_data() {
        let table = TEAM_COLOR_TABLES[3];
        assert_eq!(table.map(0x13), 0x13);
        assert_eq!(table.map(0x20), 0x30);
        assert_eq!(table.map(0x2D), 0x2D);
        assert_eq!(table.map(0x2E), 0x00);
        assert_eq!(table.map(0x30), 0x30);
        assert_eq!(table.map(0x3F), 0x3F);
        assert_eq!(TEAM_COLOR_TABLES[0].map(0x2F), 0x2F);
        assert_eq!(TEAM_COLOR_TABLES[0].map(0x30), 0x00);
    }
}
