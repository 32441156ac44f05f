use log::warn;

/// Order in which the two 4-bit pixels of a packed byte are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NibbleOrder {
    LowFirst,
    HighFirst,
}

/// The low-nibble plane (`BIN:`) stores its first pixel in the low nibble.
pub const LOW_PLANE_ORDER: NibbleOrder = NibbleOrder::LowFirst;
/// The high-nibble plane (`VGA:`) stores its first pixel in the high nibble.
pub const HIGH_PLANE_ORDER: NibbleOrder = NibbleOrder::HighFirst;

/// One 4-bit component per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelPlane {
    pub width: usize,
    pub height: usize,
    pub nibbles: Vec<u8>,
}

impl PixelPlane {
    /// Unpack a 2-pixels-per-byte buffer. Pixels past the end of `packed` are 0.
    pub fn unpack(packed: &[u8], width: usize, height: usize, order: NibbleOrder) -> Self {
        let pixel_count = width * height;
        let mut nibbles = vec![0u8; pixel_count];

        for (i, &byte) in packed.iter().take(pixel_count / 2).enumerate() {
            let (first, second) = match order {
                NibbleOrder::LowFirst => (byte & 0x0F, byte >> 4),
                NibbleOrder::HighFirst => (byte >> 4, byte & 0x0F),
            };
            nibbles[i * 2] = first;
            nibbles[i * 2 + 1] = second;
        }

        PixelPlane {
            width,
            height,
            nibbles,
        }
    }
}

/// Merge a low and a high plane into 8-bit palette indices.
pub fn combine_planes(low: &PixelPlane, high: &PixelPlane) -> Vec<u8> {
    low.nibbles
        .iter()
        .zip(&high.nibbles)
        .map(|(&lo, &hi)| lo | (hi << 4))
        .collect()
}

/// Build `width * height` palette indices from one or two decoded planes.
///
/// With both planes present they are combined. A lone plane holding exactly
/// one byte per pixel is already 8-bit; otherwise it is a 16-color plane.
pub fn reconstruct(low: &[u8], high: Option<&[u8]>, width: usize, height: usize) -> Vec<u8> {
    let pixel_count = width * height;

    if let Some(high) = high {
        let low = PixelPlane::unpack(low, width, height, LOW_PLANE_ORDER);
        let high = PixelPlane::unpack(high, width, height, HIGH_PLANE_ORDER);
        return combine_planes(&low, &high);
    }

    if low.len() == pixel_count {
        return low.to_vec();
    }

    if low.len() != pixel_count / 2 {
        warn!(
            "Single plane of {} bytes fits neither {} (8-bit) nor {} (4-bit)",
            low.len(),
            pixel_count,
            pixel_count / 2
        );
    }
    PixelPlane::unpack(low, width, height, LOW_PLANE_ORDER).nibbles
}
