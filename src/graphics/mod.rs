//! Pixel reconstruction and rendering
//!
//! Turns decoded planes into palette indices and resolves those indices to
//! RGBA images for output.

pub mod nibble;
pub mod render;

pub use nibble::{combine_planes, reconstruct, NibbleOrder, PixelPlane};
pub use render::{palette_swatch, save_png, to_rgba_image, RenderOptions};
