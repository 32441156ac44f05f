use std::fs;
use std::io;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{info, warn};

use crate::formats::pal::Palette;

/// How palette indices become an RGBA image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Index drawn fully transparent, if any. Sprites use 0.
    pub transparent_index: Option<u8>,
    /// Integer nearest-neighbour upscale factor.
    pub scale: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            transparent_index: None,
            scale: 1,
        }
    }
}

/// Resolve palette indices to colors. Missing pixels come out black.
pub fn to_rgba_image(
    pixels: &[u8],
    width: u32,
    height: u32,
    palette: &Palette,
    options: &RenderOptions,
) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);

    for (i, pixel) in image.pixels_mut().enumerate() {
        let Some(&index) = pixels.get(i) else {
            *pixel = Rgba([0, 0, 0, 255]);
            continue;
        };
        if options.transparent_index == Some(index) {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }
        let [r, g, b] = palette.color(index);
        *pixel = Rgba([r, g, b, 255]);
    }

    if options.scale > 1 {
        image = imageops::resize(
            &image,
            width * options.scale,
            height * options.scale,
            FilterType::Nearest,
        );
    }
    image
}

/// 16 by 16 grid of `cell` sized squares, one per palette entry.
pub fn palette_swatch(palette: &Palette, cell: u32) -> RgbaImage {
    let cell = cell.max(1);
    RgbaImage::from_fn(16 * cell, 16 * cell, |x, y| {
        let index = (y / cell) * 16 + x / cell;
        let [r, g, b] = palette.color(index as u8);
        Rgba([r, g, b, 255])
    })
}

/// Write `image` as PNG, then run it through oxipng. If optimisation fails the
/// unoptimised file is kept.
pub fn save_png(image: &RgbaImage, path: &Path, optimise: bool) -> io::Result<()> {
    if !optimise {
        image
            .save(path)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        info!("Saved {}", path.display());
        return Ok(());
    }

    let temp_path = path.with_extension("temp.png");
    image
        .save(&temp_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;
    options.interlace = None;

    match oxipng::optimize(
        &oxipng::InFile::Path(temp_path.clone()),
        &oxipng::OutFile::Path(Some(path.to_path_buf())),
        &options,
    ) {
        Ok(_) => {
            let _ = fs::remove_file(temp_path);
        }
        Err(e) => {
            fs::rename(&temp_path, path)?;
            warn!(
                "oxipng optimisation failed for {}: {}. File saved unoptimised.",
                path.display(),
                e
            );
        }
    }
    info!("Saved {}", path.display());
    Ok(())
}
