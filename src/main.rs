use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};
use serde::Serialize;

use dynapak::containers::compression::lz77::ColorTable;
use dynapak::formats::sprite::{TEAM_COLOR_TABLES, TRANSPARENT_INDEX};
use dynapak::graphics::{self, RenderOptions};
use dynapak::{
    fingerprint, walk, ContainerHandler, FormatError, Palette, Screen, Section, SectionBody,
    SectionList, Sprite, WalkOptions,
};

#[derive(Parser)]
#[command(name = "dynapak", about = "Front Page Sports: Football Pro asset decoder")]
struct Cli {
    /// Log decoder detail.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tagged sections of a container file.
    Sections {
        file: PathBuf,
        /// Print a JSON report instead of a tree.
        #[arg(long)]
        json: bool,
        /// Do not decode image planes.
        #[arg(long)]
        structural: bool,
    },
    /// Decode a .SCR screen to PNG.
    Screen {
        file: PathBuf,
        /// .PAL file; grayscale when omitted.
        #[arg(short, long)]
        palette: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 1)]
        scale: u32,
        /// Skip the oxipng pass.
        #[arg(long)]
        no_optimise: bool,
    },
    /// Decode one sprite record to PNG.
    Sprite {
        file: PathBuf,
        /// Byte offset of the sprite header in the file.
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Team color table 0-4; identity when omitted.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..5))]
        color_table: Option<u8>,
        #[arg(short, long)]
        palette: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 4)]
        scale: u32,
        #[arg(long)]
        no_optimise: bool,
    },
    /// Render a palette as a 16x16 swatch.
    Palette {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 16)]
        cell: u32,
    },
}

#[derive(Serialize)]
struct BlockFingerprint {
    tag: String,
    offset: usize,
    len: usize,
    xxh64: String,
}

#[derive(Serialize)]
struct SectionReport<'a> {
    file: String,
    sections: &'a SectionList,
    fingerprints: Vec<BlockFingerprint>,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> io::Result<()> {
    match command {
        Command::Sections {
            file,
            json,
            structural,
        } => list_sections(&file, json, structural),
        Command::Screen {
            file,
            palette,
            output,
            scale,
            no_optimise,
        } => {
            let data = fs::read(&file)?;
            let screen = Screen::deserialise(&data).map_err(invalid_data)?;
            if !screen.is_complete() {
                warn!(
                    "{} decoded partially ({} condition(s))",
                    file.display(),
                    screen.issues.len()
                );
            }
            info!(
                "{}: {}x{}, xxh64 {:016x}",
                file.display(),
                screen.width,
                screen.height,
                fingerprint(&screen.pixels)
            );

            let palette = load_palette(palette.as_deref())?;
            let options = RenderOptions {
                transparent_index: None,
                scale,
            };
            let image = graphics::to_rgba_image(
                &screen.pixels,
                screen.width as u32,
                screen.height as u32,
                &palette,
                &options,
            );
            create_parent_dir(&output)?;
            graphics::save_png(&image, &output, !no_optimise)
        }
        Command::Sprite {
            file,
            offset,
            color_table,
            palette,
            output,
            scale,
            no_optimise,
        } => {
            let data = fs::read(&file)?;
            let record = data.get(offset..).ok_or_else(|| {
                invalid_data(FormatError::TooShort {
                    what: "sprite offset",
                    needed: offset,
                    got: data.len(),
                })
            })?;
            let table = match color_table {
                Some(index) => TEAM_COLOR_TABLES[index as usize],
                None => ColorTable::identity(),
            };

            let sprite = Sprite::from_bytes(record, &table).map_err(invalid_data)?;
            if let Some(issue) = &sprite.issue {
                warn!("Sprite at offset {}: {}", offset, issue);
            }

            let palette = load_palette(palette.as_deref())?;
            let options = RenderOptions {
                transparent_index: Some(TRANSPARENT_INDEX),
                scale,
            };
            let image = graphics::to_rgba_image(
                &sprite.pixels,
                sprite.width as u32,
                sprite.height as u32,
                &palette,
                &options,
            );
            create_parent_dir(&output)?;
            graphics::save_png(&image, &output, !no_optimise)
        }
        Command::Palette { file, output, cell } => {
            let palette = load_palette(Some(&file))?;
            create_parent_dir(&output)?;
            graphics::save_png(&graphics::palette_swatch(&palette, cell), &output, true)
        }
    }
}

fn list_sections(file: &Path, json: bool, structural: bool) -> io::Result<()> {
    let data = fs::read(file)?;
    let options = if structural {
        WalkOptions::structural()
    } else {
        WalkOptions::default()
    };
    let sections = walk(&data, &options);

    if json {
        let fingerprints = sections
            .flatten()
            .into_iter()
            .filter_map(|section| {
                section.block().map(|block| BlockFingerprint {
                    tag: section.tag.to_string(),
                    offset: section.offset,
                    len: block.data.len(),
                    xxh64: format!("{:016x}", fingerprint(&block.data)),
                })
            })
            .collect();
        let report = SectionReport {
            file: file.display().to_string(),
            sections: &sections,
            fingerprints,
        };
        let stdout = io::stdout().lock();
        serde_json::to_writer_pretty(stdout, &report)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        println!();
    } else {
        print_tree(&sections.sections, 0);
        if let Some(issue) = &sections.issue {
            println!("! {}", issue);
        }
    }
    Ok(())
}

fn print_tree(sections: &[Section], depth: usize) {
    for section in sections {
        let detail = match &section.body {
            SectionBody::Children { children } => format!("{} children", children.len()),
            SectionBody::Block(block) => format!(
                "{:?} {} -> {} bytes, xxh64 {:016x}",
                block.method,
                block.payload.len(),
                block.data.len(),
                fingerprint(&block.data)
            ),
            SectionBody::Raw { span } => format!("{} raw bytes", span.len()),
            SectionBody::Missing => "missing".to_string(),
        };
        println!(
            "{:indent$}{} @ {:#x} size {}: {}",
            "",
            section.tag,
            section.offset,
            section.declared_size,
            detail,
            indent = depth * 2
        );
        if let Some(issue) = &section.issue {
            println!("{:indent$}! {}", "", issue, indent = depth * 2 + 2);
        }
        print_tree(section.children(), depth + 1);
    }
}

fn load_palette(path: Option<&Path>) -> io::Result<Palette> {
    match path {
        Some(path) => Palette::from_bytes(&fs::read(path)?).map_err(invalid_data),
        None => Ok(Palette::grayscale()),
    }
}

fn create_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn invalid_data(e: FormatError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}
