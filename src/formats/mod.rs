pub mod pal;
pub mod scr;
pub mod sprite;

pub use pal::Palette;
pub use scr::Screen;
pub use sprite::{Sprite, TEAM_COLOR_TABLES};
