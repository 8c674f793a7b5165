// Palette Module - Per-theme colors of the background animation
use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::types::{Rgb, Rgba, Theme};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Low-alpha fill applied at the start of every tick
    pub wash: Rgba,
    pub grid: Rgba,
    pub particle: Rgba,
    pub cursor: Rgba,
    /// Opaque page color the surface is flattened onto for display
    pub backdrop: Rgb,
}

impl Palette {
    pub fn dark() -> Self {
        Palette {
            wash: Rgba::from_rgba8(10, 10, 15, 0.3),
            grid: Rgba::from_rgba8(0, 255, 255, 0.15),
            particle: Rgba::from_rgba8(0, 255, 255, 1.0),
            cursor: Rgba::from_rgba8(0, 255, 255, 0.8),
            backdrop: Rgb { r: 10, g: 10, b: 15 },
        }
    }

    pub fn light() -> Self {
        Palette {
            wash: Rgba::from_rgba8(250, 250, 255, 0.3),
            grid: Rgba::from_rgba8(168, 85, 247, 0.15),
            particle: Rgba::from_rgba8(168, 85, 247, 1.0),
            cursor: Rgba::from_rgba8(168, 85, 247, 0.8),
            backdrop: Rgb { r: 250, g: 250, b: 255 },
        }
    }

    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    /// Theme defaults with any color overrides from the config applied.
    /// Empty strings keep the default.
    pub fn from_config(config: &AppConfig, theme: Theme) -> Result<Self> {
        let mut palette = Self::for_theme(theme);
        let (wash, grid, particle, backdrop) = match theme {
            Theme::Dark => (&config.dark_wash, &config.dark_grid, &config.dark_particle, &config.dark_backdrop),
            Theme::Light => (&config.light_wash, &config.light_grid, &config.light_particle, &config.light_backdrop),
        };
        let prefix = theme.as_str();

        if !wash.is_empty() {
            palette.wash = Rgba::from_css(wash).with_context(|| format!("{}_wash", prefix))?;
        }
        if !grid.is_empty() {
            palette.grid = Rgba::from_css(grid).with_context(|| format!("{}_grid", prefix))?;
        }
        if !particle.is_empty() {
            palette.particle = Rgba::from_css(particle).with_context(|| format!("{}_particle", prefix))?;
            palette.cursor = palette.particle.with_alpha(0.8);
        }
        if !backdrop.is_empty() {
            palette.backdrop = Rgb::from_hex(backdrop).with_context(|| format!("{}_backdrop", prefix))?;
        }
        Ok(palette)
    }
}
