// Shared types module - Common types used across multiple modules

use anyhow::{anyhow, Result};
use colorgrad::Color;

// Mode exit reason - used to determine if we should quit or switch modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeExitReason {
    UserQuit,      // User pressed 'q' or Ctrl+C - should exit app
    ModeChanged,   // Mode changed in config - should switch modes
}

/// Dark/light page theme. Selects the wash and grid palette of a render session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" | "night" => Some(Theme::Dark),
            "light" | "day" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

// RGB color representation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        Ok(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }
}

/// Straight (non-premultiplied) RGBA color with channels in 0.0..=1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Rgba {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Parse any CSS color notation ("#0ff", "rgba(10, 10, 15, 0.3)", "hsla(...)", names)
    pub fn from_css(css: &str) -> Result<Self> {
        let color = Color::from_html(css.trim())
            .map_err(|e| anyhow!("Invalid color '{}': {}", css, e))?;
        Ok(Self::from_colorgrad(&color))
    }

    /// Hue in degrees, saturation and lightness in 0.0..=1.0
    pub fn from_hsla(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        Self::from_colorgrad(&Color::from_hsla(hue, saturation, lightness, alpha))
    }

    fn from_colorgrad(color: &Color) -> Self {
        Rgba {
            r: color.r.clamp(0.0, 1.0) as f32,
            g: color.g.clamp(0.0, 1.0) as f32,
            b: color.b.clamp(0.0, 1.0) as f32,
            a: color.a.clamp(0.0, 1.0) as f32,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Rgba { a: alpha.clamp(0.0, 1.0), ..self }
    }

    /// Scale opacity, used for fading trail markers
    pub fn faded(self, factor: f32) -> Self {
        self.with_alpha(self.a * factor.clamp(0.0, 1.0))
    }

    #[cfg(test)]
    pub fn opaque(&self) -> Rgb {
        Rgb {
            r: (self.r * 255.0).round() as u8,
            g: (self.g * 255.0).round() as u8,
            b: (self.b * 255.0).round() as u8,
        }
    }

    /// Premultiplied channels, the form the surface raster stores
    pub fn premultiplied(&self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }
}
