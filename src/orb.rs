// Orb Module - Floating ambient lights with wall-bounce physics
use rand::Rng;

use crate::surface::{Bounds, Canvas, GradientStop};
use crate::types::Rgba;

pub const ORB_COUNT: usize = 5;

const MIN_RADIUS: f64 = 30.0;
const RADIUS_SPREAD: f64 = 50.0;
const MAX_SPEED: f64 = 0.25; // px per tick, per axis
const HUE_BASE: f64 = 180.0; // cyan
const HUE_SPREAD: f64 = 60.0; // up to (not including) blue-violet at 240

/// Which axes were reflected by one `advance`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reflection {
    pub x: bool,
    pub y: bool,
}

/// A persistent ambient light. Radius and hue are fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Orb {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    radius: f64,
    hue: f64,
}

impl Orb {
    pub fn new(x: f64, y: f64, radius: f64, vx: f64, vy: f64, hue: f64) -> Self {
        Orb { x, y, vx, vy, radius, hue }
    }

    /// Random orb anywhere inside `bounds`
    pub fn random<R: Rng + ?Sized>(rng: &mut R, bounds: Bounds) -> Self {
        let x = rng.gen::<f64>() * bounds.width;
        let y = rng.gen::<f64>() * bounds.height;
        let radius = MIN_RADIUS + rng.gen::<f64>() * RADIUS_SPREAD;
        let vx = (rng.gen::<f64>() - 0.5) * 2.0 * MAX_SPEED;
        let vy = (rng.gen::<f64>() - 0.5) * 2.0 * MAX_SPEED;
        let hue = HUE_BASE + rng.gen::<f64>() * HUE_SPREAD;
        Self::new(x, y, radius, vx, vy, hue)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn hue(&self) -> f64 {
        self.hue
    }

    /// Move by one tick of velocity, then reflect on any axis whose new
    /// position lies outside the bounds. Position is not clamped, so an orb
    /// can sit past an edge for one frame. The reflected component always
    /// points back inside, so an orb left outside by a shrinking surface
    /// heads home instead of flipping every tick.
    pub fn advance(&mut self, bounds: Bounds) -> Reflection {
        self.x += self.vx;
        self.y += self.vy;

        let mut reflection = Reflection::default();
        if self.x < 0.0 {
            reflection.x = self.vx < 0.0;
            self.vx = self.vx.abs();
        } else if self.x > bounds.width {
            reflection.x = self.vx > 0.0;
            self.vx = -self.vx.abs();
        }
        if self.y < 0.0 {
            reflection.y = self.vy < 0.0;
            self.vy = self.vy.abs();
        } else if self.y > bounds.height {
            reflection.y = self.vy > 0.0;
            self.vy = -self.vy.abs();
        }
        reflection
    }

    /// Core at 40% alpha, half-radius falloff at 20%, transparent edge
    pub fn gradient_stops(&self) -> [GradientStop; 3] {
        [
            GradientStop { offset: 0.0, color: Rgba::from_hsla(self.hue(), 1.0, 0.6, 0.4) },
            GradientStop { offset: 0.5, color: Rgba::from_hsla(self.hue(), 1.0, 0.5, 0.2) },
            GradientStop { offset: 1.0, color: Rgba::TRANSPARENT },
        ]
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        canvas.fill_radial(self.x, self.y, self.radius(), &self.gradient_stops());
    }
}

pub fn spawn_orbs<R: Rng + ?Sized>(rng: &mut R, bounds: Bounds) -> Vec<Orb> {
    (0..ORB_COUNT).map(|_| Orb::random(rng, bounds)).collect()
}
