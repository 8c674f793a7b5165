// Particle Module - Cursor trail particles (spawn, age, prune)
use rand::Rng;
use std::collections::VecDeque;

use crate::surface::Canvas;
use crate::types::Rgba;

/// A pointer sample spawns a particle only when its roll exceeds this (10% acceptance)
pub const SPAWN_THRESHOLD: f64 = 0.9;

/// Life lost per tick; a fresh particle lives for about 50 ticks
pub const LIFE_DECAY: f64 = 0.02;

/// Hard bound on the live trail, enforced on every insert
pub const TRAIL_CAPACITY: usize = 20;

/// Side length of the square marker in pixels
pub const MARKER_SIZE: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub life: f64,
}

impl Particle {
    fn step(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        self.life -= LIFE_DECAY;
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// The live particle list, oldest first.
pub struct ParticleTrail {
    particles: VecDeque<Particle>,
    next_id: u64,
}

impl ParticleTrail {
    pub fn new() -> Self {
        ParticleTrail {
            particles: VecDeque::with_capacity(TRAIL_CAPACITY + 1),
            next_id: 0,
        }
    }

    /// Roll once for a pointer sample at (x, y). Returns the new particle's id
    /// when the roll is accepted.
    pub fn maybe_spawn<R: Rng + ?Sized>(&mut self, x: f64, y: f64, rng: &mut R) -> Option<u64> {
        let roll: f64 = rng.gen();
        if roll <= SPAWN_THRESHOLD {
            return None;
        }
        let vx = rng.gen_range(-1.0..=1.0);
        let vy = rng.gen_range(-1.0..=1.0);
        Some(self.push(x, y, vx, vy))
    }

    /// Insert a full-life particle, then drop the oldest beyond the cap
    /// regardless of their remaining life.
    pub fn push(&mut self, x: f64, y: f64, vx: f64, vy: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.particles.push_back(Particle { id, x, y, vx, vy, life: 1.0 });
        while self.particles.len() > TRAIL_CAPACITY {
            self.particles.pop_front();
        }
        id
    }

    /// Move and age every particle by one tick, then discard the dead
    pub fn advance(&mut self) {
        if self.is_empty() {
            return;
        }
        for particle in self.particles.iter_mut() {
            particle.step();
        }
        self.particles.retain(Particle::is_alive);
    }

    /// Draw every live particle at opacity = life. Returns how many were drawn.
    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, color: Rgba) -> usize {
        for particle in self.iter() {
            canvas.fill_square(particle.x, particle.y, MARKER_SIZE, color.faded(particle.life as f32));
        }
        self.particles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

impl Default for ParticleTrail {
    fn default() -> Self {
        Self::new()
    }
}
