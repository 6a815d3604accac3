//! Cosmetic particle bursts and shockwave rings.
//!
//! Nothing here feeds back into gameplay. Effects live in a pixel space
//! where one grid cell is [`EFFECT_CELL_PX`] wide; velocities are applied
//! once per rendered frame while lifetimes decay by elapsed milliseconds.

use rand::Rng;
use std::f32::consts::TAU;

use crate::grid;

pub const EFFECT_CELL_PX: f32 = 24.0;

const PARTICLE_DRAG: f32 = 0.985;
const RING_GROWTH: f32 = 0.8;
const RING_FADE: f32 = 0.96;
const RING_MIN_ALPHA: f32 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Burst {
    /// A shot connecting with a ship.
    Hit,
    /// Two ships colliding; larger and redder.
    Crash,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life_ms: f32,
    pub size: f32,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub max_r: f32,
    pub alpha: f32,
    pub color: Rgb,
}

const HIT_COLORS: [Rgb; 3] = [Rgb(255, 247, 168), Rgb(255, 178, 26), Rgb(255, 211, 107)];
const CRASH_COLORS: [Rgb; 2] = [Rgb(255, 107, 107), Rgb(255, 154, 59)];

#[derive(Clone, Debug, Default)]
pub struct Effects {
    pub particles: Vec<Particle>,
    pub rings: Vec<Ring>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty() && self.rings.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.rings.clear();
    }

    /// Spawn a burst centred on grid cell `(gx, gy)`.
    pub fn spawn(&mut self, kind: Burst, gx: i32, gy: i32, rng: &mut impl Rng) {
        let (cx, cy) = grid::cell_center(gx, gy, EFFECT_CELL_PX);
        match kind {
            Burst::Hit => {
                for i in 0..22 {
                    let ang = rng.gen::<f32>() * TAU;
                    let speed = 0.7 + rng.gen::<f32>() * 2.2;
                    self.particles.push(Particle {
                        x: cx,
                        y: cy,
                        vx: ang.cos() * speed,
                        vy: ang.sin() * speed,
                        life_ms: 260.0 + rng.gen::<f32>() * 160.0,
                        size: 1.0 + rng.gen::<f32>() * 2.0,
                        color: HIT_COLORS[i % 3],
                    });
                }
                self.rings.push(Ring {
                    x: cx,
                    y: cy,
                    r: 0.0,
                    max_r: EFFECT_CELL_PX * 1.2,
                    alpha: 0.8,
                    color: Rgb(255, 220, 120),
                });
            }
            Burst::Crash => {
                for i in 0..34 {
                    let ang = rng.gen::<f32>() * TAU;
                    let speed = 1.2 + rng.gen::<f32>() * 3.0;
                    self.particles.push(Particle {
                        x: cx,
                        y: cy,
                        vx: ang.cos() * speed,
                        vy: ang.sin() * speed,
                        life_ms: 380.0 + rng.gen::<f32>() * 200.0,
                        size: 1.5 + rng.gen::<f32>() * 2.5,
                        color: CRASH_COLORS[i % 2],
                    });
                }
                self.rings.push(Ring {
                    x: cx,
                    y: cy,
                    r: 0.0,
                    max_r: EFFECT_CELL_PX * 2.0,
                    alpha: 0.9,
                    color: Rgb(255, 120, 90),
                });
            }
        }
    }

    /// Advance one rendered frame that lasted `dt_ms`, dropping expired effects.
    pub fn update(&mut self, dt_ms: f64) {
        let dt = dt_ms as f32;
        for p in &mut self.particles {
            p.x += p.vx;
            p.y += p.vy;
            p.vx *= PARTICLE_DRAG;
            p.vy *= PARTICLE_DRAG;
            p.life_ms -= dt;
        }
        self.particles.retain(|p| p.life_ms > 0.0);

        for r in &mut self.rings {
            r.r += RING_GROWTH;
            r.alpha *= RING_FADE;
        }
        self.rings.retain(|r| r.r < r.max_r && r.alpha > RING_MIN_ALPHA);
    }
}
