//! Starfield particles drawn behind everything else.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiny_skia::{FillRule, PathBuilder, Transform};

use crate::config::{RotationDirection, StarDirection};

use super::paint::{canvas, pixmap_to_rgba, solid};

const STARS_FULL: usize = 200;
const STARS_PREVIEW: usize = 100;
/// Spread of respawned stars around the centre, in pixels.
const RESPAWN_SPREAD: f32 = 50.0;
/// Distance from the centre at which inward stars respawn.
const INWARD_SINK: f32 = 5.0;

#[derive(Debug, Clone, Copy)]
struct Star {
    x: f32,
    y: f32,
    /// Depth in `[0, 2)`; deeper stars move faster and shine brighter.
    z: f32,
    size: f32,
}

/// Particle state plus drawing.
#[derive(Debug, Clone)]
pub struct Starfield {
    width: u32,
    height: u32,
    stars: Vec<Star>,
    rng: StdRng,
}

impl Starfield {
    pub fn new(width: u32, height: u32, is_preview: bool, seed: u64) -> Self {
        let count = if is_preview { STARS_PREVIEW } else { STARS_FULL };
        Self::with_count(width, height, count, seed)
    }

    fn with_count(width: u32, height: u32, count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stars = (0..count)
            .map(|_| Star {
                x: rng.gen::<f32>() * width as f32,
                y: rng.gen::<f32>() * height as f32,
                z: rng.gen::<f32>() * 2.0,
                size: rng.gen_range(1..4) as f32,
            })
            .collect();

        Self {
            width,
            height,
            stars,
            rng,
        }
    }

    /// Scatter the same number of stars again from `seed`.
    pub fn reset(&mut self, seed: u64) {
        *self = Self::with_count(self.width, self.height, self.stars.len(), seed);
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Move every star one frame forward.
    pub fn update(&mut self, volume_intensity: f32, rotation: RotationDirection, direction: StarDirection) {
        let speed = 0.5 + volume_intensity * 5.5;
        let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        let (w, h) = (self.width as f32, self.height as f32);

        for i in 0..self.stars.len() {
            let mut star = self.stars[i];

            if let Some(sign) = rotation.sign() {
                let dx = star.x - cx;
                let dy = star.y - cy;
                let distance = dx.hypot(dy);
                let angle = dy.atan2(dx) + sign as f32 * speed * 0.01 * star.z;
                star.x = cx + distance * angle.cos();
                star.y = cy + distance * angle.sin();
            }

            let dx = star.x - cx;
            let dy = star.y - cy;
            let distance = dx.hypot(dy);
            if distance > 0.0 {
                let step = match direction {
                    StarDirection::Outward => speed * star.z,
                    StarDirection::Inward => -(speed * star.z).min(distance),
                };
                star.x += dx / distance * step;
                star.y += dy / distance * step;
            }

            let escaped = star.x < 0.0 || star.x > w || star.y < 0.0 || star.y > h;
            let sunk = direction == StarDirection::Inward && (star.x - cx).hypot(star.y - cy) < INWARD_SINK;
            if escaped || sunk {
                star = self.respawn(direction, star.size);
            }

            self.stars[i] = star;
        }
    }

    fn respawn(&mut self, direction: StarDirection, size: f32) -> Star {
        let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        let z = self.rng.gen::<f32>() * 2.0;
        match direction {
            StarDirection::Outward => {
                let (gx, gy) = self.gaussian_pair();
                Star {
                    x: cx + gx * RESPAWN_SPREAD,
                    y: cy + gy * RESPAWN_SPREAD,
                    z,
                    size,
                }
            }
            // Inward stars re-enter from a random point on the border
            StarDirection::Inward => {
                let t = self.rng.gen::<f32>();
                let (w, h) = (self.width as f32, self.height as f32);
                let (x, y) = match self.rng.gen_range(0..4) {
                    0 => (t * w, 0.0),
                    1 => (t * w, h),
                    2 => (0.0, t * h),
                    _ => (w, t * h),
                };
                Star { x, y, z, size }
            }
        }
    }

    /// Two independent standard normal samples (Box-Muller).
    fn gaussian_pair(&mut self) -> (f32, f32) {
        let u1 = self.rng.gen::<f32>().max(f32::MIN_POSITIVE);
        let u2 = self.rng.gen::<f32>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = std::f32::consts::TAU * u2;
        (radius * theta.cos(), radius * theta.sin())
    }

    /// White stars with a soft halo on a transparent layer.
    pub fn draw(&self) -> Option<RgbaImage> {
        let mut pixmap = canvas(self.width, self.height)?;

        for star in &self.stars {
            let brightness = 150.0 + star.z * 50.0;
            let (x, y) = (star.x.floor(), star.y.floor());

            for glow in (1..=3).rev() {
                let alpha = (brightness * 0.3 * (1.0 - glow as f32 / 3.0)) as u8;
                if alpha == 0 {
                    continue;
                }
                if let Some(path) = PathBuilder::from_circle(x, y, star.size + glow as f32) {
                    pixmap.fill_path(&path, &solid([255, 255, 255], alpha), FillRule::Winding, Transform::identity(), None);
                }
            }

            if let Some(path) = PathBuilder::from_circle(x, y, star.size) {
                let alpha = brightness.min(255.0) as u8;
                pixmap.fill_path(&path, &solid([255, 255, 255], alpha), FillRule::Winding, Transform::identity(), None);
            }
        }

        Some(pixmap_to_rgba(&pixmap))
    }
}
