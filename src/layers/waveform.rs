//! Per-band waveforms with glow.
//!
//! Each band gets a row (or column) of the frame. Two mirrored layers are
//! drawn per band: the first is filled, both get a widening glow halo and a
//! crisp centre line, and loud samples spawn small particles. The finished
//! layer is blurred once so the lines bloom.

use std::f32::consts::PI;

use image::RgbImage;
use tiny_skia::{Color, FillRule, Path, PathBuilder, Pixmap, Transform};

use crate::config::{FrequencyBand, WaveformOrientation};

use super::paint::{band_color, canvas, dim, hsv_to_rgb, pixmap_to_rgb_over_black, solid, stroke};

pub const WAVEFORM_POINTS_FULL: usize = 150;
pub const WAVEFORM_POINTS_PREVIEW: usize = 100;

const LAYERS: usize = 2;
const LAYER_HUE_STEP: f64 = 40.0;
const LAYER_PHASE_STEP: f32 = 0.3;
const AMPLITUDE_FILL: f32 = 0.65;
const PARTICLE_STRIDE: usize = 15;
const PARTICLE_THRESHOLD: f32 = 0.7;

/// Draws waveforms for every band onto a black frame.
#[derive(Debug, Clone)]
pub struct WaveformRenderer {
    width: u32,
    height: u32,
    orientation: WaveformOrientation,
    glow_layers: u32,
    blur_sigma: f32,
    points: usize,
}

impl WaveformRenderer {
    pub fn new(width: u32, height: u32, orientation: WaveformOrientation, is_preview: bool) -> Self {
        Self {
            width,
            height,
            orientation,
            glow_layers: if is_preview { 6 } else { 12 },
            blur_sigma: if is_preview { 1.0 } else { 2.0 },
            points: if is_preview {
                WAVEFORM_POINTS_PREVIEW
            } else {
                WAVEFORM_POINTS_FULL
            },
        }
    }

    /// Samples requested per band each frame.
    pub fn points(&self) -> usize {
        self.points
    }

    /// Render all bands. `waveforms[i]` holds the samples of `bands[i]`.
    pub fn draw(&self, bands: &[FrequencyBand], waveforms: &[Vec<f32>], hue_offset: f64) -> RgbImage {
        let Some(mut pixmap) = canvas(self.width, self.height) else {
            return RgbImage::new(self.width, self.height);
        };
        pixmap.fill(Color::BLACK);

        let band_count = bands.len().min(waveforms.len());
        for (band_idx, (band, waveform)) in bands.iter().zip(waveforms).enumerate() {
            if waveform.len() > 1 {
                self.draw_band(&mut pixmap, band_idx, band_count, band, waveform, hue_offset);
            }
        }

        let layer = pixmap_to_rgb_over_black(&pixmap);
        image::imageops::blur(&layer, self.blur_sigma)
    }

    fn draw_band(
        &self,
        pixmap: &mut Pixmap,
        band_idx: usize,
        band_count: usize,
        band: &FrequencyBand,
        waveform: &[f32],
        hue_offset: f64,
    ) {
        let vertical = self.orientation == WaveformOrientation::Vertical;
        // Length along the wave and the thickness of the band's lane
        let (span, lane) = if vertical {
            (self.height as f32, (self.width as usize / band_count) as f32)
        } else {
            (self.width as f32, (self.height as usize / band_count) as f32)
        };
        let centre = (band_idx as f32 + 0.5) * lane;
        let sensitivity = 1.0 + band_idx as f32 / (band_count.max(2) - 1) as f32 * 2.0;
        let base_hue = (hue_offset + band.hue_offset as f64).rem_euclid(360.0);

        // Maps (along, across) into frame coordinates
        let place = |along: f32, across: f32| {
            if vertical {
                (across, along)
            } else {
                (along, across)
            }
        };

        let n = waveform.len() as f32;
        for layer in 0..LAYERS {
            let color = band_color(hue_offset, band, layer as f64 * LAYER_HUE_STEP);
            let phase = layer as f32 * LAYER_PHASE_STEP;

            let mut plus = Vec::with_capacity(waveform.len());
            let mut minus = Vec::with_capacity(waveform.len());
            for (i, &value) in waveform.iter().enumerate() {
                let t = i as f32 / n;
                let along = (t * span).floor();
                let amplitude = value * lane * AMPLITUDE_FILL * sensitivity;
                let wave = (t * PI * 4.0 + phase).sin() * amplitude
                    + (t * PI * 8.0 + phase * 2.0).sin() * amplitude * 0.3
                    + (t * PI * 2.0 + hue_offset as f32 * 0.02).cos() * amplitude * 0.2;
                plus.push(place(along, (centre + wave).trunc()));
                minus.push(place(along, (centre - wave).trunc()));
            }

            if layer == 0 {
                let outline: Vec<_> = plus.iter().chain(minus.iter().rev()).copied().collect();
                if let Some(path) = polyline(&outline, true) {
                    pixmap.fill_path(&path, &solid(color, 255), FillRule::EvenOdd, Transform::identity(), None);
                }
            }

            let (Some(plus_path), Some(minus_path)) = (polyline(&plus, false), polyline(&minus, false)) else {
                continue;
            };
            for thickness in (1..=self.glow_layers).rev() {
                let intensity = (1.0 - thickness as f64 / self.glow_layers as f64) * 0.5;
                let glow = solid(dim(color, intensity), 255);
                let width = stroke(thickness as f32 + 8.0);
                pixmap.stroke_path(&plus_path, &glow, &width, Transform::identity(), None);
                pixmap.stroke_path(&minus_path, &glow, &width, Transform::identity(), None);
            }
            let line = solid(color, 255);
            let width = stroke((6 - layer) as f32);
            pixmap.stroke_path(&plus_path, &line, &width, Transform::identity(), None);
            pixmap.stroke_path(&minus_path, &line, &width, Transform::identity(), None);

            for i in (0..waveform.len()).step_by(PARTICLE_STRIDE) {
                if waveform[i] > PARTICLE_THRESHOLD {
                    let along = (i as f32 / n * span).floor();
                    let (x, y) = place(along, centre);
                    let particle = hsv_to_rgb(base_hue + i as f64 * 2.0, 1.0, 1.0);
                    draw_particle(pixmap, x, y, particle);
                }
            }
        }
    }
}

fn polyline(points: &[(f32, f32)], closed: bool) -> Option<Path> {
    let (&(x0, y0), rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(x0, y0);
    for &(x, y) in rest {
        pb.line_to(x, y);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

fn draw_particle(pixmap: &mut Pixmap, x: f32, y: f32, color: [u8; 3]) {
    for radius in (3..=10).rev() {
        let intensity = (1.0 - radius as f64 / 10.0) * 0.5;
        if let Some(path) = PathBuilder::from_circle(x, y, radius as f32) {
            pixmap.fill_path(&path, &solid(dim(color, intensity), 255), FillRule::Winding, Transform::identity(), None);
        }
    }
    if let Some(path) = PathBuilder::from_circle(x, y, 3.0) {
        pixmap.fill_path(&path, &solid(color, 255), FillRule::Winding, Transform::identity(), None);
    }
}
