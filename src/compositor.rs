//! Frame compositing.
//!
//! Layers are combined in a fixed order on top of the decayed trail:
//!
//! 1. the trail itself
//! 2. starfield, alpha blended
//! 3. waveforms, rotated on their own black canvas and copied over wherever
//!    they are not pure black
//! 4. cover and rings, alpha blended
//! 5. text, alpha blended
//!
//! The result is both the next trail and the emitted frame. The closing fade
//! to black is applied to a copy only, see [`FadeOut`].

use image::{Rgb, RgbImage, RgbaImage};

/// Rendered layers for one frame.
#[derive(Debug, Clone)]
pub struct FrameLayers {
    pub starfield: Option<RgbaImage>,
    /// Waveforms on a black background.
    pub waveform: RgbImage,
    /// Waveform rotation in radians (positive is clockwise), `None` when off.
    pub waveform_angle: Option<f64>,
    pub cover_and_rings: Option<RgbaImage>,
    pub text: Option<RgbaImage>,
}

/// Combine `layers` over `trail` in the fixed layer order.
pub fn compose(trail: RgbImage, layers: &FrameLayers) -> RgbImage {
    let mut canvas = trail;

    if let Some(starfield) = &layers.starfield {
        alpha_composite(&mut canvas, starfield);
    }

    match layers.waveform_angle {
        Some(angle) if angle != 0.0 => {
            let rotated = rotate_bilinear(&layers.waveform, angle);
            composite_nonzero(&mut canvas, &rotated);
        }
        _ => composite_nonzero(&mut canvas, &layers.waveform),
    }

    if let Some(cover_and_rings) = &layers.cover_and_rings {
        alpha_composite(&mut canvas, cover_and_rings);
    }
    if let Some(text) = &layers.text {
        alpha_composite(&mut canvas, text);
    }

    canvas
}

/// Copy every pixel of `layer` whose RGB sum is non-zero onto `canvas`.
///
/// Dark anti-aliased edges are kept as-is; pure black never draws.
pub fn composite_nonzero(canvas: &mut RgbImage, layer: &RgbImage) {
    debug_assert_eq!(canvas.dimensions(), layer.dimensions());
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        if src.0 != [0, 0, 0] {
            *dst = *src;
        }
    }
}

/// Source-over blend of an RGBA layer onto an opaque canvas.
pub fn alpha_composite(canvas: &mut RgbImage, layer: &RgbaImage) {
    debug_assert_eq!(canvas.dimensions(), layer.dimensions());
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        let alpha = src.0[3] as u32;
        match alpha {
            0 => {}
            255 => *dst = Rgb([src.0[0], src.0[1], src.0[2]]),
            _ => {
                for c in 0..3 {
                    let blended = src.0[c] as u32 * alpha + dst.0[c] as u32 * (255 - alpha);
                    dst.0[c] = ((blended + 127) / 255) as u8;
                }
            }
        }
    }
}

/// Rotate about the image centre with bilinear sampling.
///
/// The canvas keeps its size; corners uncovered by the rotation are black.
pub fn rotate_bilinear(src: &RgbImage, angle: f64) -> RgbImage {
    let (width, height) = src.dimensions();
    let mut out = RgbImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let (sin, cos) = angle.sin_cos();
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - cx;
        let dy = y as f64 + 0.5 - cy;
        // Inverse mapping: where did this output pixel come from?
        let sx = cos * dx + sin * dy + cx - 0.5;
        let sy = -sin * dx + cos * dy + cy - 0.5;
        *pixel = sample_bilinear(src, sx, sy);
    }

    out
}

fn sample_bilinear(src: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = src.dimensions();
    if x <= -1.0 || y <= -1.0 || x >= width as f64 || y >= height as f64 {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;

    let fetch = |px: i64, py: i64| -> [f64; 3] {
        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
            [0.0; 3]
        } else {
            let p = src.get_pixel(px as u32, py as u32).0;
            [p[0] as f64, p[1] as f64, p[2] as f64]
        }
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Linear fade to black over the last frames of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeOut {
    pub total_frames: usize,
    pub fade_frames: usize,
}

impl FadeOut {
    pub fn new(total_frames: usize, fade_seconds: f64, fps: u32) -> Self {
        Self {
            total_frames,
            fade_frames: (fade_seconds.max(0.0) * fps as f64) as usize,
        }
    }

    /// Brightness factor for `frame_idx`, or `None` outside the fade window.
    ///
    /// The factor is `1.0` when exactly `fade_frames` remain and shrinks
    /// linearly with the remaining frame count.
    pub fn factor(&self, frame_idx: usize) -> Option<f32> {
        if self.fade_frames == 0 {
            return None;
        }
        let remaining = self.total_frames.saturating_sub(frame_idx);
        (remaining <= self.fade_frames).then(|| remaining as f32 / self.fade_frames as f32)
    }

    /// The frame to emit for `frame_idx`: a darkened copy inside the fade
    /// window, `None` when the composite can be emitted unchanged.
    pub fn apply(&self, frame_idx: usize, composited: &RgbImage) -> Option<RgbImage> {
        self.factor(frame_idx).map(|factor| {
            let mut faded = composited.clone();
            crate::animation::decay_in_place(&mut faded, factor);
            faded
        })
    }
}
