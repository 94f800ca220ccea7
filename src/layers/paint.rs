//! Colour and pixmap helpers shared by the layer renderers.

use image::{Rgb, RgbImage, RgbaImage};
use tiny_skia::{Color, LineCap, LineJoin, Paint, Pixmap, Stroke};

use crate::config::FrequencyBand;

/// Brightness boost applied after HSV conversion.
const VIBRANCE: f64 = 1.2;

/// HSV to 8-bit RGB with the vibrance boost, saturating at 255.
///
/// `h` is in degrees and wraps; `s` and `v` are in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |value: f64| ((value + m) * 255.0 * VIBRANCE).min(255.0) as u8;
    [channel(r), channel(g), channel(b)]
}

/// Colour of `band` at the current animated hue, shifted by `extra_hue`.
pub fn band_color(hue_offset: f64, band: &FrequencyBand, extra_hue: f64) -> [u8; 3] {
    hsv_to_rgb(
        hue_offset + band.hue_offset as f64 + extra_hue,
        band.saturation as f64,
        band.brightness as f64,
    )
}

/// Scale each channel, used for darker glow passes.
pub fn dim(color: [u8; 3], intensity: f64) -> [u8; 3] {
    color.map(|c| (c as f64 * intensity) as u8)
}

/// Anti-aliased solid paint.
pub fn solid(color: [u8; 3], alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(color[0], color[1], color[2], alpha));
    paint.anti_alias = true;
    paint
}

/// Round-jointed stroke of the given width.
pub fn stroke(width: f32) -> Stroke {
    Stroke {
        width: width.max(0.5),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

/// A transparent canvas, `None` for zero-sized frames.
pub fn canvas(width: u32, height: u32) -> Option<Pixmap> {
    Pixmap::new(width, height)
}

/// Straight-alpha copy of a premultiplied pixmap.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    out
}

/// The pixmap flattened over black.
///
/// Premultiplied channels already are the colour over a black background.
pub fn pixmap_to_rgb_over_black(pixmap: &Pixmap) -> RgbImage {
    let mut out = RgbImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        *dst = Rgb([src.red(), src.green(), src.blue()]);
    }
    out
}

/// Premultiplied pixmap from a straight-alpha image.
pub fn rgba_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        let premultiply = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        dst.copy_from_slice(&[premultiply(r), premultiply(g), premultiply(b), a]);
    }
    Some(pixmap)
}
