//! Title text overlay.
//!
//! The text never changes during a render, so glyphs are laid out and
//! rasterized once into a coverage mask. Each frame only blends a black drop
//! shadow and the white text at the current opacity.

use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::config::{HorizontalAlign, RenderConfig, VerticalAlign};

use super::cover::TEXT_GAP_BELOW_COVER;

const SHADOW_OFFSET: u32 = 3;
const SHADOW_ALPHA: f32 = 180.0;
const LINE_GAP: f32 = 10.0;

/// Fonts tried in order when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/gnu-free/FreeSans.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse font {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("No usable system font found")]
    NotFound,
}

/// Load a TrueType font from disk.
pub fn load_font(path: &Path) -> Result<Font, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Font::from_bytes(bytes, FontSettings::default()).map_err(|message| FontError::Parse {
        path: path.to_path_buf(),
        message: message.to_string(),
    })
}

/// The configured font, or the first system font that loads.
pub fn find_font(configured: Option<&Path>) -> Result<Font, FontError> {
    if let Some(path) = configured {
        return load_font(path);
    }
    SYSTEM_FONTS
        .iter()
        .map(Path::new)
        .filter(|path| path.exists())
        .find_map(|path| match load_font(path) {
            Ok(font) => {
                log::debug!("Using font {}", path.display());
                Some(font)
            }
            Err(e) => {
                log::debug!("Skipping font: {}", e);
                None
            }
        })
        .ok_or(FontError::NotFound)
}

/// Where the first line starts and how far apart the lines are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub font_size: f32,
    pub first_line_y: f32,
    pub second_line_y: f32,
}

impl TextPlacement {
    /// `cover_base_size` is the unscaled cover size, `None` without a cover.
    pub fn new(height: u32, text_size: f64, align: VerticalAlign, cover_base_size: Option<u32>) -> Self {
        let font_size = (height as f64 * 0.08 * text_size) as u32 as f32;
        let h = height as f64;
        let first_line_y = match align {
            VerticalAlign::Top => (h * 0.1) as u32,
            VerticalAlign::Middle => (h * 0.45) as u32,
            VerticalAlign::Bottom => match cover_base_size {
                Some(base) => height / 2 + base + TEXT_GAP_BELOW_COVER,
                None => (h * 0.7) as u32,
            },
        } as f32;

        Self {
            font_size,
            first_line_y,
            second_line_y: first_line_y + font_size + LINE_GAP,
        }
    }
}

/// Left edge of a line `text_width` wide.
pub fn line_x(width: u32, text_width: u32, align: HorizontalAlign) -> i32 {
    match align {
        HorizontalAlign::Left => (width as f64 * 0.05) as i32,
        HorizontalAlign::Right => (width as f64 * 0.95) as i32 - text_width as i32,
        HorizontalAlign::Center => (width as i32 - text_width as i32).div_euclid(2),
    }
}

/// Pre-rasterized overlay text.
pub struct TextRenderer {
    width: u32,
    height: u32,
    mask: GrayImage,
    /// Bounding box of the mask, `(x0, y0, x1, y1)` exclusive.
    bounds: Option<(u32, u32, u32, u32)>,
}

impl TextRenderer {
    pub fn new(config: &RenderConfig, font: &Font, cover_base_size: Option<u32>) -> Self {
        let (width, height) = (config.resolution.width, config.resolution.height);
        let placement = TextPlacement::new(height, config.text_size, config.text_v_align, cover_base_size);
        let mut mask = GrayImage::new(width, height);

        let lines = [
            (config.text_overlay.as_deref(), placement.first_line_y),
            (config.text_overlay2.as_deref(), placement.second_line_y),
        ];
        for (text, y) in lines {
            let Some(text) = text.filter(|t| !t.is_empty()) else {
                continue;
            };
            let text_width = measure(font, text, placement.font_size);
            let x = line_x(width, text_width, config.text_h_align);
            rasterize_line(&mut mask, font, text, placement.font_size, x as f32, y);
        }

        let bounds = mask_bounds(&mask);
        Self {
            width,
            height,
            mask,
            bounds,
        }
    }

    /// The overlay at `opacity` in `[0, 1]`.
    pub fn draw(&self, opacity: f32) -> RgbaImage {
        let mut layer = RgbaImage::new(self.width, self.height);
        let Some((x0, y0, x1, y1)) = self.bounds else {
            return layer;
        };
        let opacity = opacity.clamp(0.0, 1.0);
        let shadow_alpha = (opacity * SHADOW_ALPHA) as u8 as f32 / 255.0;
        let text_alpha = (opacity * 255.0) as u8 as f32 / 255.0;

        let sx1 = (x1 + SHADOW_OFFSET).min(self.width);
        let sy1 = (y1 + SHADOW_OFFSET).min(self.height);
        for y in y0..sy1 {
            for x in x0..sx1 {
                let shadow = if x >= SHADOW_OFFSET && y >= SHADOW_OFFSET {
                    coverage(&self.mask, x - SHADOW_OFFSET, y - SHADOW_OFFSET)
                } else {
                    0.0
                };
                let text = coverage(&self.mask, x, y);
                if shadow == 0.0 && text == 0.0 {
                    continue;
                }
                let pixel = layer.get_pixel_mut(x, y);
                blend_over(pixel, [0, 0, 0], shadow * shadow_alpha);
                blend_over(pixel, [255, 255, 255], text * text_alpha);
            }
        }
        layer
    }
}

fn coverage(mask: &GrayImage, x: u32, y: u32) -> f32 {
    mask.get_pixel_checked(x, y).map_or(0.0, |p| p.0[0] as f32 / 255.0)
}

fn layout_line(font: &Font, text: &str, size: f32, x: f32, y: f32) -> Layout {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        x,
        y,
        ..LayoutSettings::default()
    });
    layout.append(&[font], &TextStyle::new(text, size, 0));
    layout
}

/// Ink width of a single line in pixels.
pub fn measure(font: &Font, text: &str, size: f32) -> u32 {
    let layout = layout_line(font, text, size, 0.0, 0.0);
    let inked = layout.glyphs().iter().filter(|g| g.width > 0);
    let (mut left, mut right) = (f32::MAX, f32::MIN);
    for glyph in inked {
        left = left.min(glyph.x);
        right = right.max(glyph.x + glyph.width as f32);
    }
    if right > left {
        (right - left).ceil() as u32
    } else {
        0
    }
}

fn rasterize_line(mask: &mut GrayImage, font: &Font, text: &str, size: f32, x: f32, y: f32) {
    let layout = layout_line(font, text, size, x, y);
    for glyph in layout.glyphs() {
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (_, bitmap) = font.rasterize_config(glyph.key);
        let gx = glyph.x.round() as i64;
        let gy = glyph.y.round() as i64;
        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let (px, py) = (gx + col as i64, gy + row as i64);
                if px < 0 || py < 0 || px >= mask.width() as i64 || py >= mask.height() as i64 {
                    continue;
                }
                let value = bitmap[row * glyph.width + col];
                let dst = mask.get_pixel_mut(px as u32, py as u32);
                *dst = Luma([dst.0[0].max(value)]);
            }
        }
    }
}

fn mask_bounds(mask: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x + 1, y + 1),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
        });
    }
    bounds
}

/// Straight-alpha source-over of a solid colour.
fn blend_over(dst: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let dst_alpha = dst.0[3] as f32 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    for c in 0..3 {
        let blended = (color[c] as f32 * alpha + dst.0[c] as f32 * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst.0[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}
