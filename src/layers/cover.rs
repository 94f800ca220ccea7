//! Cover art and the reactive rings around it.

use image::imageops::FilterType;
use image::RgbaImage;
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pattern, Pixmap, PixmapPaint, SpreadMode, Transform,
};

use crate::config::{
    CoverShape, FrequencyBand, RenderConfig, Resolution, RotationDirection, BAND_COUNT,
};
use crate::timeline::CoverTransform;

use super::paint::{band_color, canvas, hsv_to_rgb, pixmap_to_rgba, rgba_to_pixmap};
use super::rings::{draw_ring, ring_shape_or_default, RingCanvas, RingShape};

/// Cover size as a share of the shorter frame side.
const COVER_SHARE: f64 = 0.525;
/// Gap between the cover's lower edge and bottom-aligned text.
pub const TEXT_GAP_BELOW_COVER: u32 = 40;

/// Per-frame inputs for the cover and ring layer.
#[derive(Debug, Clone, Copy)]
pub struct CoverFrame<'a> {
    pub volume_intensity: f32,
    pub beat_intensity: f32,
    pub hue_offset: f64,
    /// Accumulated ring angle in radians.
    pub cover_rotation: f64,
    pub transform: CoverTransform,
    /// Extra angle per ring in radians, innermost first.
    pub stagger_offsets: &'a [f64],
}

struct RingSettings {
    shape: &'static dyn RingShape,
    count: usize,
    scale: f64,
    rotation: RotationDirection,
}

/// Draws the cover image and the rings on one transparent layer.
pub struct CoverRenderer {
    width: u32,
    height: u32,
    base_size: u32,
    cover: Option<RgbaImage>,
    shape: CoverShape,
    static_cover: bool,
    rings: Option<RingSettings>,
    resized: Option<(u32, Pixmap)>,
}

/// Base cover size in pixels for a frame and size multiplier.
pub fn base_cover_size(width: u32, height: u32, cover_size: f64) -> u32 {
    (width.min(height) as f64 * COVER_SHARE * cover_size).max(0.0) as u32
}

impl CoverRenderer {
    pub fn new(config: &RenderConfig, cover: Option<RgbaImage>) -> Self {
        let Resolution { width, height } = config.resolution;
        let rings = (config.rings_enabled && config.ring_count > 0).then(|| RingSettings {
            shape: ring_shape_or_default(&config.ring_shape),
            count: config.ring_count.min(BAND_COUNT),
            scale: config.ring_scale,
            rotation: config.ring_rotation,
        });

        Self {
            width,
            height,
            base_size: base_cover_size(width, height, config.cover_size),
            cover,
            shape: config.cover_shape,
            static_cover: config.static_cover,
            rings,
            resized: None,
        }
    }

    /// Load the cover image from disk.
    pub fn load_cover(path: &std::path::Path) -> Result<RgbaImage, image::ImageError> {
        Ok(image::open(path)?.to_rgba8())
    }

    pub fn base_size(&self) -> u32 {
        self.base_size
    }

    pub fn has_cover(&self) -> bool {
        self.cover.is_some()
    }

    /// `None` when there is nothing to draw at all.
    pub fn draw(&mut self, bands: &[FrequencyBand], frame: &CoverFrame<'_>) -> Option<RgbaImage> {
        if self.cover.is_none() && self.rings.is_none() {
            return None;
        }
        let mut pixmap = canvas(self.width, self.height)?;

        if frame.transform.visible && frame.transform.alpha > 0.0 {
            self.draw_cover(&mut pixmap, frame);
        }
        self.draw_rings(&mut pixmap, bands, frame);

        Some(pixmap_to_rgba(&pixmap))
    }

    fn reaction(&self, frame: &CoverFrame<'_>) -> f64 {
        if self.static_cover {
            1.0
        } else {
            1.0 + frame.volume_intensity as f64 * 0.3 + frame.beat_intensity as f64 * 0.5
        }
    }

    fn draw_cover(&mut self, pixmap: &mut Pixmap, frame: &CoverFrame<'_>) {
        let cover_base = (self.base_size as f64 * frame.transform.scale) as u32 as f64;
        let cx = (self.width / 2) as i32 + frame.transform.offset_x;
        let cy = (self.height / 2) as i32 + frame.transform.offset_y;
        let opacity = frame.transform.alpha.clamp(0.0, 1.0) as f32;

        match self.shape {
            CoverShape::Square => {
                let side = (cover_base * 1.2 * self.reaction(frame)) as u32;
                let Some(cover) = self.resized(side) else {
                    return;
                };
                let paint = PixmapPaint {
                    opacity,
                    quality: FilterQuality::Nearest,
                    ..PixmapPaint::default()
                };
                let half = (side / 2) as i32;
                pixmap.draw_pixmap(cx - half, cy - half, cover.as_ref(), &paint, Transform::identity(), None);
            }
            CoverShape::Round => {
                let radius = (cover_base * 0.6 * self.reaction(frame)) as u32;
                let Some(cover) = self.resized(radius * 2) else {
                    return;
                };
                let (left, top) = ((cx - radius as i32) as f32, (cy - radius as i32) as f32);
                let paint = Paint {
                    shader: Pattern::new(
                        cover.as_ref(),
                        SpreadMode::Pad,
                        FilterQuality::Nearest,
                        opacity,
                        Transform::from_translate(left, top),
                    ),
                    anti_alias: true,
                    ..Paint::default()
                };
                let r = radius as f32;
                if let Some(circle) = PathBuilder::from_circle(left + r, top + r, r) {
                    pixmap.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }
    }

    /// The cover scaled to a `side` x `side` square, cached across frames.
    fn resized(&mut self, side: u32) -> Option<&Pixmap> {
        if side < 1 {
            return None;
        }
        let cover = self.cover.as_ref()?;
        let cached = matches!(&self.resized, Some((size, _)) if *size == side);
        if !cached {
            let scaled = image::imageops::resize(cover, side, side, FilterType::CatmullRom);
            self.resized = Some((side, rgba_to_pixmap(&scaled)?));
        }
        self.resized.as_ref().map(|(_, pixmap)| pixmap)
    }

    fn draw_rings(&self, pixmap: &mut Pixmap, bands: &[FrequencyBand], frame: &CoverFrame<'_>) {
        let Some(rings) = &self.rings else {
            return;
        };
        let (cx, cy) = ((self.width / 2) as f32, (self.height / 2) as f32);
        let base = self.base_size as f64;
        let spacing = if rings.count <= 3 { 0.15 } else { 0.12 };
        let volume = frame.volume_intensity as f64;
        let beat = frame.beat_intensity as f64;
        let width = (3.0 + volume * 4.0 + beat * 6.0).trunc() as f32;
        let base_angle = rings
            .rotation
            .sign()
            .map_or(0.0, |sign| sign * frame.cover_rotation.to_degrees());

        // Rings use the top `count` bands, so fewer rings drop the lowest ones
        for (idx, band_idx) in (BAND_COUNT - rings.count..BAND_COUNT).enumerate() {
            let ring_base = base * (0.4 + idx as f64 * spacing) * rings.scale;
            let size = (ring_base + beat * 80.0 + volume * 0.5 * ring_base).trunc() as f32;

            let color = match bands.get(band_idx) {
                Some(band) => band_color(frame.hue_offset, band, 0.0),
                None => hsv_to_rgb(frame.hue_offset + band_idx as f64 * 45.0, 1.0, 0.9),
            };

            let stagger = frame.stagger_offsets.get(idx).copied().unwrap_or(0.0).to_degrees();
            let angle = (base_angle + stagger) as f32;
            let transform = if angle == 0.0 {
                Transform::identity()
            } else {
                Transform::from_rotate_at(angle, cx, cy)
            };

            let mut ring_canvas = RingCanvas {
                pixmap: &mut *pixmap,
                transform,
            };
            draw_ring(rings.shape, &mut ring_canvas, cx, cy, size, color, width, frame.beat_intensity);
        }
    }
}
