//! Layer renderers.
//!
//! A [`LayerRenderer`] turns the per-frame animation values into the images
//! the compositor stacks. Layers own whatever state they need between frames
//! (star positions, the resized cover, rasterized text) and must be called
//! once per frame in frame order.

pub mod cover;
pub mod paint;
pub mod rings;
pub mod starfield;
pub mod text;
pub mod waveform;

pub use cover::{base_cover_size, CoverFrame, CoverRenderer};
pub use starfield::Starfield;
pub use text::{find_font, load_font, FontError, TextRenderer};
pub use waveform::WaveformRenderer;

use image::{RgbImage, RgbaImage};

use crate::animation::FrameAnimationSnapshot;
use crate::config::{FrequencyBand, RenderConfig, RotationDirection, StarDirection};
use crate::timeline::CoverTransform;

/// Seed for the star positions, fixed so renders are reproducible.
pub const STARFIELD_SEED: u64 = 0x5eed_57a2;

/// Everything a layer may read for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub animation: &'a FrameAnimationSnapshot,
    pub band_values: &'a [f32],
    pub beat_intensity: f32,
    /// One waveform per band, each [`LayerRenderer::waveform_points`] long.
    pub waveforms: &'a [Vec<f32>],
    pub cover: CoverTransform,
    /// Per-ring rotation offsets in radians.
    pub stagger_offsets: &'a [f64],
    pub text_opacity: f32,
}

/// Produces the images for each compositor layer.
pub trait LayerRenderer: Send {
    /// Samples per waveform the renderer wants in [`FrameContext::waveforms`].
    fn waveform_points(&self) -> usize;

    /// Stars on a transparent layer, `None` when the starfield is off.
    fn starfield(&mut self, ctx: &FrameContext<'_>) -> Option<RgbaImage>;

    /// Waveforms on black, unrotated.
    fn waveform(&mut self, ctx: &FrameContext<'_>) -> RgbImage;

    /// Cover and rings, `None` when there is neither.
    fn cover_and_rings(&mut self, ctx: &FrameContext<'_>) -> Option<RgbaImage>;

    /// Text overlay, `None` without text or without a usable font.
    fn text(&mut self, ctx: &FrameContext<'_>) -> Option<RgbaImage>;

    /// Return to the state before frame 0. Called at the start of every
    /// render and every still.
    fn restart(&mut self) {}
}

struct StarSettings {
    field: Starfield,
    rotation: RotationDirection,
    direction: StarDirection,
}

/// The standard look: starfield, glowing waveforms, cover with rings, title.
pub struct PsychedelicLayers {
    bands: Vec<FrequencyBand>,
    stars: Option<StarSettings>,
    waveform: WaveformRenderer,
    cover: CoverRenderer,
    text: Option<TextRenderer>,
}

impl PsychedelicLayers {
    /// Build the layers for `config`.
    ///
    /// A cover image or font that fails to load disables that element with a
    /// warning instead of failing the render.
    pub fn new(config: &RenderConfig) -> Self {
        let cover_image = config.cover_image_path.as_deref().and_then(|path| {
            CoverRenderer::load_cover(path)
                .map_err(|e| log::warn!("Failed to load cover image {}: {}", path.display(), e))
                .ok()
        });
        Self::with_cover(config, cover_image)
    }

    /// Build the layers with an already decoded cover image.
    pub fn with_cover(config: &RenderConfig, cover_image: Option<RgbaImage>) -> Self {
        let (width, height) = (config.resolution.width, config.resolution.height);
        let is_preview = config.is_preview();

        let stars = config.starfield_enabled.then(|| StarSettings {
            field: Starfield::new(width, height, is_preview, STARFIELD_SEED),
            rotation: config.starfield_rotation,
            direction: config.starfield_direction,
        });

        let cover = CoverRenderer::new(config, cover_image);
        let cover_base = cover.has_cover().then(|| cover.base_size());

        let text = if config.has_text() {
            match find_font(config.font_path.as_deref()) {
                Ok(font) => Some(TextRenderer::new(config, &font, cover_base)),
                Err(e) => {
                    log::warn!("Text overlay disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            bands: config.bands(),
            stars,
            waveform: WaveformRenderer::new(width, height, config.waveform_orientation, is_preview),
            cover,
            text,
        }
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }
}

impl LayerRenderer for PsychedelicLayers {
    fn waveform_points(&self) -> usize {
        self.waveform.points()
    }

    fn starfield(&mut self, ctx: &FrameContext<'_>) -> Option<RgbaImage> {
        let stars = self.stars.as_mut()?;
        stars
            .field
            .update(ctx.animation.volume_intensity, stars.rotation, stars.direction);
        stars.field.draw()
    }

    fn waveform(&mut self, ctx: &FrameContext<'_>) -> RgbImage {
        self.waveform.draw(&self.bands, ctx.waveforms, ctx.animation.hue_offset)
    }

    fn cover_and_rings(&mut self, ctx: &FrameContext<'_>) -> Option<RgbaImage> {
        let frame = CoverFrame {
            volume_intensity: ctx.animation.volume_intensity,
            beat_intensity: ctx.beat_intensity,
            hue_offset: ctx.animation.hue_offset,
            cover_rotation: ctx.animation.cover_rotation,
            transform: ctx.cover,
            stagger_offsets: ctx.stagger_offsets,
        };
        self.cover.draw(&self.bands, &frame)
    }

    fn text(&mut self, ctx: &FrameContext<'_>) -> Option<RgbaImage> {
        self.text.as_ref().map(|text| text.draw(ctx.text_opacity))
    }

    fn restart(&mut self) {
        if let Some(stars) = self.stars.as_mut() {
            stars.field.reset(STARFIELD_SEED);
        }
    }
}
