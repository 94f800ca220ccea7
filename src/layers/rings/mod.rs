//! Ring shapes.
//!
//! Each shape is a drawing strategy with two capabilities: a glow pass and the
//! main outline. Shapes are registered in a static table, see [`registry`].

mod registry;
mod shapes;

pub use registry::{ring_shape, ring_shape_or_default, ring_shapes, RING_SHAPES};
pub use shapes::{
    Circle, CrosshairOutline, Hexagon, HourglassOutline, KiteOutline, OffsetCircle,
    OffsetCircles, Pentagon, PlusOutline, SeptagonOutline, Square, Star5, Triangle,
};

use tiny_skia::{Path, Pixmap, Transform};

use super::paint::{solid, stroke};

/// Number of glow passes drawn under each ring outline.
pub const GLOW_LEVELS: u32 = 8;

/// Target for ring drawing: a pixmap plus the ring's rotation.
pub struct RingCanvas<'a> {
    pub pixmap: &'a mut Pixmap,
    pub transform: Transform,
}

impl RingCanvas<'_> {
    fn stroke(&mut self, path: &Path, color: [u8; 3], alpha: u8, width: f32) {
        self.pixmap
            .stroke_path(path, &solid(color, alpha), &stroke(width), self.transform, None);
    }
}

/// A ring drawing strategy.
///
/// Sizes are half-extents: the shape spans `cx - w ..= cx + w`.
pub trait RingShape: Send + Sync {
    /// Identifier used in configuration.
    fn name(&self) -> &'static str;

    /// Human readable name.
    fn display_name(&self) -> &'static str;

    /// Closed outline at the given centre and half-extents.
    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path>;

    /// Pixels each glow level grows the shape by.
    fn glow_growth(&self) -> f32 {
        2.0
    }

    /// Glow alpha at `glow_level` (1 = innermost, [`GLOW_LEVELS`] = faintest).
    fn glow_alpha(&self, glow_level: u32, beat: f32) -> u8 {
        let fade = 1.0 - glow_level as f32 / GLOW_LEVELS as f32;
        ((200.0 + beat * 55.0) * fade).clamp(0.0, 255.0) as u8
    }

    /// One glow pass, larger and fainter than the outline.
    #[allow(clippy::too_many_arguments)]
    fn draw_glow(
        &self,
        canvas: &mut RingCanvas<'_>,
        cx: f32,
        cy: f32,
        w: f32,
        h: f32,
        color: [u8; 3],
        width: f32,
        glow_level: u32,
        beat: f32,
    ) {
        let grow = glow_level as f32 * self.glow_growth();
        if let Some(path) = self.outline(cx, cy, w + grow, h + grow) {
            let alpha = self.glow_alpha(glow_level, beat);
            canvas.stroke(&path, color, alpha, width + glow_level as f32);
        }
    }

    /// The opaque main outline.
    #[allow(clippy::too_many_arguments)]
    fn draw_outline(
        &self,
        canvas: &mut RingCanvas<'_>,
        cx: f32,
        cy: f32,
        w: f32,
        h: f32,
        color: [u8; 3],
        width: f32,
    ) {
        if let Some(path) = self.outline(cx, cy, w, h) {
            canvas.stroke(&path, color, 255, width);
        }
    }
}

/// Draw a complete ring: every glow level from the outside in, then the outline.
#[allow(clippy::too_many_arguments)]
pub fn draw_ring(
    shape: &dyn RingShape,
    canvas: &mut RingCanvas<'_>,
    cx: f32,
    cy: f32,
    size: f32,
    color: [u8; 3],
    width: f32,
    beat: f32,
) {
    for glow_level in (1..=GLOW_LEVELS).rev() {
        shape.draw_glow(canvas, cx, cy, size, size, color, width, glow_level, beat);
    }
    shape.draw_outline(canvas, cx, cy, size, size, color, width);
}
