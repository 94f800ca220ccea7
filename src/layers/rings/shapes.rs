use std::f32::consts::{FRAC_PI_2, TAU};

use tiny_skia::{Path, PathBuilder, Rect};

use super::RingShape;

fn oval(pb: &mut PathBuilder, cx: f32, cy: f32, w: f32, h: f32) {
    if let Some(rect) = Rect::from_xywh(cx - w, cy - h, w * 2.0, h * 2.0) {
        pb.push_oval(rect);
    }
}

fn polygon(points: &[(f32, f32)]) -> Option<Path> {
    let (&(x0, y0), rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(x0, y0);
    for &(x, y) in rest {
        pb.line_to(x, y);
    }
    pb.close();
    pb.finish()
}

/// Vertices of an `n`-gon starting at `start` radians.
fn regular(n: usize, start: f32, cx: f32, cy: f32, w: f32, h: f32) -> Vec<(f32, f32)> {
    (0..n)
        .map(|i| {
            let angle = start + TAU * i as f32 / n as f32;
            (cx + w * angle.cos(), cy + h * angle.sin())
        })
        .collect()
}

/// Glow settings for the outline-only shapes:
/// the glow widens the stroke without growing the shape.
macro_rules! line_family {
    () => {
        fn glow_growth(&self) -> f32 {
            0.0
        }

        fn glow_alpha(&self, glow_level: u32, beat: f32) -> u8 {
            let fade = 1.0 - glow_level as f32 / super::GLOW_LEVELS as f32;
            ((180.0 + beat * 50.0) * fade).clamp(0.0, 255.0) as u8
        }
    };
}

pub struct Circle;

impl RingShape for Circle {
    fn name(&self) -> &'static str {
        "circle"
    }

    fn display_name(&self) -> &'static str {
        "Circle"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let mut pb = PathBuilder::new();
        oval(&mut pb, cx, cy, w, h);
        pb.finish()
    }
}

pub struct Square;

impl RingShape for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn display_name(&self) -> &'static str {
        "Square"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        polygon(&[
            (cx - w, cy - h),
            (cx + w, cy - h),
            (cx + w, cy + h),
            (cx - w, cy + h),
        ])
    }
}

pub struct Triangle;

impl RingShape for Triangle {
    fn name(&self) -> &'static str {
        "triangle"
    }

    fn display_name(&self) -> &'static str {
        "Triangle"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        polygon(&[(cx, cy - h), (cx - w, cy + h), (cx + w, cy + h)])
    }
}

pub struct Pentagon;

impl RingShape for Pentagon {
    fn name(&self) -> &'static str {
        "pentagon"
    }

    fn display_name(&self) -> &'static str {
        "Pentagon"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        polygon(&regular(5, -FRAC_PI_2, cx, cy, w, h))
    }
}

pub struct Hexagon;

impl RingShape for Hexagon {
    fn name(&self) -> &'static str {
        "hexagon"
    }

    fn display_name(&self) -> &'static str {
        "Hexagon"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        polygon(&regular(6, 0.0, cx, cy, w, h))
    }
}

pub struct Star5;

impl RingShape for Star5 {
    fn name(&self) -> &'static str {
        "star"
    }

    fn display_name(&self) -> &'static str {
        "5-Point Star"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let points: Vec<(f32, f32)> = regular(10, -FRAC_PI_2, cx, cy, w, h)
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| {
                if i % 2 == 0 {
                    (x, y)
                } else {
                    // Inner vertices sit at 40% of the radius
                    (cx + (x - cx) * 0.4, cy + (y - cy) * 0.4)
                }
            })
            .collect();
        polygon(&points)
    }
}

pub struct SeptagonOutline;

impl RingShape for SeptagonOutline {
    line_family!();

    fn name(&self) -> &'static str {
        "septagon_outline"
    }

    fn display_name(&self) -> &'static str {
        "Septagon"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let r = w.min(h);
        polygon(&regular(7, -FRAC_PI_2, cx, cy, r, r))
    }
}

pub struct PlusOutline;

impl RingShape for PlusOutline {
    line_family!();

    fn name(&self) -> &'static str {
        "plus_outline"
    }

    fn display_name(&self) -> &'static str {
        "Plus Sign"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let size = w.min(h);
        let arm = size * 0.55;
        let t = size * 0.12;
        polygon(&[
            (cx - t, cy - arm),
            (cx + t, cy - arm),
            (cx + t, cy - t),
            (cx + arm, cy - t),
            (cx + arm, cy + t),
            (cx + t, cy + t),
            (cx + t, cy + arm),
            (cx - t, cy + arm),
            (cx - t, cy + t),
            (cx - arm, cy + t),
            (cx - arm, cy - t),
            (cx - t, cy - t),
        ])
    }
}

pub struct KiteOutline;

impl RingShape for KiteOutline {
    line_family!();

    fn name(&self) -> &'static str {
        "kite_outline"
    }

    fn display_name(&self) -> &'static str {
        "Kite"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let size = w.min(h);
        polygon(&[
            (cx, cy - size),
            (cx + size * 0.55, cy),
            (cx, cy + size * 0.7),
            (cx - size * 0.55, cy),
        ])
    }
}

pub struct HourglassOutline;

impl RingShape for HourglassOutline {
    line_family!();

    fn name(&self) -> &'static str {
        "hourglass_outline"
    }

    fn display_name(&self) -> &'static str {
        "Hourglass"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let size = w.min(h);
        let side = size * 0.6;
        let waist = size * 0.15;
        polygon(&[
            (cx - side, cy - size),
            (cx + side, cy - size),
            (cx + waist, cy),
            (cx + side, cy + size),
            (cx - side, cy + size),
            (cx - waist, cy),
        ])
    }
}

pub struct CrosshairOutline;

impl RingShape for CrosshairOutline {
    line_family!();

    fn name(&self) -> &'static str {
        "crosshair_outline"
    }

    fn display_name(&self) -> &'static str {
        "Crosshair"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let radius = w.min(h);
        let gap = radius * 0.25;
        let arm = radius * 0.9;

        let mut pb = PathBuilder::new();
        oval(&mut pb, cx, cy, radius, radius);
        for (x0, y0, x1, y1) in [
            (cx, cy - arm, cx, cy - gap),
            (cx, cy + gap, cx, cy + arm),
            (cx - arm, cy, cx - gap, cy),
            (cx + gap, cy, cx + arm, cy),
        ] {
            pb.move_to(x0, y0);
            pb.line_to(x1, y1);
        }
        pb.finish()
    }
}

pub struct OffsetCircle;

impl RingShape for OffsetCircle {
    fn name(&self) -> &'static str {
        "offset_circle"
    }

    fn display_name(&self) -> &'static str {
        "Offset Circle"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let mut pb = PathBuilder::new();
        oval(&mut pb, cx + w * 0.4, cy, w, h);
        pb.finish()
    }
}

pub struct OffsetCircles;

impl RingShape for OffsetCircles {
    fn name(&self) -> &'static str {
        "offset_circles"
    }

    fn display_name(&self) -> &'static str {
        "Offset Circles"
    }

    fn outline(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<Path> {
        let offset = w * 0.3;
        let mut pb = PathBuilder::new();
        // Three circles 120 degrees apart
        oval(&mut pb, cx + offset, cy, w, h);
        oval(&mut pb, cx - offset * 0.5, cy + offset * 0.866, w, h);
        oval(&mut pb, cx - offset * 0.5, cy - offset * 0.866, w, h);
        pb.finish()
    }
}
