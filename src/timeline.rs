//! Progress-driven transforms.
//!
//! Pure functions of render progress (`frame_idx / total_frames`) and the
//! static configuration. Safe to call from any thread in any order.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, TAU};

use crate::config::{CoverTimeline, RingStagger, RotationDirection};

/// Placement of the cover for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverTransform {
    pub visible: bool,
    pub scale: f64,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Opacity in `[0, 1]`.
    pub alpha: f64,
}

impl CoverTransform {
    pub const FULL: Self = Self {
        visible: true,
        scale: 1.0,
        offset_x: 0,
        offset_y: 0,
        alpha: 1.0,
    };

    pub const HIDDEN: Self = Self {
        visible: false,
        scale: 0.0,
        offset_x: 0,
        offset_y: 0,
        alpha: 0.0,
    };

    fn with_alpha(alpha: f64) -> Self {
        Self { alpha, ..Self::FULL }
    }

    fn with_scale_alpha(t: f64) -> Self {
        Self {
            scale: t,
            alpha: t,
            ..Self::FULL
        }
    }

    fn with_offset_y(offset_y: i32) -> Self {
        Self {
            offset_y,
            ..Self::FULL
        }
    }
}

const OUT_START: f64 = 0.25;
const HIDDEN_START: f64 = 0.375;
const IN_START: f64 = 0.625;
const VISIBLE_AGAIN: f64 = 0.75;
const TRANSITION: f64 = 0.125;

/// Normalised render progress, `0` when there are no frames.
pub fn progress(frame_idx: usize, total_frames: usize) -> f64 {
    if total_frames == 0 {
        0.0
    } else {
        frame_idx as f64 / total_frames as f64
    }
}

/// Cover transform at `progress` for a frame `height` pixels tall.
///
/// The timeline has five phases: visible, transition out, hidden, transition
/// in, visible. `CoverTimeline::None` is always fully visible.
pub fn cover_transform(timeline: CoverTimeline, progress: f64, height: u32) -> CoverTransform {
    if timeline == CoverTimeline::None || progress < OUT_START || progress >= VISIBLE_AGAIN {
        return CoverTransform::FULL;
    }
    if (HIDDEN_START..IN_START).contains(&progress) {
        return CoverTransform::HIDDEN;
    }

    let height = height as f64;
    if progress < HIDDEN_START {
        let t = (progress - OUT_START) / TRANSITION;
        match timeline {
            CoverTimeline::Fade => CoverTransform::with_alpha(1.0 - t),
            CoverTimeline::Zoom => CoverTransform::with_scale_alpha(1.0 - t),
            CoverTimeline::SlideUp => CoverTransform::with_offset_y(-((t * height) as i32)),
            CoverTimeline::SlideDown => CoverTransform::with_offset_y((t * height) as i32),
            CoverTimeline::None => CoverTransform::FULL,
        }
    } else {
        let t = (progress - IN_START) / TRANSITION;
        match timeline {
            CoverTimeline::Fade => CoverTransform::with_alpha(t),
            CoverTimeline::Zoom => CoverTransform::with_scale_alpha(t),
            // Returns from below after leaving through the top
            CoverTimeline::SlideUp => CoverTransform::with_offset_y(((1.0 - t) * height) as i32),
            CoverTimeline::SlideDown => {
                CoverTransform::with_offset_y(-(((1.0 - t) * height) as i32))
            }
            CoverTimeline::None => CoverTransform::FULL,
        }
    }
}

/// Per-ring rotation offsets in radians, one per ring.
///
/// Ring index `r` follows the drawing order (0 is the innermost ring drawn
/// first). Everything is zero when staggering or ring rotation is off.
pub fn ring_stagger_offsets(
    stagger: RingStagger,
    ring_rotation: RotationDirection,
    ring_count: usize,
    progress: f64,
) -> Vec<f64> {
    if stagger == RingStagger::None || ring_rotation == RotationDirection::None {
        return vec![0.0; ring_count];
    }

    let denominator = ring_count.saturating_sub(1).max(1) as f64;
    let oscillation = progress * 2.0 * TAU;

    (0..ring_count)
        .map(|r| {
            let weight = r as f64 / denominator;
            match stagger {
                RingStagger::InnerCatch => -FRAC_PI_2 * (1.0 - progress) * (1.0 - weight),
                RingStagger::OuterCatch => -FRAC_PI_2 * (1.0 - progress) * weight,
                RingStagger::InnerLead => (oscillation + weight * FRAC_PI_3).sin() * FRAC_PI_3,
                RingStagger::OuterLead => {
                    (oscillation + (1.0 - weight) * FRAC_PI_3).sin() * FRAC_PI_3
                }
                RingStagger::None => 0.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_handles_zero_frames() {
        assert_eq!(progress(5, 0), 0.0);
        assert_eq!(progress(75, 150), 0.5);
    }

    #[test]
    fn test_slide_up_leaves_through_top_and_returns_from_below() {
        let out = cover_transform(CoverTimeline::SlideUp, 0.3125, 720);
        assert_eq!(out.offset_y, -360);
        let back = cover_transform(CoverTimeline::SlideUp, 0.6875, 720);
        assert_eq!(back.offset_y, 360);
        assert!(out.visible && back.visible);
        assert_eq!(out.alpha, 1.0);
    }

    #[test]
    fn test_slide_down_mirrors_slide_up() {
        let out = cover_transform(CoverTimeline::SlideDown, 0.3125, 720);
        assert_eq!(out.offset_y, 360);
        let back = cover_transform(CoverTimeline::SlideDown, 0.6875, 720);
        assert_eq!(back.offset_y, -360);
    }

    #[test]
    fn test_zoom_scales_and_fades_together() {
        let t = cover_transform(CoverTimeline::Zoom, 0.3125, 720);
        assert!((t.scale - 0.5).abs() < 1e-9);
        assert!((t.alpha - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_hidden_phase() {
        for timeline in [
            CoverTimeline::Fade,
            CoverTimeline::Zoom,
            CoverTimeline::SlideUp,
            CoverTimeline::SlideDown,
        ] {
            assert_eq!(cover_transform(timeline, 0.5, 720), CoverTransform::HIDDEN);
        }
    }

    #[test]
    fn test_lead_modes_oscillate_within_amplitude() {
        for stagger in [RingStagger::InnerLead, RingStagger::OuterLead] {
            for step in 0..=100 {
                let offsets =
                    ring_stagger_offsets(stagger, RotationDirection::Ccw, 5, step as f64 / 100.0);
                assert!(offsets.iter().all(|o| o.abs() <= FRAC_PI_3 + 1e-12));
            }
        }
    }

    #[test]
    fn test_lead_modes_use_opposite_phase_order() {
        let inner = ring_stagger_offsets(RingStagger::InnerLead, RotationDirection::Cw, 3, 0.0);
        let outer = ring_stagger_offsets(RingStagger::OuterLead, RotationDirection::Cw, 3, 0.0);
        assert!(inner[0].abs() < 1e-12);
        assert!(outer[2].abs() < 1e-12);
        assert!((inner[2] - outer[0]).abs() < 1e-12);
    }
}
