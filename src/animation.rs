//! Frame-to-frame animation state.
//!
//! Every frame's look depends on the previous frame: rotation angles and hue
//! accumulate, and the afterimage trail is the last emitted picture decayed.
//! [`AnimationState::advance`] must therefore be called exactly once per frame
//! index, in order, by a single owner.

use std::collections::VecDeque;
use std::f64::consts::TAU;

use image::RgbImage;

use crate::config::{HUE_SHIFT_BASE, TRAIL_DECAY};

/// Seconds of track per full rotation when choosing the rotation count.
const SECONDS_PER_ROTATION: f64 = 180.0;
/// Volume-driven speed bonus, relative to the base speed.
const VOLUME_SPEED_FACTOR: f64 = 5.0;
/// Number of recent volume samples the text opacity is averaged over.
pub const TEXT_FADE_WINDOW: usize = 60;

/// Per-frame angular speed chosen so rotation closes on whole turns.
///
/// `base_speed * total_frames == target_rotations * 2π`. Volume modulation is
/// added on top and is not part of that guarantee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSyncPlan {
    pub target_rotations: u32,
    pub total_frames: usize,
    /// Radians per frame.
    pub base_speed: f64,
    /// Extra radians per frame at full volume.
    pub volume_multiplier: f64,
}

impl RotationSyncPlan {
    /// Plan for `duration` seconds rendered at `fps`.
    pub fn new(duration: f64, fps: u32) -> Self {
        let total_frames = (duration.max(0.0) * fps as f64).floor() as usize;
        let target_rotations = ((duration / SECONDS_PER_ROTATION).round_ties_even() as u32).max(1);
        let base_speed = if total_frames > 0 {
            target_rotations as f64 * TAU / total_frames as f64
        } else {
            0.0
        };

        Self {
            target_rotations,
            total_frames,
            base_speed,
            volume_multiplier: base_speed * VOLUME_SPEED_FACTOR,
        }
    }

    /// Angular speed for a frame with the given loudness.
    pub fn speed(&self, volume_intensity: f32) -> f64 {
        self.base_speed + volume_intensity as f64 * self.volume_multiplier
    }
}

/// Rolling window of recent volume samples.
#[derive(Debug, Clone)]
pub struct TextFadeHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl TextFadeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, volume_intensity: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(volume_intensity);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    /// Text opacity: a floor of 0.3 plus the smoothed volume and a beat kick.
    pub fn opacity(&self, beat_intensity: f32) -> f32 {
        (0.3 + self.average() * 0.7 + beat_intensity * 0.2).min(1.0)
    }
}

impl Default for TextFadeHistory {
    fn default() -> Self {
        Self::new(TEXT_FADE_WINDOW)
    }
}

/// Values derived by one [`AnimationState::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAnimationSnapshot {
    pub frame_idx: usize,
    /// Accumulated waveform angle in radians.
    pub rotation: f64,
    /// Accumulated ring/cover angle in radians.
    pub cover_rotation: f64,
    /// Hue cycle in degrees, `[0, 360)`.
    pub hue_offset: f64,
    pub volume_intensity: f32,
    /// Speed used for this frame, before the per-effect multipliers.
    pub rotation_speed: f64,
}

/// Mutable state carried from frame to frame during one render.
#[derive(Debug, Clone)]
pub struct AnimationState {
    plan: RotationSyncPlan,
    rotation: f64,
    cover_rotation: f64,
    hue_offset: f64,
    trail_decay: f32,
    trail: RgbImage,
    text_fade: TextFadeHistory,
    next_frame: usize,
}

impl AnimationState {
    pub fn new(plan: RotationSyncPlan, width: u32, height: u32) -> Self {
        Self {
            plan,
            rotation: 0.0,
            cover_rotation: 0.0,
            hue_offset: 0.0,
            trail_decay: TRAIL_DECAY,
            trail: RgbImage::new(width, height),
            text_fade: TextFadeHistory::default(),
            next_frame: 0,
        }
    }

    pub fn with_trail_decay(mut self, decay: f32) -> Self {
        self.trail_decay = decay.clamp(0.0, 1.0);
        self
    }

    pub fn plan(&self) -> &RotationSyncPlan {
        &self.plan
    }

    /// Index of the frame the next `advance` produces.
    pub fn next_frame(&self) -> usize {
        self.next_frame
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn cover_rotation(&self) -> f64 {
        self.cover_rotation
    }

    pub fn hue_offset(&self) -> f64 {
        self.hue_offset
    }

    pub fn text_fade(&self) -> &TextFadeHistory {
        &self.text_fade
    }

    pub fn trail(&self) -> &RgbImage {
        &self.trail
    }

    /// Step the accumulators and decay the trail for the next frame.
    ///
    /// The ring/cover angle advances by the same speed as the waveform angle,
    /// scaled by its own multiplier; direction is applied when drawing.
    pub fn advance(
        &mut self,
        volume_intensity: f32,
        waveform_speed_mult: f64,
        ring_speed_mult: f64,
    ) -> FrameAnimationSnapshot {
        let volume_intensity = volume_intensity.clamp(0.0, 1.0);
        let rotation_speed = self.plan.speed(volume_intensity);

        self.rotation += rotation_speed * waveform_speed_mult;
        self.cover_rotation += rotation_speed * ring_speed_mult;
        self.hue_offset = (self.hue_offset + HUE_SHIFT_BASE + volume_intensity as f64) % 360.0;
        self.text_fade.push(volume_intensity);
        decay_in_place(&mut self.trail, self.trail_decay);

        let snapshot = FrameAnimationSnapshot {
            frame_idx: self.next_frame,
            rotation: self.rotation,
            cover_rotation: self.cover_rotation,
            hue_offset: self.hue_offset,
            volume_intensity,
            rotation_speed,
        };
        self.next_frame += 1;
        snapshot
    }

    /// Move the decayed trail out to seed the next composite.
    ///
    /// Leaves a black image behind until [`Self::store_trail`] is called.
    pub fn take_trail(&mut self) -> RgbImage {
        let (width, height) = self.trail.dimensions();
        std::mem::replace(&mut self.trail, RgbImage::new(width, height))
    }

    /// Persist the fully composited frame (before any fade to black).
    pub fn store_trail(&mut self, composited: RgbImage) {
        debug_assert_eq!(composited.dimensions(), self.trail.dimensions());
        self.trail = composited;
    }
}

/// Scale every channel by `factor`, truncating toward zero.
pub fn decay_in_place(image: &mut RgbImage, factor: f32) {
    if factor >= 1.0 {
        return;
    }
    for value in image.iter_mut() {
        *value = (*value as f32 * factor) as u8;
    }
}
