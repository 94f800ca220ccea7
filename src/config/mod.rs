//! Render configuration.
//!
//! A [`RenderConfig`] is captured once when a render starts and is never
//! mutated while frames are produced. It replaces loosely typed settings
//! maps with named fields that are validated up front.

pub mod palette;

pub use palette::{bands_for_palette, palette_by_name, FrequencyBand, Palette, BAND_COUNT, PALETTES};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hue advance per frame before the volume contribution, in degrees.
pub const HUE_SHIFT_BASE: f64 = 0.5;
/// Per-frame multiplicative decay of the afterimage trail.
pub const TRAIL_DECAY: f32 = 0.85;
/// Length of the closing fade to black.
pub const FADE_DURATION_SECONDS: f64 = 2.0;
/// Maximum number of rings (one per frequency band).
pub const MAX_RINGS: usize = BAND_COUNT;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rotation direction for an animated element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDirection {
    #[default]
    None,
    Cw,
    Ccw,
}

impl RotationDirection {
    /// Sign applied to an accumulated angle, or `None` when rotation is off.
    pub fn sign(self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Cw => Some(1.0),
            Self::Ccw => Some(-1.0),
        }
    }
}

/// Layout of the band waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformOrientation {
    /// One row per band, waves run left to right.
    #[default]
    Horizontal,
    /// One column per band, waves run top to bottom.
    Vertical,
}

/// Travel direction of starfield particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarDirection {
    #[default]
    Outward,
    Inward,
}

/// Mask applied to the cover image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverShape {
    #[default]
    Square,
    Round,
}

/// How the cover leaves and returns over the course of the render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverTimeline {
    #[default]
    None,
    Fade,
    Zoom,
    SlideUp,
    SlideDown,
}

/// Per-ring desynchronisation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingStagger {
    #[default]
    None,
    InnerCatch,
    OuterCatch,
    InnerLead,
    OuterLead,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    Top,
    Middle,
    #[default]
    Bottom,
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const LANDSCAPE_720P: Self = Self { width: 1280, height: 720 };
    pub const PHONE_VERTICAL: Self = Self { width: 1080, height: 1920 };
    pub const PHONE_HORIZONTAL: Self = Self { width: 1920, height: 1080 };

    /// Size in bytes of one packed RGB24 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::LANDSCAPE_720P
    }
}

/// Immutable snapshot of everything that shapes one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Source audio, also muxed into the output.
    pub audio_path: PathBuf,
    pub cover_image_path: Option<PathBuf>,
    pub resolution: Resolution,
    pub fps: u32,
    /// Render only the first N seconds.
    pub preview_seconds: Option<f64>,
    pub palette: String,

    pub waveform_rotation: RotationDirection,
    pub waveform_rotation_speed: f64,
    pub waveform_orientation: WaveformOrientation,

    pub starfield_enabled: bool,
    pub starfield_rotation: RotationDirection,
    pub starfield_direction: StarDirection,

    pub cover_shape: CoverShape,
    /// Cover size relative to the default.
    pub cover_size: f64,
    /// Disable volume and beat pulsing of the cover.
    pub static_cover: bool,
    pub cover_timeline: CoverTimeline,

    pub rings_enabled: bool,
    pub ring_shape: String,
    pub ring_count: usize,
    pub ring_scale: f64,
    pub ring_rotation: RotationDirection,
    pub ring_rotation_speed: f64,
    pub ring_stagger: RingStagger,

    pub text_overlay: Option<String>,
    pub text_overlay2: Option<String>,
    pub text_size: f64,
    pub text_h_align: HorizontalAlign,
    pub text_v_align: VerticalAlign,
    /// TrueType font for the overlay; system fonts are searched when unset.
    pub font_path: Option<PathBuf>,

    pub trail_decay: f32,
    pub fade_duration_seconds: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            audio_path: PathBuf::new(),
            cover_image_path: None,
            resolution: Resolution::default(),
            fps: 30,
            preview_seconds: None,
            palette: "rainbow".to_string(),
            waveform_rotation: RotationDirection::None,
            waveform_rotation_speed: 1.0,
            waveform_orientation: WaveformOrientation::Horizontal,
            starfield_enabled: true,
            starfield_rotation: RotationDirection::None,
            starfield_direction: StarDirection::Outward,
            cover_shape: CoverShape::Square,
            cover_size: 1.0,
            static_cover: false,
            cover_timeline: CoverTimeline::None,
            rings_enabled: true,
            ring_shape: "circle".to_string(),
            ring_count: 3,
            ring_scale: 1.0,
            ring_rotation: RotationDirection::None,
            ring_rotation_speed: 1.0,
            ring_stagger: RingStagger::None,
            text_overlay: None,
            text_overlay2: None,
            text_size: 1.0,
            text_h_align: HorizontalAlign::Center,
            text_v_align: VerticalAlign::Bottom,
            font_path: None,
            trail_decay: TRAIL_DECAY,
            fade_duration_seconds: FADE_DURATION_SECONDS,
        }
    }
}

impl RenderConfig {
    /// Load a configuration from a JSON settings file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Check every field once, before any frame is produced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid("width/height must be non-zero".into()));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "width/height must be even for yuv420p output, got {}x{}",
                width, height
            )));
        }
        if self.fps == 0 {
            return Err(ConfigError::Invalid("fps must be non-zero".into()));
        }
        if let Some(seconds) = self.preview_seconds {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "preview_seconds must be positive, got {}",
                    seconds
                )));
            }
        }
        if self.ring_count == 0 || self.ring_count > MAX_RINGS {
            return Err(ConfigError::Invalid(format!(
                "ring_count must be between 1 and {}, got {}",
                MAX_RINGS, self.ring_count
            )));
        }
        for (name, value) in [
            ("cover_size", self.cover_size),
            ("ring_scale", self.ring_scale),
            ("text_size", self.text_size),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("waveform_rotation_speed", self.waveform_rotation_speed),
            ("ring_rotation_speed", self.ring_rotation_speed),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.trail_decay) {
            return Err(ConfigError::Invalid(format!(
                "trail_decay must be within 0..=1, got {}",
                self.trail_decay
            )));
        }
        if !(self.fade_duration_seconds.is_finite() && self.fade_duration_seconds >= 0.0) {
            return Err(ConfigError::Invalid(
                "fade_duration_seconds must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Whether this render is a bounded preview.
    pub fn is_preview(&self) -> bool {
        self.preview_seconds.is_some()
    }

    /// Seconds actually rendered for a track of `audio_duration` seconds.
    pub fn render_duration(&self, audio_duration: f64) -> f64 {
        match self.preview_seconds {
            Some(seconds) => seconds.min(audio_duration),
            None => audio_duration,
        }
    }

    /// Number of frames rendered for a track of `audio_duration` seconds.
    pub fn total_frames(&self, audio_duration: f64) -> usize {
        (self.render_duration(audio_duration) * self.fps as f64).floor() as usize
    }

    /// Whether any overlay text is configured.
    pub fn has_text(&self) -> bool {
        let present = |t: &Option<String>| t.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.text_overlay) || present(&self.text_overlay2)
    }

    /// Band table tinted with the configured palette.
    pub fn bands(&self) -> Vec<FrequencyBand> {
        bands_for_palette(&self.palette)
    }
}
