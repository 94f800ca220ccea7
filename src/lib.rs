//! Psyviz Core
//!
//! Audio-reactive visualizer that renders psychedelic music videos frame by
//! frame and streams them into an FFmpeg hardware encoder.
//!
//! # Features
//!
//! - Audio loading (WAV, MP3, FLAC, AAC) via Symphonia
//! - Per-frame band analysis and beat detection via RustFFT
//! - Layered 2D rendering (starfield, waveforms, cover with rings, text) via tiny-skia
//! - Rotation synchronised to the song length and an afterimage trail
//! - Raw frame streaming into FFmpeg (VideoToolbox, NVENC, Quick Sync, libx264)
//! - Cancellable background renders with progress events

pub mod animation;
pub mod audio;
pub mod compositor;
pub mod config;
pub mod layers;
pub mod pipeline;
pub mod timeline;
pub mod video;

// Re-export commonly used types
pub use animation::{AnimationState, FrameAnimationSnapshot, RotationSyncPlan};
pub use audio::{load_audio, AnalyzedTrack, AudioData, AudioProcessor, BeatDetector, SpectrumAnalyzer};
pub use config::{RenderConfig, Resolution, RotationDirection};
pub use layers::{LayerRenderer, PsychedelicLayers};
pub use pipeline::{
    start_render, PipelineError, RenderEvent, RenderJob, RenderOutcome, RenderProgress,
    RenderSession,
};
pub use video::{EncodeError, EncoderSettings, VideoCodec};
