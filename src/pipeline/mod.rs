//! Full render pipeline combining audio, layers, compositing and encoding.
//!
//! A [`RenderSession`] owns everything one render needs. Frames are produced
//! strictly in order: each frame's animation state and afterimage trail are
//! derived from the previous frame, so nothing here runs in parallel except
//! the encoder's diagnostic drain.

pub mod job;

pub use job::{start_render, RenderEvent, RenderJob, RenderSummary};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use image::RgbImage;

use crate::animation::{AnimationState, RotationSyncPlan};
use crate::audio::{
    load_audio, AnalysisOptions, AnalyzedTrack, AudioData, AudioError, AudioProcessor, BeatDetector,
};
use crate::compositor::{compose, FadeOut, FrameLayers};
use crate::config::{ConfigError, RenderConfig, BAND_COUNT};
use crate::layers::{FrameContext, LayerRenderer, PsychedelicLayers};
use crate::timeline::{cover_transform, progress, ring_stagger_offsets};
use crate::video::{EncodeError, EncodeJob, EncodeTarget, EncoderSettings};

/// Errors that can occur during pipeline execution.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("Encoder error: {0}")]
    Encode(#[from] EncodeError),
    #[error("Failed to start render thread: {0}")]
    Thread(std::io::Error),
    #[error("Render worker panicked")]
    WorkerPanicked,
}

/// Terminal state of a render.
#[derive(Debug)]
pub enum RenderOutcome {
    Completed(PathBuf),
    /// Stopped on request. The encoder saw end of input before it was
    /// stopped, so the output may hold a playable video of the frames
    /// written so far.
    Cancelled,
    Failed(PipelineError),
}

impl RenderOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RenderOutcome::Completed(_))
    }

    /// Convert into a `Result`, treating cancellation as `Ok(None)`.
    pub fn into_result(self) -> Result<Option<PathBuf>, PipelineError> {
        match self {
            RenderOutcome::Completed(path) => Ok(Some(path)),
            RenderOutcome::Cancelled => Ok(None),
            RenderOutcome::Failed(e) => Err(e),
        }
    }
}

/// Progress after a frame was handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProgress {
    pub frames_written: usize,
    pub total_frames: usize,
    /// Projected time until the last frame, from the average so far.
    pub eta: Option<Duration>,
}

impl RenderProgress {
    pub fn new(frames_written: usize, total_frames: usize, elapsed: Duration) -> Self {
        let eta = (frames_written > 0).then(|| {
            let remaining = total_frames.saturating_sub(frames_written) as f64;
            Duration::from_secs_f64(elapsed.as_secs_f64() / frames_written as f64 * remaining)
        });
        Self {
            frames_written,
            total_frames,
            eta,
        }
    }

    /// Completed share in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.total_frames == 0 {
            1.0
        } else {
            (self.frames_written as f32 / self.total_frames as f32).min(1.0)
        }
    }
}

/// One render: configuration plus its audio, beat and layer collaborators.
pub struct RenderSession {
    config: RenderConfig,
    audio: Box<dyn AudioProcessor>,
    beats: Box<dyn BeatDetector>,
    layers: Box<dyn LayerRenderer>,
    encoder: EncoderSettings,
    /// Decoded audio, kept when the session built its own collaborators.
    source: Option<AudioData>,
}

type Collaborators = (Box<dyn AudioProcessor>, Box<dyn BeatDetector>, Box<dyn LayerRenderer>);

/// Analysis, beat detection and layers for `config`, in preview quality
/// when it sets `preview_seconds`.
fn default_collaborators(config: &RenderConfig, audio: &AudioData) -> Collaborators {
    let track = AnalyzedTrack::analyze(
        audio,
        &config.bands(),
        AnalysisOptions::for_render(config.fps, config.preview_seconds),
    );
    let beats = track.beat_detector();
    let layers = PsychedelicLayers::new(config);
    (Box::new(track), Box::new(beats), Box::new(layers))
}

impl RenderSession {
    /// Decode and analyse the configured audio and build the default layers.
    pub fn from_config(config: RenderConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let audio = load_audio(&config.audio_path)?;
        let (track, beats, layers) = default_collaborators(&config, &audio);

        let mut session = Self::new(config, track, beats, layers)?;
        session.source = Some(audio);
        Ok(session)
    }

    /// Assemble a session from explicit collaborators.
    pub fn new(
        config: RenderConfig,
        audio: Box<dyn AudioProcessor>,
        beats: Box<dyn BeatDetector>,
        layers: Box<dyn LayerRenderer>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            audio,
            beats,
            layers,
            encoder: EncoderSettings::default(),
            source: None,
        })
    }

    pub fn with_encoder(mut self, encoder: EncoderSettings) -> Self {
        self.encoder = encoder;
        self
    }

    /// Render only the first `seconds`; an existing shorter bound wins.
    ///
    /// A session from [`RenderSession::from_config`] re-analyses its audio
    /// and rebuilds its layers in preview quality, matching a config that set
    /// `preview_seconds` up front. Sessions assembled with
    /// [`RenderSession::new`] keep their collaborators and only get shorter.
    pub fn limit_duration(&mut self, seconds: f64) -> Result<(), PipelineError> {
        let limited = match self.config.preview_seconds {
            Some(current) => current.min(seconds),
            None => seconds,
        };
        let previous = self.config.preview_seconds.replace(limited);
        if let Err(e) = self.config.validate() {
            self.config.preview_seconds = previous;
            return Err(e.into());
        }

        if previous != Some(limited) {
            if let Some(source) = &self.source {
                log::info!("Preparing {:.1}s preview", limited);
                let (audio, beats, layers) = default_collaborators(&self.config, source);
                self.audio = audio;
                self.beats = beats;
                self.layers = layers;
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn encoder(&self) -> &EncoderSettings {
        &self.encoder
    }

    /// Seconds of video this session produces.
    pub fn render_duration(&self) -> f64 {
        self.config.render_duration(self.audio.duration())
    }

    pub fn total_frames(&self) -> usize {
        self.config.total_frames(self.audio.duration())
    }

    /// Frame shown as a still preview: one eighth into the song.
    pub fn preview_frame_index(&self) -> usize {
        (self.audio.frame_count() / 8).min(self.total_frames().saturating_sub(1))
    }

    /// Render everything to `output`, blocking until the encoder is done.
    pub fn render_to_file(&mut self, output: &Path) -> Result<PathBuf, PipelineError> {
        let never = AtomicBool::new(false);
        match self.render_cancellable(output, &never, |_| {}) {
            RenderOutcome::Completed(path) => Ok(path),
            RenderOutcome::Failed(e) => Err(e),
            // Nothing can set the flag
            RenderOutcome::Cancelled => Ok(output.to_path_buf()),
        }
    }

    /// Render to `output`, checking `cancel` before every frame.
    ///
    /// `on_progress` is called after each frame is written.
    pub fn render_cancellable<F>(&mut self, output: &Path, cancel: &AtomicBool, mut on_progress: F) -> RenderOutcome
    where
        F: FnMut(RenderProgress),
    {
        let total_frames = self.total_frames();
        let duration = self.render_duration();
        let (width, height) = (self.config.resolution.width, self.config.resolution.height);
        let plan = RotationSyncPlan::new(duration, self.config.fps);
        log::info!(
            "Rendering {} frames ({:.1}s at {} fps, {}x{}) to {}",
            total_frames,
            duration,
            self.config.fps,
            width,
            height,
            output.display()
        );
        log::info!(
            "Rotation sync: {} turns, base speed {:.6} rad/frame",
            plan.target_rotations,
            plan.base_speed
        );

        let target = EncodeTarget {
            width,
            height,
            fps: self.config.fps,
            audio_path: self.config.audio_path.clone(),
            duration,
            output: output.to_path_buf(),
        };
        let mut job = match EncodeJob::spawn(&self.encoder, &target) {
            Ok(job) => job,
            Err(e) => {
                log::error!("{}", e);
                return RenderOutcome::Failed(e.into());
            }
        };

        self.layers.restart();
        let mut state = AnimationState::new(plan, width, height).with_trail_decay(self.config.trail_decay);
        let fade = FadeOut::new(total_frames, self.config.fade_duration_seconds, self.config.fps);
        let started = Instant::now();

        for frame_idx in 0..total_frames {
            if cancel.load(Ordering::SeqCst) {
                job.teardown();
                log::info!("Render cancelled after {} frames", job.frames_written());
                return RenderOutcome::Cancelled;
            }

            let faded = self.render_next(&mut state, &fade, frame_idx, total_frames);
            let frame = faded.as_ref().unwrap_or_else(|| state.trail());

            if let Err(e) = job.write_frame(frame.as_raw()) {
                // A cancel racing the write can close the pipe first
                if cancel.load(Ordering::SeqCst) {
                    log::info!("Render cancelled after {} frames", job.frames_written());
                    return RenderOutcome::Cancelled;
                }
                if let EncodeError::WriteFailed { diagnostics, .. } = &e {
                    log::error!("Encoder stopped accepting frames: {}", diagnostics);
                }
                return RenderOutcome::Failed(e.into());
            }

            on_progress(RenderProgress::new(frame_idx + 1, total_frames, started.elapsed()));
        }

        match job.finish() {
            Ok(()) => {
                log::info!(
                    "Render finished in {:.1}s: {}",
                    started.elapsed().as_secs_f64(),
                    output.display()
                );
                RenderOutcome::Completed(output.to_path_buf())
            }
            Err(e) => {
                log::error!("{}", e);
                RenderOutcome::Failed(e.into())
            }
        }
    }

    /// Render a single still at `frame_idx` from a fresh animation state
    /// and freshly restarted layers.
    pub fn preview_frame(&mut self, frame_idx: usize) -> RgbImage {
        self.layers.restart();
        let total_frames = self.total_frames();
        let (width, height) = (self.config.resolution.width, self.config.resolution.height);
        let plan = RotationSyncPlan::new(self.render_duration(), self.config.fps);
        let mut state = AnimationState::new(plan, width, height).with_trail_decay(self.config.trail_decay);
        let fade = FadeOut::new(total_frames, self.config.fade_duration_seconds, self.config.fps);

        match self.render_next(&mut state, &fade, frame_idx, total_frames) {
            Some(faded) => faded,
            None => state.take_trail(),
        }
    }

    /// Advance the animation and composite one frame into `state`'s trail.
    ///
    /// Returns the faded copy when the frame falls inside the closing fade;
    /// otherwise the emitted frame is the trail itself.
    fn render_next(
        &mut self,
        state: &mut AnimationState,
        fade: &FadeOut,
        frame_idx: usize,
        total_frames: usize,
    ) -> Option<RgbImage> {
        let config = &self.config;
        let band_values = self.audio.band_values(frame_idx);
        let volume_intensity = self.audio.volume_intensity(frame_idx);
        let beat_intensity = self.beats.detect(frame_idx).clamp(0.0, 1.0);

        let snapshot = state.advance(
            volume_intensity,
            config.waveform_rotation_speed,
            config.ring_rotation_speed,
        );

        let points = self.layers.waveform_points();
        let waveforms: Vec<Vec<f32>> = (0..BAND_COUNT)
            .map(|band_idx| self.audio.waveform_samples(frame_idx, band_idx, points))
            .collect();

        let progress = progress(frame_idx, total_frames);
        let stagger = ring_stagger_offsets(
            config.ring_stagger,
            config.ring_rotation,
            config.ring_count,
            progress,
        );
        let ctx = FrameContext {
            animation: &snapshot,
            band_values: &band_values,
            beat_intensity,
            waveforms: &waveforms,
            cover: cover_transform(config.cover_timeline, progress, config.resolution.height),
            stagger_offsets: &stagger,
            text_opacity: state.text_fade().opacity(beat_intensity),
        };

        let layers = FrameLayers {
            starfield: if config.starfield_enabled {
                self.layers.starfield(&ctx)
            } else {
                None
            },
            waveform: self.layers.waveform(&ctx),
            waveform_angle: config
                .waveform_rotation
                .sign()
                .map(|sign| sign * snapshot.rotation),
            cover_and_rings: self.layers.cover_and_rings(&ctx),
            text: if config.has_text() {
                self.layers.text(&ctx)
            } else {
                None
            },
        };

        let composited = compose(state.take_trail(), &layers);
        let faded = fade.apply(frame_idx, &composited);
        state.store_trail(composited);
        faded
    }
}
