//! Example: Render a visualization from synthetic audio.
//!
//! This example generates a synthetic beat pattern, writes it to a WAV file
//! and renders a short video through FFmpeg.
//!
//! Run with:
//!     cargo run --example render_synthetic

use std::path::Path;

use psyviz::audio::synth::{generate_test_beat, write_wav};
use psyviz::config::{CoverTimeline, RenderConfig, Resolution, RingStagger, RotationDirection};
use psyviz::pipeline::{start_render, RenderEvent, RenderOutcome, RenderSession};
use psyviz::video::{probe_encoders, EncoderSettings, VideoCodec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Psyviz - Synthetic Audio Example");
    println!("================================\n");

    // Generate synthetic audio (120 BPM beat, 5 seconds)
    let sample_rate: u32 = 44100;
    let duration_secs: f32 = 5.0;
    let bpm: f32 = 120.0;

    println!("Generating synthetic beat...");
    println!("  Sample rate: {} Hz", sample_rate);
    println!("  Duration: {} seconds", duration_secs);
    println!("  BPM: {}", bpm);

    let samples = generate_test_beat(bpm, sample_rate, duration_secs);
    let dir = tempfile::tempdir()?;
    let audio_path = dir.path().join("synthetic_beat.wav");
    write_wav(&audio_path, &samples, sample_rate)?;
    println!("  Wrote {} samples to {}\n", samples.len(), audio_path.display());

    let config = RenderConfig {
        audio_path,
        resolution: Resolution { width: 640, height: 360 },
        palette: "synthwave".to_string(),
        waveform_rotation: RotationDirection::Cw,
        ring_rotation: RotationDirection::Ccw,
        ring_count: 5,
        ring_shape: "hexagon".to_string(),
        ring_stagger: RingStagger::InnerLead,
        cover_timeline: CoverTimeline::Zoom,
        text_overlay: Some("Psyviz".to_string()),
        text_overlay2: Some("synthetic beat".to_string()),
        ..RenderConfig::default()
    };

    println!("Setting up renderer...");
    println!("  Resolution: {}x{}", config.resolution.width, config.resolution.height);
    println!("  FPS: {}", config.fps);
    println!("  Rings: {} x {}", config.ring_count, config.ring_shape);

    let codec = probe_encoders(Path::new("ffmpeg"))
        .map(|available| VideoCodec::auto_select(&available))
        .unwrap_or_default();
    println!("  Encoder: {}\n", codec);

    let session = RenderSession::from_config(config)?.with_encoder(EncoderSettings {
        codec,
        ..EncoderSettings::default()
    });

    let output_path = Path::new("synthetic_demo.mp4");
    println!("Encoding video to: {}", output_path.display());

    let job = start_render(session, output_path, None)?;
    for event in job.events().iter() {
        match event {
            RenderEvent::Progress(progress) if progress.frames_written % 30 == 0 => {
                println!(
                    "  Frame {}/{} ({:.0}%)",
                    progress.frames_written,
                    progress.total_frames,
                    progress.fraction() * 100.0
                );
            }
            RenderEvent::Progress(_) => {}
            RenderEvent::Finished(_) => break,
        }
    }

    match job.join() {
        RenderOutcome::Completed(path) => {
            println!("\nDone! Output: {}", path.display());
            Ok(())
        }
        RenderOutcome::Cancelled => Err("render cancelled".into()),
        RenderOutcome::Failed(e) => Err(e.into()),
    }
}
