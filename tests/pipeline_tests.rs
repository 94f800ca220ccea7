//! Integration tests for the render session and background jobs.
//!
//! The encoder is replaced by small shell scripts, so these run without
//! FFmpeg installed.


use std::sync::atomic::{AtomicBool, Ordering};

use psyviz::config::RenderConfig;
use psyviz::pipeline::{start_render, PipelineError, RenderEvent, RenderOutcome, RenderSession, RenderSummary};
use psyviz::video::EncodeError;
use render_fixtures::*;

const SECONDS: f32 = 2.0;

#[test]
fn test_total_frames_follow_duration() {
    let session = synthetic_session(test_config(), SECONDS);
    assert_eq!(session.total_frames(), 60);
    assert!((session.render_duration() - 2.0).abs() < 1e-9);
    assert_eq!(session.preview_frame_index(), 7);
}

#[test]
fn test_limit_duration_shortens_render() {
    let mut session = synthetic_session(test_config(), SECONDS);
    session.limit_duration(1.0).unwrap();
    assert_eq!(session.total_frames(), 30);
    // A longer bound never extends an existing one
    session.limit_duration(5.0).unwrap();
    assert_eq!(session.total_frames(), 30);
    assert!(session.limit_duration(-1.0).is_err());
    assert_eq!(session.total_frames(), 30);
}

#[test]
fn test_invalid_config_is_rejected_before_rendering() {
    let config = RenderConfig {
        ring_count: 0,
        ..test_config()
    };
    let track = synthetic_analysis(&config, SECONDS);
    let beats = track.beat_detector();
    let layers = psyviz::layers::PsychedelicLayers::with_cover(&test_config(), None);
    let result = RenderSession::new(config, Box::new(track), Box::new(beats), Box::new(layers));
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn test_from_config_reports_missing_audio() {
    let config = RenderConfig {
        audio_path: "/nonexistent/psyviz/song.wav".into(),
        ..test_config()
    };
    assert!(matches!(
        RenderSession::from_config(config),
        Err(PipelineError::Audio(_))
    ));
}

#[test]
fn test_from_config_decodes_wav() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = write_test_track(dir.path(), 1.0);
    let config = RenderConfig {
        audio_path,
        ..test_config()
    };
    let session = RenderSession::from_config(config).unwrap();
    assert_eq!(session.total_frames(), 30);
}

#[test]
fn test_preview_frame_has_output_size() {
    let mut session = synthetic_session(test_config(), SECONDS);
    let idx = session.preview_frame_index();
    let frame = session.preview_frame(idx);
    assert_eq!(frame.dimensions(), (160, 90));
    assert!(
        mean_brightness(frame.as_raw()) > 0.0,
        "a frame one eighth into a beat track should not be black"
    );
}

#[test]
fn test_limit_duration_matches_preview_config() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = write_test_track(dir.path(), SECONDS);
    let full = RenderConfig {
        audio_path,
        ..test_config()
    };
    let preview = RenderConfig {
        preview_seconds: Some(1.0),
        ..full.clone()
    };

    let mut bounded = RenderSession::from_config(full).unwrap();
    bounded.limit_duration(1.0).unwrap();
    let mut expected = RenderSession::from_config(preview.clone()).unwrap();

    assert_eq!(bounded.config(), &preview);
    assert_eq!(bounded.total_frames(), 30);
    assert_eq!(bounded.preview_frame_index(), expected.preview_frame_index());
    for idx in [0, bounded.preview_frame_index(), 29] {
        assert_eq!(bounded.preview_frame(idx), expected.preview_frame(idx), "frame {}", idx);
    }
}

#[test]
fn test_preview_frame_is_reproducible() {
    let mut session = synthetic_session(test_config(), SECONDS);
    let idx = session.preview_frame_index();
    let first = session.preview_frame(idx);
    // Moves the stars on if layers were not restarted
    session.preview_frame(idx + 10);
    assert_eq!(session.preview_frame(idx), first);
}

#[test]
fn test_encoder_not_found_fails_render() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = synthetic_session(test_config(), SECONDS)
        .with_encoder(stub_settings("/nonexistent/psyviz/ffmpeg".into()));
    let never = AtomicBool::new(false);

    match session.render_cancellable(&dir.path().join("out.mp4"), &never, |_| {}) {
        RenderOutcome::Failed(PipelineError::Encode(EncodeError::EncoderNotFound { program })) => {
            assert!(program.contains("ffmpeg"));
        }
        other => panic!("expected EncoderNotFound, got {:?}", other),
    }
}

#[cfg(unix)]
mod with_stub_encoder {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use psyviz::config::Resolution;
    use psyviz::layers::{FrameContext, LayerRenderer};

    const FRAME_BYTES: usize = 160 * 90 * 3;

    /// Paints one opaque full-frame cover on the first frame after a restart and
    /// nothing afterwards, so every later frame is the trail alone.
    struct FlashOnce {
        color: Rgb<u8>,
        width: u32,
        height: u32,
        drawn: bool,
    }

    impl FlashOnce {
        fn new(color: Rgb<u8>, config: &RenderConfig) -> Self {
            Self {
                color,
                width: config.resolution.width,
                height: config.resolution.height,
                drawn: false,
            }
        }
    }

    impl LayerRenderer for FlashOnce {
        fn waveform_points(&self) -> usize {
            8
        }

        fn starfield(&mut self, _ctx: &FrameContext<'_>) -> Option<RgbaImage> {
            None
        }

        fn waveform(&mut self, _ctx: &FrameContext<'_>) -> RgbImage {
            RgbImage::new(self.width, self.height)
        }

        fn cover_and_rings(&mut self, _ctx: &FrameContext<'_>) -> Option<RgbaImage> {
            if self.drawn {
                return None;
            }
            self.drawn = true;
            let [r, g, b] = self.color.0;
            Some(RgbaImage::from_pixel(self.width, self.height, Rgba([r, g, b, 255])))
        }

        fn text(&mut self, _ctx: &FrameContext<'_>) -> Option<RgbaImage> {
            None
        }

        fn restart(&mut self) {
            self.drawn = false;
        }
    }

    #[test]
    fn test_every_frame_reaches_the_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let stub = byte_counting_stub(dir.path());
        let output = dir.path().join("out.mp4");
        let mut session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        let mut reports = Vec::new();
        let never = AtomicBool::new(false);
        let outcome = session.render_cancellable(&output, &never, |p| reports.push(p));

        assert!(outcome.is_completed(), "unexpected outcome {:?}", outcome);
        assert_eq!(read_byte_count(&output), 60 * FRAME_BYTES);
        assert_eq!(reports.len(), 60);
        assert!(reports.windows(2).all(|w| w[1].frames_written == w[0].frames_written + 1));
        assert_eq!(reports.last().map(|p| p.frames_written), Some(60));
        assert_eq!(reports.last().and_then(|p| p.eta), Some(std::time::Duration::ZERO));
    }

    #[test]
    fn test_frame_size_follows_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let stub = byte_counting_stub(dir.path());
        let output = dir.path().join("out.mp4");
        let config = RenderConfig {
            resolution: Resolution { width: 64, height: 36 },
            preview_seconds: Some(0.5),
            ..test_config()
        };
        let mut session = synthetic_session(config, SECONDS).with_encoder(stub_settings(stub));

        let path = session.render_to_file(&output).unwrap();
        assert_eq!(path, output);
        assert_eq!(read_byte_count(&output), 15 * 64 * 36 * 3);
    }

    #[test]
    fn test_plain_five_second_render_delivers_150_frames() {
        let dir = tempfile::tempdir().unwrap();
        let stub = byte_counting_stub(dir.path());
        let output = dir.path().join("out.mp4");
        let config = RenderConfig {
            resolution: Resolution { width: 640, height: 360 },
            starfield_enabled: false,
            rings_enabled: false,
            ..test_config()
        };
        let mut session = synthetic_session(config, 5.0).with_encoder(stub_settings(stub));
        assert_eq!(session.total_frames(), 150);

        session.render_to_file(&output).unwrap();
        assert_eq!(read_byte_count(&output), 150 * 640 * 360 * 3);
    }

    fn capture_stub(dir: &std::path::Path) -> std::path::PathBuf {
        write_stub(dir, "capture.sh", "cat > \"$out\"")
    }

    fn captured_frames(path: &std::path::Path, frame_bytes: usize) -> Vec<Vec<u8>> {
        let raw = std::fs::read(path).expect("stub captured nothing");
        assert_eq!(raw.len() % frame_bytes, 0, "partial frame captured");
        raw.chunks(frame_bytes).map(|chunk| chunk.to_vec()).collect()
    }

    #[test]
    fn test_fade_darkens_emitted_frames_but_not_the_trail() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.rgb");
        let config = RenderConfig {
            starfield_enabled: false,
            trail_decay: 1.0,
            fade_duration_seconds: 1.0,
            ..test_config()
        };
        let color = Rgb([200u8, 120, 41]);
        let track = synthetic_analysis(&config, SECONDS);
        let beats = track.beat_detector();
        let layers = FlashOnce::new(color, &config);
        let mut session = RenderSession::new(config, Box::new(track), Box::new(beats), Box::new(layers))
            .unwrap()
            .with_encoder(stub_settings(capture_stub(dir.path())));

        session.render_to_file(&output).unwrap();
        let frames = captured_frames(&output, FRAME_BYTES);
        assert_eq!(frames.len(), 60);

        let fade_frames = 30usize;
        for (idx, frame) in frames.iter().enumerate() {
            let remaining = 60 - idx;
            let factor = if remaining < fade_frames {
                remaining as f32 / fade_frames as f32
            } else {
                1.0
            };
            let expected: Vec<u8> = color.0.iter().map(|&c| (c as f32 * factor) as u8).collect();
            // Each emitted frame is a single fade of the undimmed trail
            assert!(
                frame.chunks(3).all(|px| px == expected.as_slice()),
                "frame {} expected {:?}, got {:?}",
                idx,
                expected,
                &frame[..3]
            );
        }
    }

    #[test]
    fn test_bounded_job_matches_preview_config() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = write_test_track(dir.path(), SECONDS);
        let stub = capture_stub(dir.path());
        let full = RenderConfig {
            audio_path,
            ..test_config()
        };
        let preview = RenderConfig {
            preview_seconds: Some(1.0),
            ..full.clone()
        };

        let bounded_out = dir.path().join("bounded.rgb");
        let session = RenderSession::from_config(full)
            .unwrap()
            .with_encoder(stub_settings(stub.clone()));
        assert!(start_render(session, &bounded_out, Some(1.0)).unwrap().join().is_completed());

        let preview_out = dir.path().join("preview.rgb");
        let session = RenderSession::from_config(preview)
            .unwrap()
            .with_encoder(stub_settings(stub));
        assert!(start_render(session, &preview_out, None).unwrap().join().is_completed());

        let bounded = captured_frames(&bounded_out, FRAME_BYTES);
        let expected = captured_frames(&preview_out, FRAME_BYTES);
        assert_eq!(bounded.len(), 30);
        assert!(bounded == expected, "bounded render differs from the preview config");
    }

    #[test]
    fn test_cancel_before_first_frame_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(
            dir.path(),
            "count_pid.sh",
            "echo $$ > \"$out.pid\"\nexec wc -c > \"$out\"",
        );
        let output = dir.path().join("out.mp4");
        let mut session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        let cancel = AtomicBool::new(true);
        let mut reports = 0;
        let outcome = session.render_cancellable(&output, &cancel, |_| reports += 1);

        assert!(matches!(outcome, RenderOutcome::Cancelled));
        assert_eq!(reports, 0);
        // The stub may have been killed before it reported anything
        let counted = std::fs::read_to_string(&output).unwrap_or_default();
        assert!(counted.trim().is_empty() || counted.trim() == "0", "got {:?}", counted);

        #[cfg(target_os = "linux")]
        {
            if let Ok(pid) = std::fs::read_to_string(dir.path().join("out.mp4.pid")) {
                let proc_entry = std::path::Path::new("/proc").join(pid.trim());
                assert!(!proc_entry.exists(), "encoder {} still running", pid.trim());
            }
        }
    }

    #[test]
    fn test_cancel_mid_render_stops_at_frame_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let stub = byte_counting_stub(dir.path());
        let output = dir.path().join("out.mp4");
        let mut session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        let cancel = AtomicBool::new(false);
        let outcome = session.render_cancellable(&output, &cancel, |p| {
            if p.frames_written == 5 {
                cancel.store(true, Ordering::SeqCst);
            }
        });

        assert!(matches!(outcome, RenderOutcome::Cancelled));
        // The stub reports only after end of input, so it finished its output
        // on its own. Only whole frames, and none after the request was seen.
        assert_eq!(read_byte_count(&output), 5 * FRAME_BYTES);
    }

    #[test]
    fn test_diagnostic_flood_does_not_stall_render() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(
            dir.path(),
            "flood.sh",
            "yes 'frame= 1 fps=30 q=23.0 size= 1kB time=00:00:01' | head -n 100000 >&2\nwc -c > \"$out\"",
        );
        let output = dir.path().join("out.mp4");
        let mut session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        session.render_to_file(&output).unwrap();
        assert_eq!(read_byte_count(&output), 60 * FRAME_BYTES);
    }

    #[test]
    fn test_nonzero_exit_reports_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(
            dir.path(),
            "fail.sh",
            "cat > /dev/null\necho 'Error while opening encoder' >&2\nexit 3",
        );
        let mut session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        match session.render_to_file(&dir.path().join("out.mp4")) {
            Err(PipelineError::Encode(EncodeError::ExitedNonZero { status, diagnostics })) => {
                assert_eq!(status.code(), Some(3));
                assert!(diagnostics.contains("Error while opening encoder"));
            }
            other => panic!("expected ExitedNonZero, got {:?}", other),
        }
    }

    #[test]
    fn test_early_encoder_exit_fails_write() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(dir.path(), "quit.sh", "echo 'Unknown encoder' >&2\nexit 1");
        let mut session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        match session.render_to_file(&dir.path().join("out.mp4")) {
            Err(PipelineError::Encode(EncodeError::WriteFailed { diagnostics, .. })) => {
                assert!(diagnostics.contains("Unknown encoder"));
            }
            other => panic!("expected WriteFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_background_job_streams_progress_then_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let stub = byte_counting_stub(dir.path());
        let output = dir.path().join("out.mp4");
        let session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        let job = start_render(session, &output, Some(1.0)).unwrap();
        let events: Vec<RenderEvent> = job.events().iter().collect();
        let outcome = job.join();

        assert!(outcome.is_completed());
        let progress = events
            .iter()
            .filter(|e| matches!(e, RenderEvent::Progress(_)))
            .count();
        assert_eq!(progress, 30);
        assert_eq!(
            events.last(),
            Some(&RenderEvent::Finished(RenderSummary::Completed(output.clone())))
        );
        assert_eq!(read_byte_count(&output), 30 * FRAME_BYTES);
    }

    #[test]
    fn test_background_job_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let stub = byte_counting_stub(dir.path());
        let output = dir.path().join("out.mp4");
        let session = synthetic_session(test_config(), SECONDS).with_encoder(stub_settings(stub));

        let job = start_render(session, &output, None).unwrap();
        job.cancel();
        assert!(job.is_cancelled());
        let events: Vec<RenderEvent> = job.events().iter().collect();

        // The worker may or may not have written frames before the flag landed
        assert_eq!(events.last(), Some(&RenderEvent::Finished(RenderSummary::Cancelled)));
        assert!(matches!(job.join(), RenderOutcome::Cancelled));
    }
}
