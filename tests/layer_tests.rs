//! Integration tests for the default layer renderers and compositing.


use image::{Rgb, RgbImage, Rgba, RgbaImage};
use psyviz::animation::{AnimationState, FrameAnimationSnapshot, RotationSyncPlan};
use psyviz::compositor::{compose, FrameLayers};
use psyviz::config::{CoverShape, RenderConfig, RotationDirection, BAND_COUNT, PALETTES};
use psyviz::layers::rings::RING_SHAPES;
use psyviz::layers::{FrameContext, LayerRenderer, PsychedelicLayers};
use psyviz::timeline::CoverTransform;
use render_fixtures::*;

fn snapshot() -> FrameAnimationSnapshot {
    let mut state = AnimationState::new(RotationSyncPlan::new(10.0, 30), 4, 4);
    state.advance(0.6, 1.0, 1.0)
}

fn waveforms(points: usize) -> Vec<Vec<f32>> {
    (0..BAND_COUNT)
        .map(|band| {
            (0..points)
                .map(|i| ((i as f32 * 0.2 + band as f32).sin() * 0.8).clamp(-1.0, 1.0))
                .collect()
        })
        .collect()
}

fn lit_pixels(layer: &RgbaImage) -> usize {
    layer.pixels().filter(|p| p.0[3] > 0).count()
}

/// Render every layer once with lively inputs.
fn render_all(layers: &mut dyn LayerRenderer) -> FrameLayers {
    let snapshot = snapshot();
    let bands = vec![0.7f32; BAND_COUNT];
    let waves = waveforms(layers.waveform_points());
    let stagger = vec![0.0; BAND_COUNT];
    let ctx = FrameContext {
        animation: &snapshot,
        band_values: &bands,
        beat_intensity: 0.5,
        waveforms: &waves,
        cover: CoverTransform::FULL,
        stagger_offsets: &stagger,
        text_opacity: 1.0,
    };
    FrameLayers {
        starfield: layers.starfield(&ctx),
        waveform: layers.waveform(&ctx),
        waveform_angle: None,
        cover_and_rings: layers.cover_and_rings(&ctx),
        text: layers.text(&ctx),
    }
}

#[test]
fn test_default_layers_fill_the_frame_size() {
    let config = test_config();
    let mut layers = PsychedelicLayers::with_cover(&config, None);
    assert_eq!(layers.bands().len(), BAND_COUNT);

    let frame = render_all(&mut layers);
    let starfield = frame.starfield.as_ref().expect("starfield is on by default");
    assert_eq!(starfield.dimensions(), (160, 90));
    assert_eq!(frame.waveform.dimensions(), (160, 90));
    let rings = frame.cover_and_rings.as_ref().expect("rings are on by default");
    assert!(lit_pixels(rings) > 0);
    assert!(frame.text.is_none(), "no text configured");
}

#[test]
fn test_disabled_layers_are_absent() {
    let config = RenderConfig {
        starfield_enabled: false,
        rings_enabled: false,
        ..test_config()
    };
    let mut layers = PsychedelicLayers::with_cover(&config, None);
    let frame = render_all(&mut layers);
    assert!(frame.starfield.is_none());
    assert!(frame.cover_and_rings.is_none());
}

#[test]
fn test_every_ring_shape_draws() {
    for shape in RING_SHAPES.iter() {
        let config = RenderConfig {
            ring_shape: shape.name().to_string(),
            ring_count: 8,
            ring_rotation: RotationDirection::Cw,
            starfield_enabled: false,
            ..test_config()
        };
        let mut layers = PsychedelicLayers::with_cover(&config, None);
        let frame = render_all(&mut layers);
        let rings = frame.cover_and_rings.expect("rings enabled");
        assert!(lit_pixels(&rings) > 0, "shape {} drew nothing", shape.name());
    }
}

#[test]
fn test_every_palette_renders_waveforms() {
    for palette in PALETTES.iter() {
        let config = RenderConfig {
            palette: palette.name.to_string(),
            starfield_enabled: false,
            rings_enabled: false,
            ..test_config()
        };
        let mut layers = PsychedelicLayers::with_cover(&config, None);
        let frame = render_all(&mut layers);
        assert!(
            mean_brightness(frame.waveform.as_raw()) > 0.0,
            "palette {} drew a black waveform",
            palette.name
        );
    }
}

#[test]
fn test_cover_loaded_from_disk_is_drawn_in_the_centre() {
    let dir = tempfile::tempdir().unwrap();
    let cover_path = dir.path().join("cover.png");
    RgbaImage::from_pixel(32, 32, Rgba([10, 200, 30, 255]))
        .save(&cover_path)
        .unwrap();

    for shape in [CoverShape::Square, CoverShape::Round] {
        let config = RenderConfig {
            cover_image_path: Some(cover_path.clone()),
            cover_shape: shape,
            rings_enabled: false,
            starfield_enabled: false,
            static_cover: true,
            ..test_config()
        };
        let mut layers = PsychedelicLayers::new(&config);
        let frame = render_all(&mut layers);
        let cover = frame.cover_and_rings.expect("cover configured");
        let centre = cover.get_pixel(80, 45).0;
        assert_eq!(centre[3], 255, "{:?} cover is not opaque at the centre", shape);
        assert!(centre[1] > 150 && centre[0] < 60, "{:?} centre is {:?}", shape, centre);
    }
}

#[test]
fn test_unreadable_cover_is_skipped() {
    let config = RenderConfig {
        cover_image_path: Some("/nonexistent/psyviz/cover.png".into()),
        rings_enabled: false,
        ..test_config()
    };
    let mut layers = PsychedelicLayers::new(&config);
    assert!(render_all(&mut layers).cover_and_rings.is_none());
}

#[test]
fn test_layer_order_puts_cover_over_waveform_over_stars() {
    let mut starfield = RgbaImage::new(3, 1);
    starfield.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
    starfield.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
    starfield.put_pixel(2, 0, Rgba([255, 255, 255, 255]));
    let mut waveform = RgbImage::new(3, 1);
    waveform.put_pixel(1, 0, Rgb([0, 0, 200]));
    waveform.put_pixel(2, 0, Rgb([0, 0, 200]));
    let mut cover = RgbaImage::new(3, 1);
    cover.put_pixel(2, 0, Rgba([200, 0, 0, 255]));

    let layers = FrameLayers {
        starfield: Some(starfield),
        waveform,
        waveform_angle: None,
        cover_and_rings: Some(cover),
        text: None,
    };
    let out = compose(RgbImage::new(3, 1), &layers);
    assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
    assert_eq!(out.get_pixel(1, 0), &Rgb([0, 0, 200]));
    assert_eq!(out.get_pixel(2, 0), &Rgb([200, 0, 0]));
}

#[test]
fn test_black_waveform_keeps_the_trail() {
    let trail = RgbImage::from_pixel(4, 4, Rgb([90, 60, 30]));
    let layers = FrameLayers {
        starfield: None,
        waveform: RgbImage::new(4, 4),
        waveform_angle: Some(0.7),
        cover_and_rings: None,
        text: None,
    };
    assert_eq!(compose(trail.clone(), &layers), trail);
}

#[test]
fn test_text_layer_follows_font_availability() {
    let config = RenderConfig {
        text_overlay: Some("Psyviz".into()),
        text_overlay2: Some("Live".into()),
        starfield_enabled: false,
        rings_enabled: false,
        ..test_config()
    };
    let mut layers = PsychedelicLayers::with_cover(&config, None);
    let text = render_all(&mut layers).text;

    match psyviz::layers::find_font(None) {
        Ok(_) => {
            let text = text.expect("a font was found, so text should render");
            assert!(lit_pixels(&text) > 0);
        }
        Err(_) => assert!(text.is_none(), "without a font the text layer is disabled"),
    }
}
