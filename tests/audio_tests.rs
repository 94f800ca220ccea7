//! Integration tests for audio module.

use psyviz::audio::{
    generate_sine, generate_test_beat, generate_white_noise, load_audio, write_wav,
    AnalysisOptions, AnalyzedTrack, AudioData, AudioProcessor, BeatDetector, SpectrumAnalyzer,
};
use psyviz::config::{bands_for_palette, BAND_COUNT};

const SAMPLE_RATE: u32 = 44100;

fn analyse(audio: &AudioData, options: AnalysisOptions) -> AnalyzedTrack {
    AnalyzedTrack::analyze(audio, &bands_for_palette("rainbow"), options)
}

#[test]
fn test_sine_wave_spectrum_peak() {
    // Generate a 1kHz sine wave
    let freq = 1000.0;
    let samples = generate_sine(freq, SAMPLE_RATE, 1.0, 1.0);

    let mut analyzer = SpectrumAnalyzer::new(2048);
    let spectrum = analyzer.analyze(&samples);

    // Find the peak frequency
    let peak_bin = spectrum
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap();

    let peak_freq = analyzer.bin_to_freq(peak_bin, SAMPLE_RATE);

    // Peak should be within 50 Hz of expected frequency
    assert!(
        (peak_freq - freq).abs() < 50.0,
        "Expected peak at {} Hz, got {} Hz",
        freq,
        peak_freq
    );
}

#[test]
fn test_multiple_frequencies() {
    // Generate two tones
    let freq1 = 440.0;
    let freq2 = 880.0;
    let samples1 = generate_sine(freq1, SAMPLE_RATE, 1.0, 0.5);
    let samples2 = generate_sine(freq2, SAMPLE_RATE, 1.0, 0.5);

    // Mix them
    let mixed: Vec<f32> = samples1.iter().zip(&samples2).map(|(a, b)| a + b).collect();

    let mut analyzer = SpectrumAnalyzer::new(4096);
    let spectrum = analyzer.analyze(&mixed);

    let bin1 = analyzer.freq_to_bin(freq1, SAMPLE_RATE);
    let bin2 = analyzer.freq_to_bin(freq2, SAMPLE_RATE);

    // Both frequencies should have significant energy
    assert!(spectrum[bin1] > 0.1, "Expected energy at {} Hz", freq1);
    assert!(spectrum[bin2] > 0.1, "Expected energy at {} Hz", freq2);
}

#[test]
fn test_band_energy_isolates_tone() {
    let samples = generate_sine(300.0, SAMPLE_RATE, 0.5, 1.0);
    let mut analyzer = SpectrumAnalyzer::new(2048);
    let spectrum = analyzer.analyze(&samples);

    let inside = analyzer.band_energy(&spectrum, 200.0, 400.0, SAMPLE_RATE);
    let outside = analyzer.band_energy(&spectrum, 600.0, 800.0, SAMPLE_RATE);
    assert!(
        inside > outside * 10.0,
        "300 Hz tone should dominate its band: inside {}, outside {}",
        inside,
        outside
    );
}

#[test]
fn test_white_noise_lights_every_band() {
    let audio = AudioData::from_mono(generate_white_noise(SAMPLE_RATE, 1.0, 1.0, 42), SAMPLE_RATE);
    let track = analyse(&audio, AnalysisOptions::default());

    let values = track.band_values(10);
    assert_eq!(values.len(), BAND_COUNT);
    assert!(
        values.iter().all(|&v| v > 0.0),
        "White noise should reach every band, got {:?}",
        values
    );
}

#[test]
fn test_beat_detection_on_test_beat() {
    let bpm = 120.0;
    let duration = 5.0;
    let audio = AudioData::from_mono(generate_test_beat(bpm, SAMPLE_RATE, duration), SAMPLE_RATE);
    let track = analyse(&audio, AnalysisOptions::default());
    let mut beats = track.beat_detector();

    let intensities: Vec<f32> = (0..track.frame_count()).map(|i| beats.detect(i)).collect();
    assert!(intensities.iter().all(|v| (0.0..=1.0).contains(v)));

    // Count rising edges past a clear threshold
    let onsets = intensities
        .windows(2)
        .filter(|w| w[0] < 0.3 && w[1] >= 0.3)
        .count();
    let expected_beats = (duration * bpm / 60.0) as usize;
    assert!(
        onsets >= expected_beats / 2,
        "Expected at least {} beats for {} BPM over {}s, got {}",
        expected_beats / 2,
        bpm,
        duration,
        onsets
    );
}

#[test]
fn test_full_track_analysis() {
    let duration = 4.0;
    let audio = AudioData::from_mono(generate_test_beat(120.0, SAMPLE_RATE, duration), SAMPLE_RATE);
    let track = analyse(&audio, AnalysisOptions::for_render(30, None));

    assert!((track.duration() - duration as f64).abs() < 0.01);
    assert_eq!(track.frame_count(), 120);

    for frame in [0, 60, 119] {
        let values = track.band_values(frame);
        assert_eq!(values.len(), BAND_COUNT);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        let volume = track.volume_intensity(frame);
        assert!((0.0..=1.0).contains(&volume));
    }
}

#[test]
fn test_preview_analysis_is_bounded() {
    let audio = AudioData::from_mono(generate_test_beat(120.0, SAMPLE_RATE, 3.0), SAMPLE_RATE);
    let options = AnalysisOptions::for_render(30, Some(1.0));
    assert_eq!(options.fft_size, 1024);

    let track = analyse(&audio, options);
    assert_eq!(track.frame_count(), 30);
}

#[test]
fn test_short_audio_analysis() {
    // Shorter than a single FFT window per frame at the tail
    let audio = AudioData::from_mono(generate_sine(440.0, SAMPLE_RATE, 0.5, 1.0), SAMPLE_RATE);
    let track = analyse(&audio, AnalysisOptions::default());

    assert!(track.duration() > 0.0);
    assert_eq!(track.frame_count(), 15);
    assert_eq!(track.waveform_samples(14, 0, 100).len(), 100);
}

#[test]
fn test_silence_analysis() {
    let audio = AudioData::from_mono(vec![0.0; SAMPLE_RATE as usize], SAMPLE_RATE);
    let track = analyse(&audio, AnalysisOptions::default());

    for frame in 0..track.frame_count() {
        assert_eq!(track.volume_intensity(frame), 0.0, "Silence should have zero volume");
    }
    let mut beats = track.beat_detector();
    assert!(
        (0..track.frame_count()).all(|i| beats.detect(i) == 0.0),
        "Silence should have no beats"
    );
}

#[test]
fn test_wav_round_trip_through_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let samples = generate_sine(440.0, 22050, 1.0, 0.5);
    write_wav(&path, &samples, 22050).unwrap();

    let audio = load_audio(&path).unwrap();
    assert_eq!(audio.sample_rate, 22050);
    assert_eq!(audio.channels, 1);
    assert!((audio.duration() - 1.0).abs() < 0.01);

    let peak = audio.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    assert!((peak - 0.5).abs() < 0.01, "peak {} after 16-bit round trip", peak);
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(load_audio(std::path::Path::new("/nonexistent/psyviz/song.mp3")).is_err());
}
