//! Per-frame audio features consumed by the renderer.
//!
//! The render loop only sees the [`AudioProcessor`] contract. [`AnalyzedTrack`]
//! is the default implementation: the whole track is analysed once up front so
//! that frame lookups are cheap and deterministic.

use crate::config::{FrequencyBand, BAND_COUNT};

use super::beat::EnergyBeatDetector;
use super::fft::SpectrumAnalyzer;
use super::loader::AudioData;

/// FFT size for full renders.
pub const FFT_SIZE_FULL: usize = 2048;
/// FFT size for previews, trading frequency resolution for speed.
pub const FFT_SIZE_PREVIEW: usize = 1024;

/// Audio features indexed by video frame.
pub trait AudioProcessor: Send {
    /// Normalised energy of each frequency band, each in `[0, 1]`.
    ///
    /// Frames past the end of the analysed range are silent.
    fn band_values(&self, frame_idx: usize) -> Vec<f32>;

    /// `point_count` samples in `[-1, 1]` describing one band's waveform.
    fn waveform_samples(&self, frame_idx: usize, band_idx: usize, point_count: usize) -> Vec<f32>;

    /// Track duration in seconds.
    fn duration(&self) -> f64;

    /// Number of analysed video frames.
    fn frame_count(&self) -> usize;

    /// Overall loudness of a frame in `[0, 1]`.
    fn volume_intensity(&self, frame_idx: usize) -> f32 {
        let values = self.band_values(frame_idx);
        if values.is_empty() {
            return 0.0;
        }
        (values.iter().sum::<f32>() / values.len() as f32).clamp(0.0, 1.0)
    }
}

/// How a track is analysed.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub fps: u32,
    pub fft_size: usize,
    /// Only analyse the first N seconds.
    pub max_seconds: Option<f64>,
}

impl AnalysisOptions {
    /// Options matching a render at `fps`, optionally bounded to a preview.
    pub fn for_render(fps: u32, preview_seconds: Option<f64>) -> Self {
        Self {
            fps,
            fft_size: if preview_seconds.is_some() {
                FFT_SIZE_PREVIEW
            } else {
                FFT_SIZE_FULL
            },
            max_seconds: preview_seconds,
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::for_render(30, None)
    }
}

const BASS_HZ: (f32, f32) = (20.0, 250.0);
const LOW_MID_HZ: (f32, f32) = (250.0, 1000.0);

/// A decoded track analysed into per-frame band values.
#[derive(Debug, Clone)]
pub struct AnalyzedTrack {
    mono: Vec<f32>,
    samples_per_frame: f64,
    duration: f64,
    band_values: Vec<[f32; BAND_COUNT]>,
    bass: Vec<f32>,
    low_mid: Vec<f32>,
}

impl AnalyzedTrack {
    /// Analyse `audio` against the given band table.
    pub fn analyze(audio: &AudioData, bands: &[FrequencyBand], options: AnalysisOptions) -> Self {
        let mono = audio.to_mono();
        let duration = audio.duration();
        let sample_rate = audio.sample_rate.max(1);
        let fps = options.fps.max(1);
        let samples_per_frame = sample_rate as f64 / fps as f64;

        let analysed_seconds = options
            .max_seconds
            .map_or(duration, |limit| limit.min(duration));
        let frame_count = (analysed_seconds * fps as f64).floor() as usize;

        let mut analyzer = SpectrumAnalyzer::new(options.fft_size);
        let mut band_values = Vec::with_capacity(frame_count);
        let mut bass = Vec::with_capacity(frame_count);
        let mut low_mid = Vec::with_capacity(frame_count);

        for frame_idx in 0..frame_count {
            let start = ((frame_idx as f64 * samples_per_frame) as usize).min(mono.len());
            let end = (start + options.fft_size).min(mono.len());
            let spectrum = analyzer.analyze_padded(&mono[start..end]);

            let mut values = [0.0f32; BAND_COUNT];
            for (value, band) in values.iter_mut().zip(bands) {
                *value = analyzer.band_energy(&spectrum, band.min_hz, band.max_hz, sample_rate);
            }
            band_values.push(values);
            bass.push(analyzer.band_energy(&spectrum, BASS_HZ.0, BASS_HZ.1, sample_rate));
            low_mid.push(analyzer.band_energy(&spectrum, LOW_MID_HZ.0, LOW_MID_HZ.1, sample_rate));
        }

        // Normalise against the loudest band anywhere in the analysed range
        let peak = band_values
            .iter()
            .flat_map(|v| v.iter())
            .cloned()
            .fold(0.0f32, f32::max);
        if peak > 0.0 {
            for values in &mut band_values {
                for v in values.iter_mut() {
                    *v /= peak;
                }
            }
        }

        log::info!(
            "Analysed {} frames ({:.1}s of {:.1}s, fft {})",
            frame_count,
            analysed_seconds,
            duration,
            options.fft_size
        );

        Self {
            mono,
            samples_per_frame,
            duration,
            band_values,
            bass,
            low_mid,
        }
    }

    /// Beat detector over this track's bass and low-mid energies.
    pub fn beat_detector(&self) -> EnergyBeatDetector {
        EnergyBeatDetector::from_band_energies(&self.bass, &self.low_mid)
    }

    fn frame_window(&self, frame_idx: usize) -> &[f32] {
        let start = ((frame_idx as f64 * self.samples_per_frame) as usize).min(self.mono.len());
        let len = self.samples_per_frame.ceil() as usize;
        let end = (start + len).min(self.mono.len());
        &self.mono[start..end]
    }
}

impl AudioProcessor for AnalyzedTrack {
    fn band_values(&self, frame_idx: usize) -> Vec<f32> {
        self.band_values
            .get(frame_idx)
            .map(|v| v.to_vec())
            .unwrap_or_else(|| vec![0.0; BAND_COUNT])
    }

    fn waveform_samples(&self, frame_idx: usize, band_idx: usize, point_count: usize) -> Vec<f32> {
        let level = self
            .band_values
            .get(frame_idx)
            .and_then(|v| v.get(band_idx))
            .copied()
            .unwrap_or(0.0);
        let window = self.frame_window(frame_idx);
        if point_count == 0 || window.is_empty() || level == 0.0 {
            return vec![0.0; point_count];
        }

        let peak = window.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        if peak == 0.0 {
            return vec![0.0; point_count];
        }

        let last = window.len() - 1;
        (0..point_count)
            .map(|i| {
                let pos = if point_count > 1 {
                    i as f32 * last as f32 / (point_count - 1) as f32
                } else {
                    0.0
                };
                let lo = pos.floor() as usize;
                let hi = (lo + 1).min(last);
                let frac = pos - lo as f32;
                let sample = window[lo] * (1.0 - frac) + window[hi] * frac;
                (sample / peak * level).clamp(-1.0, 1.0)
            })
            .collect()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn frame_count(&self) -> usize {
        self.band_values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::{generate_sine, synthetic_track};
    use crate::config::bands_for_palette;

    fn analyse(audio: &AudioData, max_seconds: Option<f64>) -> AnalyzedTrack {
        let options = AnalysisOptions {
            fps: 30,
            fft_size: FFT_SIZE_PREVIEW,
            max_seconds,
        };
        AnalyzedTrack::analyze(audio, &bands_for_palette("rainbow"), options)
    }

    #[test]
    fn test_frame_count_follows_duration() {
        let track = analyse(&synthetic_track(22050, 2.0), None);
        assert_eq!(track.frame_count(), 60);
        assert!((track.duration() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_preview_bounds_analysed_frames() {
        let track = analyse(&synthetic_track(22050, 3.0), Some(1.0));
        assert_eq!(track.frame_count(), 30);
        // Duration still reports the whole track
        assert!((track.duration() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_band_values_are_normalised() {
        let track = analyse(&synthetic_track(22050, 2.0), None);
        let mut max_seen = 0.0f32;
        for frame in 0..track.frame_count() {
            let values = track.band_values(frame);
            assert_eq!(values.len(), BAND_COUNT);
            for v in values {
                assert!((0.0..=1.0).contains(&v), "band value {} out of range", v);
                max_seen = max_seen.max(v);
            }
        }
        assert!((max_seen - 1.0).abs() < 1e-5, "peak should normalise to 1.0");
    }

    #[test]
    fn test_tone_lights_up_its_band() {
        let audio = AudioData::from_mono(generate_sine(300.0, 22050, 1.0, 0.8), 22050);
        let track = analyse(&audio, None);
        let values = track.band_values(10);
        // 300 Hz falls in the Mid band (200-400 Hz)
        let loudest = values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(loudest, 4);
    }

    #[test]
    fn test_waveform_samples_shape_and_range() {
        let track = analyse(&synthetic_track(22050, 1.0), None);
        let samples = track.waveform_samples(5, 2, 150);
        assert_eq!(samples.len(), 150);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(track.waveform_samples(5, 2, 0).is_empty());
    }

    #[test]
    fn test_out_of_range_frames_are_silent() {
        let track = analyse(&synthetic_track(22050, 1.0), None);
        assert_eq!(track.band_values(10_000), vec![0.0; BAND_COUNT]);
        assert_eq!(track.volume_intensity(10_000), 0.0);
        assert!(track.waveform_samples(10_000, 0, 10).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_silence_yields_zero_volume() {
        let audio = AudioData::from_mono(vec![0.0; 22050], 22050);
        let track = analyse(&audio, None);
        assert_eq!(track.volume_intensity(3), 0.0);
    }
}
