//! Synthetic test signals.
//!
//! Deterministic generators used by tests, benches and the demo render, plus
//! a WAV writer so a generated signal can be handed to the encoder as the
//! audio input.

use std::f32::consts::PI;
use std::path::Path;

use super::loader::AudioData;

/// Sine wave at `frequency` Hz.
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// White noise from a fixed-seed LCG, reproducible across runs.
pub fn generate_white_noise(sample_rate: u32, duration: f32, amplitude: f32, seed: u64) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let mut state = seed;

    (0..num_samples)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let normalized = (state as f32 / u64::MAX as f32) * 2.0 - 1.0;
            amplitude * normalized
        })
        .collect()
}

/// A single bass drum hit, pitch sweeping from 150 Hz down to 50 Hz.
pub fn generate_kick(sample_rate: u32) -> Vec<f32> {
    let num_samples = (0.15 * sample_rate as f32) as usize;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let freq = 50.0 + 100.0 * (-t * 30.0).exp();
            let amp = (-t * 15.0).exp();
            amp * (2.0 * PI * freq * t).sin()
        })
        .collect()
}

/// Four-on-the-floor kicks with a sustained mid-range pad on top.
///
/// Exercises both the bass bands (beat detection) and the mid bands
/// (waveforms, rings) of the visualizer.
pub fn generate_test_beat(bpm: f32, sample_rate: u32, duration: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let samples_per_beat = ((60.0 / bpm) * sample_rate as f32) as usize;
    let kick = generate_kick(sample_rate);

    let mut samples = generate_sine(440.0, sample_rate, duration, 0.2);
    for (i, s) in generate_sine(220.0, sample_rate, duration, 0.15)
        .into_iter()
        .enumerate()
    {
        samples[i] += s;
    }

    let mut pos = 0;
    while pos < num_samples && samples_per_beat > 0 {
        for (i, &k) in kick.iter().enumerate() {
            if let Some(s) = samples.get_mut(pos + i) {
                *s += k * 0.8;
            }
        }
        pos += samples_per_beat;
    }

    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak > 1.0 {
        for s in &mut samples {
            *s /= peak;
        }
    }

    samples
}

/// A mono [`AudioData`] holding [`generate_test_beat`] at 120 BPM.
pub fn synthetic_track(sample_rate: u32, duration: f32) -> AudioData {
    AudioData::from_mono(generate_test_beat(120.0, sample_rate, duration), sample_rate)
}

/// Write mono f32 samples as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}
