//! FFT spectrum analysis using RustFFT.
//!
//! Magnitude spectra per video frame, reduced to band energies for the
//! visualizer.

use rustfft::{num_complex::Complex, FftPlanner};

/// Spectrum analyzer for audio data.
///
/// Uses FFT to convert time-domain audio samples to frequency-domain
/// magnitude spectrum suitable for visualization.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    fft_size: usize,
    window: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Create a new spectrum analyzer with the given FFT size.
    ///
    /// Common FFT sizes: 512, 1024, 2048, 4096
    /// Larger sizes give better frequency resolution but worse time resolution.
    pub fn new(fft_size: usize) -> Self {
        assert!(fft_size.is_power_of_two(), "FFT size must be a power of 2");

        // Create Hann window for smooth FFT (reduces spectral leakage)
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let t = i as f32 / (fft_size - 1) as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
            })
            .collect();

        Self {
            planner: FftPlanner::new(),
            fft_size,
            window,
        }
    }

    /// FFT size being used.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins in the output (FFT size / 2).
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute magnitude spectrum from audio samples.
    ///
    /// Returns magnitudes for frequencies from 0 to Nyquist (sample_rate / 2).
    /// The returned vector has length `fft_size / 2`.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len() < fft_size`.
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        assert!(
            samples.len() >= self.fft_size,
            "Not enough samples: need {} but got {}",
            self.fft_size,
            samples.len()
        );

        // Apply window and convert to complex
        let mut buffer: Vec<Complex<f32>> = samples[..self.fft_size]
            .iter()
            .zip(&self.window)
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();

        // Plan and execute FFT
        let fft = self.planner.plan_fft_forward(self.fft_size);
        fft.process(&mut buffer);

        // Return magnitudes (only positive frequencies)
        buffer[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm() / (self.fft_size as f32).sqrt())
            .collect()
    }

    /// Get the frequency in Hz for a given bin index.
    pub fn bin_to_freq(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Get the bin index for a given frequency in Hz.
    pub fn freq_to_bin(&self, freq: f32, sample_rate: u32) -> usize {
        (freq * self.fft_size as f32 / sample_rate as f32).round() as usize
    }

    /// Magnitude spectrum of a window that may be shorter than the FFT size.
    ///
    /// Short windows (the tail of a track) are zero-padded.
    pub fn analyze_padded(&mut self, samples: &[f32]) -> Vec<f32> {
        if samples.len() >= self.fft_size {
            return self.analyze(samples);
        }
        let mut padded = vec![0.0; self.fft_size];
        padded[..samples.len()].copy_from_slice(samples);
        self.analyze(&padded)
    }

    /// Mean magnitude of the bins between `min_hz` and `max_hz`.
    ///
    /// Narrow low-frequency ranges can fall between bins; the nearest bin is
    /// used so every range yields a value.
    pub fn band_energy(&self, spectrum: &[f32], min_hz: f32, max_hz: f32, sample_rate: u32) -> f32 {
        if spectrum.is_empty() {
            return 0.0;
        }
        let last = spectrum.len() - 1;
        let low = self.freq_to_bin(min_hz, sample_rate).min(last);
        let high = self.freq_to_bin(max_hz, sample_rate).min(spectrum.len());

        if high > low {
            spectrum[low..high].iter().sum::<f32>() / (high - low) as f32
        } else {
            spectrum[low]
        }
    }
}
