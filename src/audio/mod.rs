//! Audio decoding and the per-frame features the visualizer reacts to.
//!
//! - Decoding via Symphonia (WAV, MP3, FLAC, AAC)
//! - FFT band energies via RustFFT
//! - [`AudioProcessor`] and [`BeatDetector`] contracts with default
//!   implementations
//! - Synthetic signals for tests and demos

pub mod beat;
pub mod fft;
pub mod loader;
pub mod processor;
pub mod synth;

pub use beat::{BeatDetector, EnergyBeatDetector, NoBeats};
pub use fft::SpectrumAnalyzer;
pub use loader::{load_audio, AudioData, AudioError};
pub use processor::{AnalysisOptions, AnalyzedTrack, AudioProcessor, FFT_SIZE_FULL, FFT_SIZE_PREVIEW};
pub use synth::{generate_kick, generate_sine, generate_test_beat, generate_white_noise, synthetic_track, write_wav};
