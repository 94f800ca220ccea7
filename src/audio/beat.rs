//! Beat intensity per video frame.

/// Produces a beat intensity for each frame.
///
/// Implementations may keep smoothing state between calls, so frames should be
/// requested in increasing order.
pub trait BeatDetector: Send {
    /// Beat intensity in `[0, 1]` for `frame_idx`.
    fn detect(&mut self, frame_idx: usize) -> f32;
}

/// Onset detector over precomputed low-frequency energies.
///
/// A frame is a beat when its weighted bass/low-mid energy exceeds the recent
/// average by the threshold. Intensity jumps to the onset strength and then
/// decays geometrically.
#[derive(Debug, Clone)]
pub struct EnergyBeatDetector {
    energy: Vec<f32>,
    history: usize,
    threshold: f32,
    decay: f32,
    intensity: f32,
    last_frame: Option<usize>,
}

impl EnergyBeatDetector {
    pub const DEFAULT_HISTORY: usize = 30;
    pub const DEFAULT_THRESHOLD: f32 = 0.3;
    pub const DEFAULT_DECAY: f32 = 0.7;

    const BASS_WEIGHT: f32 = 0.7;
    const LOW_MID_WEIGHT: f32 = 0.3;

    /// Build from per-frame energies of the bass and low-mid ranges.
    pub fn from_band_energies(bass: &[f32], low_mid: &[f32]) -> Self {
        let energy = bass
            .iter()
            .zip(low_mid)
            .map(|(b, m)| b * Self::BASS_WEIGHT + m * Self::LOW_MID_WEIGHT)
            .collect();
        Self::new(energy)
    }

    /// Build from a single per-frame energy curve.
    pub fn new(energy: Vec<f32>) -> Self {
        Self {
            energy,
            history: Self::DEFAULT_HISTORY,
            threshold: Self::DEFAULT_THRESHOLD,
            decay: Self::DEFAULT_DECAY,
            intensity: 0.0,
            last_frame: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay.clamp(0.0, 1.0);
        self
    }

    fn onset_strength(&self, frame_idx: usize) -> f32 {
        let Some(&current) = self.energy.get(frame_idx) else {
            return 0.0;
        };
        let start = frame_idx.saturating_sub(self.history);
        let previous = &self.energy[start..frame_idx];
        if previous.is_empty() {
            return 0.0;
        }
        let average = previous.iter().sum::<f32>() / previous.len() as f32;
        if average <= f32::EPSILON {
            // Sound after silence counts as a full onset
            return if current > f32::EPSILON { 1.0 } else { 0.0 };
        }
        if current > average * (1.0 + self.threshold) {
            (current / average - 1.0).min(1.0)
        } else {
            0.0
        }
    }
}

impl BeatDetector for EnergyBeatDetector {
    fn detect(&mut self, frame_idx: usize) -> f32 {
        // Smoothing only carries across consecutive frames
        if self.last_frame.map_or(true, |last| last + 1 != frame_idx) {
            self.intensity = 0.0;
        }
        self.last_frame = Some(frame_idx);

        let onset = self.onset_strength(frame_idx);
        self.intensity = (self.intensity * self.decay).max(onset).clamp(0.0, 1.0);
        self.intensity
    }
}

/// Detector that never fires. Used when no beat data is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBeats;

impl BeatDetector for NoBeats {
    fn detect(&mut self, _frame_idx: usize) -> f32 {
        0.0
    }
}
