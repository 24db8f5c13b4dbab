// Temporal module - Time-domain feature extraction
//
// This module computes features directly from the time-domain signal:
// loudness, zero-crossing rate and the energy-based voice-activity ratio.

/// Voice-activity analysis frame length (20 ms)
const VAD_FRAME_SECONDS: f32 = 0.02;

/// Frame energy relative to the clip's peak frame above which a frame is active
pub const VAD_RELATIVE_THRESHOLD: f32 = 0.02;

/// Temporal feature computation functions
pub struct TemporalFeatures {
    sample_rate: u32,
}

impl TemporalFeatures {
    /// Create a new temporal features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Root-mean-square amplitude of the whole signal
    pub fn compute_rms(&self, audio: &[f32]) -> f32 {
        if audio.is_empty() {
            return 0.0;
        }
        let energy: f64 = audio.iter().map(|&x| (x as f64) * (x as f64)).sum();
        (energy / audio.len() as f64).sqrt() as f32
    }

    /// Compute zero-crossing rate (ZCR)
    ///
    /// Formula: ZCR = (1 / (N - 1)) × Σ [sign(x[n]) != sign(x[n-1])]
    ///
    /// # Returns
    /// Zero-crossing rate (0.0 to 1.0)
    pub fn compute_zcr(&self, audio: &[f32]) -> f32 {
        if audio.len() < 2 {
            return 0.0;
        }

        let crossings = audio
            .windows(2)
            .filter(|pair| (pair[1] >= 0.0) != (pair[0] >= 0.0))
            .count();

        crossings as f32 / (audio.len() - 1) as f32
    }

    /// Compute the voice-activity ratio
    ///
    /// Short-time energy is measured over 20 ms frames with 50% overlap and
    /// normalized by the loudest frame, so the result does not depend on the
    /// clip's overall level. A frame is active when its normalized energy
    /// exceeds `VAD_RELATIVE_THRESHOLD`.
    ///
    /// # Returns
    /// Fraction of active frames in [0.0, 1.0]; 0.0 when the clip is shorter
    /// than one frame or entirely silent
    pub fn compute_voice_activity_ratio(&self, audio: &[f32]) -> f32 {
        let frame_length = ((self.sample_rate as f32 * VAD_FRAME_SECONDS) as usize).max(1);
        let hop_length = (frame_length / 2).max(1);

        if audio.len() < frame_length {
            return 0.0;
        }

        let energies: Vec<f32> = (0..=(audio.len() - frame_length) / hop_length)
            .map(|frame| {
                let start = frame * hop_length;
                audio[start..start + frame_length]
                    .iter()
                    .map(|&x| x * x)
                    .sum()
            })
            .collect();

        let peak = energies.iter().copied().fold(0.0f32, f32::max);
        if energies.is_empty() || peak <= 0.0 || !peak.is_finite() {
            return 0.0;
        }

        let active = energies
            .iter()
            .filter(|&&energy| energy / peak > VAD_RELATIVE_THRESHOLD)
            .count();

        (active as f32 / energies.len() as f32).clamp(0.0, 1.0)
    }
}
