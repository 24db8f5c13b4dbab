// Pitch module - autocorrelation fundamental-frequency tracking
//
// Each frame's autocorrelation is searched for its strongest peak between the
// lags of 500 Hz and 60 Hz. Frames that are quiet or weakly periodic are
// treated as unvoiced and excluded from the statistics.

use super::stats::mean_std;

/// Pitch analysis frame length in samples
const PITCH_FRAME: usize = 1024;
const PITCH_HOP: usize = 512;

const MIN_PITCH_HZ: f32 = 60.0;
const MAX_PITCH_HZ: f32 = 500.0;

/// Normalized autocorrelation a frame must reach to count as voiced
const VOICING_THRESHOLD: f32 = 0.5;

/// Frame RMS below which a frame is unvoiced
const VOICING_MIN_RMS: f32 = 0.01;

/// Summary of the voiced pitch track
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchSummary {
    pub mean: f32,
    pub std: f32,
    pub voiced_frames: usize,
}

pub struct PitchTracker {
    sample_rate: u32,
}

impl PitchTracker {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Fundamental frequency of one frame, if voiced
    pub fn frame_pitch(&self, frame: &[f32]) -> Option<f32> {
        let min_lag = (self.sample_rate as f32 / MAX_PITCH_HZ).floor() as usize;
        let max_lag = ((self.sample_rate as f32 / MIN_PITCH_HZ).ceil() as usize)
            .min(frame.len().saturating_sub(2));
        if min_lag < 1 || min_lag >= max_lag {
            return None;
        }

        let energy: f32 = frame.iter().map(|x| x * x).sum();
        let rms = (energy / frame.len() as f32).sqrt();
        if rms < VOICING_MIN_RMS || energy <= 0.0 {
            return None;
        }

        let autocorrelation = |lag: usize| -> f32 {
            frame.iter().zip(frame[lag..].iter()).map(|(a, b)| a * b).sum()
        };

        let (best_lag, best_value) = (min_lag..=max_lag)
            .map(|lag| (lag, autocorrelation(lag)))
            .fold((0, f32::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        if best_value / energy <= VOICING_THRESHOLD {
            return None;
        }

        // Parabolic refinement around the integer peak
        let left = autocorrelation(best_lag - 1);
        let right = autocorrelation(best_lag + 1);
        let curvature = left - 2.0 * best_value + right;
        let offset = if curvature < 0.0 {
            (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        Some(self.sample_rate as f32 / (best_lag as f32 + offset))
    }

    /// Track pitch over a clip and summarize the voiced frames
    pub fn summarize(&self, audio: &[f32]) -> PitchSummary {
        if audio.len() < PITCH_FRAME {
            return PitchSummary::default();
        }

        let pitches: Vec<f32> = (0..=(audio.len() - PITCH_FRAME) / PITCH_HOP)
            .filter_map(|frame| {
                let start = frame * PITCH_HOP;
                self.frame_pitch(&audio[start..start + PITCH_FRAME])
            })
            .collect();

        let (mean, std) = mean_std(pitches.iter().copied());
        PitchSummary {
            mean,
            std,
            voiced_frames: pitches.len(),
        }
    }
}
