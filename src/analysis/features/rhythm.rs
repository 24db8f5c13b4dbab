// Rhythm module - onset envelope and tempo estimation
//
// The onset envelope is the positive frame-to-frame increase of the decibel
// mel spectrum, averaged over bands. Tempo is the autocorrelation peak of
// that envelope inside the 30-300 BPM range, weighted toward 120 BPM.

use super::mel::MelSpectrogram;

const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;

/// Centre of the tempo prior
const PRIOR_BPM: f32 = 120.0;

/// Width of the tempo prior in octaves
const PRIOR_OCTAVES: f32 = 1.0;

/// Onset strength per frame; the first frame is always 0.0
pub fn onset_strength(mel: &MelSpectrogram) -> Vec<f32> {
    let mut envelope = Vec::with_capacity(mel.db.len());
    if mel.db.is_empty() {
        return envelope;
    }

    envelope.push(0.0);
    for pair in mel.db.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        let bands = current.len().max(1) as f32;
        let flux: f32 = current
            .iter()
            .zip(previous.iter())
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope.push(flux / bands);
    }
    envelope
}

/// Estimate tempo in BPM from an onset envelope
///
/// # Arguments
/// * `envelope` - Onset strength per frame
/// * `frames_per_second` - Envelope frame rate (sample_rate / hop)
///
/// # Returns
/// Tempo in BPM, or 0.0 if the envelope is too short or has no periodicity
pub fn estimate_tempo(envelope: &[f32], frames_per_second: f32) -> f32 {
    if envelope.len() < 2 || frames_per_second <= 0.0 {
        return 0.0;
    }

    let min_lag = ((60.0 * frames_per_second / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * frames_per_second / MIN_BPM).floor() as usize).min(envelope.len() - 1);
    if min_lag > max_lag {
        return 0.0;
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let correlation: f32 = centered
            .iter()
            .zip(centered[lag..].iter())
            .map(|(a, b)| a * b)
            .sum();
        if correlation <= 0.0 {
            continue;
        }

        let bpm = 60.0 * frames_per_second / lag as f32;
        let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
        let score = correlation * (-0.5 * octaves * octaves).exp();

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((lag, score));
        }
    }

    best.map_or(0.0, |(lag, _)| 60.0 * frames_per_second / lag as f32)
}
