// Tonal module - pitch-class and harmonic-space descriptors
//
// Chroma folds every spectral bin onto the 12 equal-tempered pitch classes.
// Tonnetz projects the L1-normalized chroma onto three circles (fifths,
// minor thirds, major thirds), two coordinates each.

use std::f32::consts::PI;

use super::fft::Spectrogram;

/// Pitch classes per octave
pub const N_CHROMA: usize = 12;

/// Tonnetz dimensions
pub const N_TONNETZ: usize = 6;

/// Bins below this frequency carry no usable pitch-class information
const CHROMA_MIN_HZ: f32 = 32.7;

/// Reference tuning (A4)
const A4_HZ: f32 = 440.0;

/// Pitch class of A when C is 0
const A_PITCH_CLASS: i32 = 9;

/// Chroma and tonnetz projection
pub struct TonalFeatures {
    /// Pitch class per FFT bin, `None` below `CHROMA_MIN_HZ`
    bin_classes: Vec<Option<usize>>,
    /// N_TONNETZ × N_CHROMA projection matrix
    phi: [[f32; N_CHROMA]; N_TONNETZ],
}

impl TonalFeatures {
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `n_fft` - FFT length the spectra were computed with
    pub fn new(sample_rate: u32, n_fft: usize) -> Self {
        let bin_classes = (0..n_fft / 2 + 1)
            .map(|bin| {
                let f = bin as f32 * sample_rate as f32 / n_fft as f32;
                if f < CHROMA_MIN_HZ {
                    return None;
                }
                let semitones = (12.0 * (f / A4_HZ).log2()).round() as i32;
                Some((semitones + A_PITCH_CLASS).rem_euclid(N_CHROMA as i32) as usize)
            })
            .collect();

        Self {
            bin_classes,
            phi: tonnetz_basis(),
        }
    }

    /// Per-frame chroma, each frame scaled so its strongest class is 1.0
    pub fn chroma(&self, spectrogram: &Spectrogram) -> Vec<[f32; N_CHROMA]> {
        spectrogram
            .frames
            .iter()
            .map(|frame| {
                let mut chroma = [0.0f32; N_CHROMA];
                for (mag, class) in frame.iter().zip(self.bin_classes.iter()) {
                    if let Some(class) = class {
                        chroma[*class] += mag * mag;
                    }
                }

                let peak = chroma.iter().copied().fold(0.0f32, f32::max);
                if peak > 0.0 {
                    chroma.iter_mut().for_each(|c| *c /= peak);
                }
                chroma
            })
            .collect()
    }

    /// Per-frame tonal centroid coordinates
    pub fn tonnetz(&self, chroma: &[[f32; N_CHROMA]]) -> Vec<[f32; N_TONNETZ]> {
        chroma
            .iter()
            .map(|frame| {
                let mut coordinates = [0.0f32; N_TONNETZ];
                let total: f32 = frame.iter().map(|c| c.abs()).sum();
                if total <= 0.0 {
                    return coordinates;
                }

                for (coordinate, row) in coordinates.iter_mut().zip(self.phi.iter()) {
                    *coordinate = row.iter().zip(frame.iter()).map(|(p, c)| p * c / total).sum();
                }
                coordinates
            })
            .collect()
    }
}

/// Fifths, minor thirds and major thirds; the thirds circle has radius 0.5
fn tonnetz_basis() -> [[f32; N_CHROMA]; N_TONNETZ] {
    let intervals = [7.0 / 6.0, 7.0 / 6.0, 3.0 / 2.0, 3.0 / 2.0, 2.0 / 3.0, 2.0 / 3.0];
    let radii = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];

    let mut phi = [[0.0f32; N_CHROMA]; N_TONNETZ];
    for (dim, row) in phi.iter_mut().enumerate() {
        // Even rows are the sine coordinate
        let phase = if dim % 2 == 0 { 0.5 } else { 0.0 };
        for (class, value) in row.iter_mut().enumerate() {
            *value = radii[dim] * (PI * (intervals[dim] * class as f32 - phase)).cos();
        }
    }
    phi
}
