// Mel module - mel filterbank, log-mel spectra and cepstral coefficients
//
// Filters are triangular on the HTK mel scale with area normalization, so a
// flat power spectrum produces roughly equal energy in every band. Cepstral
// coefficients are the orthonormal DCT-II of the decibel mel spectrum.

use std::f32::consts::PI;

use super::fft::Spectrogram;
use super::types::N_MFCC;

/// Number of mel bands
pub const N_MELS: usize = 128;

/// Floor applied before converting power to decibels
const AMIN: f32 = 1e-10;

/// Dynamic range kept below the loudest mel value (dB)
const TOP_DB: f32 = 80.0;

/// Convert frequency to mel scale
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel scale to frequency
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Mel power spectrogram plus its decibel form
#[derive(Debug, Clone, Default)]
pub struct MelSpectrogram {
    /// frames × N_MELS power values
    pub power: Vec<Vec<f32>>,
    /// frames × N_MELS decibel values, clipped to `TOP_DB` below the peak
    pub db: Vec<Vec<f32>>,
}

impl MelSpectrogram {
    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// Pre-computed mel filterbank and DCT basis
pub struct MelFilterbank {
    /// N_MELS filters, each with one weight per FFT bin
    filters: Vec<Vec<f32>>,
    /// N_MFCC rows of the orthonormal DCT-II over N_MELS inputs
    dct: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Create a filterbank spanning 0 Hz to Nyquist
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `n_fft` - FFT length the spectra were computed with
    pub fn new(sample_rate: u32, n_fft: usize) -> Self {
        Self {
            filters: create_mel_filterbank(N_MELS, n_fft, sample_rate as f32),
            dct: create_dct_basis(N_MFCC, N_MELS),
        }
    }

    /// Project a magnitude spectrogram onto the mel bands
    pub fn mel_spectrogram(&self, spectrogram: &Spectrogram) -> MelSpectrogram {
        let power: Vec<Vec<f32>> = spectrogram
            .frames
            .iter()
            .map(|frame| {
                self.filters
                    .iter()
                    .map(|filter| {
                        filter
                            .iter()
                            .zip(frame.iter())
                            .map(|(w, mag)| w * mag * mag)
                            .sum()
                    })
                    .collect()
            })
            .collect();

        let db = power_to_db(&power);
        MelSpectrogram { power, db }
    }

    /// Cepstral coefficients per frame (frames × N_MFCC)
    pub fn mfcc(&self, mel: &MelSpectrogram) -> Vec<[f32; N_MFCC]> {
        mel.db
            .iter()
            .map(|frame| {
                let mut coefficients = [0.0f32; N_MFCC];
                for (coefficient, basis) in coefficients.iter_mut().zip(self.dct.iter()) {
                    *coefficient = basis.iter().zip(frame.iter()).map(|(b, x)| b * x).sum();
                }
                coefficients
            })
            .collect()
    }
}

/// Convert power to decibels relative to 1.0, keeping `TOP_DB` of range
fn power_to_db(power: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let mut db: Vec<Vec<f32>> = power
        .iter()
        .map(|frame| frame.iter().map(|&p| 10.0 * p.max(AMIN).log10()).collect())
        .collect();

    let peak = db
        .iter()
        .flat_map(|frame| frame.iter())
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    if peak.is_finite() {
        let floor = peak - TOP_DB;
        for value in db.iter_mut().flat_map(|frame| frame.iter_mut()) {
            *value = value.max(floor);
        }
    }

    db
}

/// Create a mel filterbank matrix
///
/// # Arguments
/// * `n_mels` - Number of mel bands
/// * `n_fft` - FFT length (filters cover `n_fft / 2 + 1` bins)
/// * `sample_rate` - Audio sample rate in Hz
///
/// # Returns
/// Vec of mel filters, each filter is a Vec of weights for FFT bins
fn create_mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: f32) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let mel_max = hz_to_mel(sample_rate / 2.0);

    let hz_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|i| {
            let (left, center, right) = (hz_points[i], hz_points[i + 1], hz_points[i + 2]);
            // Area normalization
            let norm = 2.0 / (right - left);

            (0..n_bins)
                .map(|bin| {
                    let f = bin as f32 * sample_rate / n_fft as f32;
                    let rising = (f - left) / (center - left);
                    let falling = (right - f) / (right - center);
                    rising.min(falling).max(0.0) * norm
                })
                .collect()
        })
        .collect()
}

/// Orthonormal DCT-II basis rows
fn create_dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n_in as f32).sqrt()
            } else {
                (2.0 / n_in as f32).sqrt()
            };
            (0..n_in)
                .map(|n| scale * (PI * k as f32 * (2 * n + 1) as f32 / (2 * n_in) as f32).cos())
                .collect()
        })
        .collect()
}
