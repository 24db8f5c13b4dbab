// Spectral module - Frequency-domain feature extraction
//
// This module computes per-frame spectral descriptors from magnitude spectra.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Jiang, D. et al. (2002). Music type classification by spectral contrast feature

/// Spectral rolloff threshold (85% of spectral energy)
const ROLLOFF_THRESHOLD: f32 = 0.85;

/// Lower edge of the first contrast octave band (Hz)
const CONTRAST_FMIN: f32 = 200.0;

/// Number of octave bands above the base band
const CONTRAST_OCTAVES: usize = 6;

/// Number of spectral contrast bands (base band + octaves)
pub const CONTRAST_BANDS: usize = CONTRAST_OCTAVES + 1;

/// Fraction of each band averaged for the peak and valley estimates
const CONTRAST_QUANTILE: f32 = 0.02;

/// Band split points (Hz) for the low/mid/high energy characteristics
const LOW_BAND_EDGE_HZ: f32 = 1000.0;
const HIGH_BAND_EDGE_HZ: f32 = 4000.0;

/// Summed magnitude per coarse frequency band
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

/// Spectral feature computation functions
pub struct SpectralFeatures {
    sample_rate: u32,
    fft_size: usize,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - FFT window size
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        Self {
            sample_rate,
            fft_size,
        }
    }

    fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// # Returns
    /// Spectral centroid in Hz, 0.0 for a silent frame
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let freq_bin_width = self.bin_width();

        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| i as f32 * freq_bin_width * mag)
            .sum();

        let magnitude_sum: f32 = spectrum.iter().sum();

        if magnitude_sum > 1e-10 {
            weighted_sum / magnitude_sum
        } else {
            0.0
        }
    }

    /// Compute spectral bandwidth (magnitude-weighted spread around the centroid)
    pub fn compute_bandwidth(&self, spectrum: &[f32], centroid: f32) -> f32 {
        let freq_bin_width = self.bin_width();
        let magnitude_sum: f32 = spectrum.iter().sum();
        if magnitude_sum <= 1e-10 {
            return 0.0;
        }

        let spread: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| {
                let deviation = i as f32 * freq_bin_width - centroid;
                mag * deviation * deviation
            })
            .sum();

        (spread / magnitude_sum).sqrt()
    }

    /// Compute spectral rolloff (85% energy threshold frequency)
    ///
    /// # Returns
    /// Rolloff frequency in Hz, 0.0 for a silent frame
    pub fn compute_rolloff(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();

        if total_energy < 1e-10 {
            return 0.0;
        }

        let threshold = ROLLOFF_THRESHOLD * total_energy;
        let freq_bin_width = self.bin_width();

        let mut cumulative_energy = 0.0;
        for (i, &mag) in spectrum.iter().enumerate() {
            cumulative_energy += mag * mag;
            if cumulative_energy >= threshold {
                return i as f32 * freq_bin_width;
            }
        }

        (spectrum.len() - 1) as f32 * freq_bin_width
    }

    /// Compute octave-band spectral contrast in dB
    ///
    /// For each band, the peak is the mean of the strongest 2% of bins and
    /// the valley the mean of the weakest 2%; contrast is their power ratio
    /// in dB. Bands with no bins report 0.0.
    pub fn compute_contrast(&self, spectrum: &[f32]) -> [f32; CONTRAST_BANDS] {
        let mut contrast = [0.0f32; CONTRAST_BANDS];
        let nyquist = self.sample_rate as f32 / 2.0;
        let freq_bin_width = self.bin_width();

        for (band, value) in contrast.iter_mut().enumerate() {
            let low_hz = if band == 0 {
                0.0
            } else {
                CONTRAST_FMIN * 2f32.powi(band as i32 - 1)
            };
            let high_hz = if band == CONTRAST_BANDS - 1 {
                nyquist + freq_bin_width
            } else {
                CONTRAST_FMIN * 2f32.powi(band as i32)
            };

            let mut bins: Vec<f32> = spectrum
                .iter()
                .enumerate()
                .filter(|(i, _)| {
                    let f = *i as f32 * freq_bin_width;
                    f >= low_hz && f < high_hz
                })
                .map(|(_, &mag)| mag)
                .collect();

            if bins.is_empty() {
                continue;
            }

            bins.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let take = ((bins.len() as f32 * CONTRAST_QUANTILE).round() as usize).max(1);
            let valley = bins[..take].iter().sum::<f32>() / take as f32;
            let peak = bins[bins.len() - take..].iter().sum::<f32>() / take as f32;

            *value = 10.0 * ((peak + 1e-10) / (valley + 1e-10)).log10();
        }

        contrast
    }

    /// Accumulate magnitude into low (<1 kHz), mid (1-4 kHz) and high (>=4 kHz) bands
    pub fn band_energies(&self, spectrum: &[f32]) -> BandEnergies {
        let freq_bin_width = self.bin_width();
        let mut bands = BandEnergies::default();
        for (i, &mag) in spectrum.iter().enumerate() {
            let f = i as f32 * freq_bin_width;
            if f < LOW_BAND_EDGE_HZ {
                bands.low += mag;
            } else if f < HIGH_BAND_EDGE_HZ {
                bands.mid += mag;
            } else {
                bands.high += mag;
            }
        }
        bands
    }
}
