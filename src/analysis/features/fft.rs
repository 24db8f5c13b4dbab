// FFT module - short-time Fourier transform
//
// This module frames a clip with a Hann window and computes the magnitude
// spectrum of every frame. All spectral, mel, tonal and rhythm features are
// derived from the resulting spectrogram.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Analysis frame length in samples
pub const FRAME_LENGTH: usize = 2048;

/// Hop between successive frames in samples
pub const HOP_LENGTH: usize = 512;

/// Magnitude spectrogram (frames × bins)
#[derive(Debug, Clone, Default)]
pub struct Spectrogram {
    /// One magnitude spectrum per frame, `n_fft / 2 + 1` bins each
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub n_fft: usize,
}

impl Spectrogram {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Centre frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.n_fft as f32
    }

    /// Per-bin frequencies, shared by every frame
    pub fn frequencies(&self) -> Vec<f32> {
        (0..self.n_bins()).map(|bin| self.bin_frequency(bin)).collect()
    }
}

/// Planned FFT plus pre-computed window
///
/// The plan is immutable after construction, so a processor can be shared
/// across threads without locking.
pub struct StftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    hop_length: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `fft_size` - Frame and FFT length
    /// * `hop_length` - Samples between frame starts
    pub fn new(fft_size: usize, hop_length: usize) -> Self {
        // Pre-compute Hann window to reduce spectral leakage
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
            })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            hop_length: hop_length.max(1),
            window,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Number of frames produced for a clip of `len` samples
    ///
    /// A non-empty clip shorter than one frame yields a single zero-padded
    /// frame; a trailing partial frame is dropped otherwise.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.fft_size {
            1
        } else {
            1 + (len - self.fft_size) / self.hop_length
        }
    }

    /// Compute the magnitude spectrogram of a clip
    pub fn spectrogram(&self, audio: &[f32], sample_rate: u32) -> Spectrogram {
        let frames = (0..self.frame_count(audio.len()))
            .map(|frame| {
                let start = frame * self.hop_length;
                let end = (start + self.fft_size).min(audio.len());
                self.compute_magnitude_spectrum(&audio[start..end])
            })
            .collect();

        Spectrogram {
            frames,
            sample_rate,
            n_fft: self.fft_size,
        }
    }

    /// Compute magnitude spectrum using FFT
    ///
    /// Applies Hann windowing, performs FFT, and returns magnitude spectrum
    /// for positive frequencies only (exploiting symmetry of real-valued FFT).
    ///
    /// # Arguments
    /// * `audio` - Audio window (length <= fft_size, zero-padded)
    ///
    /// # Returns
    /// Magnitude spectrum (size = fft_size / 2 + 1)
    pub fn compute_magnitude_spectrum(&self, audio: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = audio
            .iter()
            .take(self.fft_size)
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let stft = StftProcessor::new(FRAME_LENGTH, HOP_LENGTH);
        assert_eq!(stft.frame_count(0), 0);
        assert_eq!(stft.frame_count(100), 1);
        assert_eq!(stft.frame_count(FRAME_LENGTH), 1);
        assert_eq!(stft.frame_count(FRAME_LENGTH + HOP_LENGTH), 2);
        assert_eq!(stft.frame_count(16_000), 1 + (16_000 - 2048) / 512);
    }

    #[test]
    fn test_sine_peak_bin() {
        let stft = StftProcessor::new(FRAME_LENGTH, HOP_LENGTH);
        let sample_rate = 16_000;
        let signal: Vec<f32> = (0..FRAME_LENGTH)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32).sin())
            .collect();

        let spec = stft.spectrogram(&signal, sample_rate);
        let frame = &spec.frames[0];
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert!((spec.bin_frequency(peak_bin) - 1000.0).abs() < 10.0);
    }
}
