// FeatureExtractor - clip-level acoustic feature extraction
//
// This module turns a normalized mono clip into the fixed-schema
// FeatureVector consumed by the fall classifier, plus the auxiliary
// AudioCharacteristics used by the rule-based cues and distress predicates.
//
// Module organization:
// - types: FeatureVector column table and AudioCharacteristics
// - fft: STFT framing with a Hann window
// - spectral: centroid, bandwidth, rolloff, contrast, band energies
// - temporal: RMS, zero-crossing rate, voice-activity ratio
// - mel: mel filterbank, decibel mel spectrum, MFCCs
// - tonal: chroma and tonnetz
// - rhythm: onset envelope and tempo
// - pitch: autocorrelation pitch tracking
// - stats: mean/std summaries of per-frame tracks
// - mod.rs: Coordinator (FeatureExtractor)
//
// Every per-frame track is summarized by its population mean and standard
// deviation over frames (frame 2048, hop 512). Statistics that cannot be
// computed are 0.0.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Davis, S. & Mermelstein, P. (1980). Comparison of parametric
//   representations for monosyllabic word recognition
// - Harte, C. et al. (2006). Detecting harmonic change in musical audio

mod fft;
mod mel;
mod pitch;
mod rhythm;
mod spectral;
mod stats;
mod temporal;
mod tonal;
mod types;

pub use types::{
    column_names, AudioCharacteristics, FeatureVector, FEATURE_COUNT, N_MFCC, SCALAR_COLUMNS,
};

use log::debug;

use crate::error::{log_detection_error, DetectionError};
use fft::{StftProcessor, FRAME_LENGTH, HOP_LENGTH};
use mel::MelFilterbank;
use pitch::PitchTracker;
use spectral::SpectralFeatures;
use stats::mean_std;
use temporal::TemporalFeatures;
use tonal::TonalFeatures;

/// Output of one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipFeatures {
    pub vector: FeatureVector,
    pub characteristics: AudioCharacteristics,
}

/// FeatureExtractor coordinates the DSP feature extraction pipeline
///
/// All filterbanks and FFT plans are built once; extraction takes `&self`
/// and the extractor can be shared across worker threads.
pub struct FeatureExtractor {
    sample_rate: u32,
    stft: StftProcessor,
    spectral_features: SpectralFeatures,
    temporal_features: TemporalFeatures,
    mel_filterbank: MelFilterbank,
    tonal_features: TonalFeatures,
    pitch_tracker: PitchTracker,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor with the specified sample rate
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz (canonically 16000)
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stft: StftProcessor::new(FRAME_LENGTH, HOP_LENGTH),
            spectral_features: SpectralFeatures::new(sample_rate, FRAME_LENGTH),
            temporal_features: TemporalFeatures::new(sample_rate),
            mel_filterbank: MelFilterbank::new(sample_rate, FRAME_LENGTH),
            tonal_features: TonalFeatures::new(sample_rate, FRAME_LENGTH),
            pitch_tracker: PitchTracker::new(sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Extract the model feature vector only
    pub fn extract(&self, audio: &[f32]) -> FeatureVector {
        self.analyze(audio).vector
    }

    /// Extract features and characteristics, never failing
    ///
    /// Extraction errors are logged and yield an all-zero result.
    pub fn analyze(&self, audio: &[f32]) -> ClipFeatures {
        match self.try_analyze(audio) {
            Ok(features) => features,
            Err(err) => {
                log_detection_error(&err, "FeatureExtractor::analyze");
                ClipFeatures::default()
            }
        }
    }

    /// Extract features and characteristics
    ///
    /// # Returns
    /// * `Ok(ClipFeatures)` - all values finite
    /// * `Err(DetectionError::FeatureExtractionFailure)` - input contains
    ///   non-finite samples
    pub fn try_analyze(&self, audio: &[f32]) -> Result<ClipFeatures, DetectionError> {
        if let Some(position) = audio.iter().position(|s| !s.is_finite()) {
            return Err(DetectionError::FeatureExtractionFailure {
                reason: format!("non-finite sample at index {}", position),
            });
        }

        let duration = audio.len() as f32 / self.sample_rate.max(1) as f32;
        let max_amplitude = audio.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));

        // Empty or digitally silent clips carry no statistics
        if max_amplitude == 0.0 {
            let mut features = ClipFeatures::default();
            features.vector.duration = duration;
            return Ok(features);
        }

        let mut vector = FeatureVector {
            duration,
            rms_energy: self.temporal_features.compute_rms(audio),
            voice_activity_ratio: self.temporal_features.compute_voice_activity_ratio(audio),
            ..FeatureVector::default()
        };
        let mut characteristics = AudioCharacteristics {
            max_amplitude,
            mean_amplitude: audio.iter().map(|s| s.abs()).sum::<f32>() / audio.len() as f32,
            ..AudioCharacteristics::default()
        };

        // Zero-crossing rate on the same framing as the spectra
        let zcr_frames = (0..self.stft.frame_count(audio.len())).map(|frame| {
            let start = frame * HOP_LENGTH;
            let end = (start + FRAME_LENGTH).min(audio.len());
            self.temporal_features.compute_zcr(&audio[start..end])
        });
        vector.zero_crossing_rate = mean_std(zcr_frames).0;

        let spectrogram = self.stft.spectrogram(audio, self.sample_rate);

        // Spectral shape tracks
        let centroids: Vec<f32> = spectrogram
            .frames
            .iter()
            .map(|frame| self.spectral_features.compute_centroid(frame))
            .collect();
        (vector.spectral_centroid_mean, vector.spectral_centroid_std) =
            mean_std(centroids.iter().copied());
        (vector.spectral_rolloff_mean, vector.spectral_rolloff_std) = mean_std(
            spectrogram
                .frames
                .iter()
                .map(|frame| self.spectral_features.compute_rolloff(frame)),
        );
        (vector.spectral_contrast_mean, vector.spectral_contrast_std) = mean_std(
            spectrogram
                .frames
                .iter()
                .flat_map(|frame| self.spectral_features.compute_contrast(frame)),
        );
        characteristics.spectral_bandwidth_mean = mean_std(
            spectrogram
                .frames
                .iter()
                .zip(centroids.iter())
                .map(|(frame, &centroid)| self.spectral_features.compute_bandwidth(frame, centroid)),
        )
        .0;

        // Long-term spectrum for band energies and dominant frequency
        let mut summed = vec![0.0f32; spectrogram.n_bins()];
        for frame in &spectrogram.frames {
            for (total, &mag) in summed.iter_mut().zip(frame.iter()) {
                *total += mag;
            }
        }
        let bands = self.spectral_features.band_energies(&summed);
        characteristics.low_freq_energy = bands.low;
        characteristics.mid_freq_energy = bands.mid;
        characteristics.high_freq_energy = bands.high;
        characteristics.dominant_frequency = summed
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0.0, |(bin, _)| spectrogram.bin_frequency(bin));

        // Mel and cepstral tracks
        let mel = self.mel_filterbank.mel_spectrogram(&spectrogram);
        (vector.mel_mean, vector.mel_std) = mean_std(mel.power.iter().flatten().copied());

        let mfcc = self.mel_filterbank.mfcc(&mel);
        for coefficient in 0..N_MFCC {
            (vector.mfcc_mean[coefficient], vector.mfcc_std[coefficient]) =
                mean_std(mfcc.iter().map(|frame| frame[coefficient]));
        }
        characteristics.cepstral_spread = mean_std(mfcc.iter().flatten().copied()).1;

        // Tonal tracks
        let chroma = self.tonal_features.chroma(&spectrogram);
        (vector.chroma_mean, vector.chroma_std) = mean_std(chroma.iter().flatten().copied());
        let tonnetz = self.tonal_features.tonnetz(&chroma);
        (vector.tonnetz_mean, vector.tonnetz_std) = mean_std(tonnetz.iter().flatten().copied());

        // Rhythm
        let envelope = rhythm::onset_strength(&mel);
        (vector.onset_strength_mean, vector.onset_strength_std) =
            mean_std(envelope.iter().copied());
        vector.tempo =
            rhythm::estimate_tempo(&envelope, self.sample_rate as f32 / HOP_LENGTH as f32);

        // Pitch
        let pitch = self.pitch_tracker.summarize(audio);
        characteristics.pitch_mean = pitch.mean;
        characteristics.pitch_std = pitch.std;

        let replaced = vector.sanitize();
        if replaced > 0 {
            debug!("[FeatureExtractor] Replaced {} non-finite statistics", replaced);
        }
        characteristics.sanitize();

        Ok(ClipFeatures {
            vector,
            characteristics,
        })
    }
}
