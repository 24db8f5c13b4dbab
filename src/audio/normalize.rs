// AudioNormalizer - raw clip bytes to canonical analysis PCM
//
// Pipeline:
// 1. Decode via the decode collaborator, or fall back to raw LE 16-bit PCM
// 2. Downmix to mono
// 3. Resample to the canonical rate
// 4. Peak-normalize to [-1, 1]
// 5. Trim leading/trailing frames quieter than `trim_top_db` below the peak frame
// 6. Pre-emphasis y[n] = x[n] - a * x[n-1]
//
// Normalization never fails. The worst outcome is an empty sample set.

use std::sync::Arc;

use log::{debug, warn};

use super::decode::{decode_raw_pcm16, AudioDecoder, WavDecoder};
use super::resample::{is_supported_rate, resample_clip, MAX_SOURCE_RATE, MIN_SOURCE_RATE};
use super::AudioClip;
use crate::config::AudioConfig;
use crate::error::{log_detection_error, DetectionError};

/// Frame length used to measure loudness for silence trimming
const TRIM_FRAME_LENGTH: usize = 2048;

/// Hop length used to measure loudness for silence trimming
const TRIM_HOP_LENGTH: usize = 512;

/// Which decoding path produced the samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePath {
    Container,
    RawPcm,
}

/// Canonical mono PCM ready for feature extraction
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub decode_path: DecodePath,
}

impl NormalizedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Converts raw clips into canonical analysis PCM
pub struct AudioNormalizer {
    config: AudioConfig,
    decoder: Arc<dyn AudioDecoder>,
}

impl AudioNormalizer {
    /// Create a normalizer backed by the WAV decoder
    pub fn new(config: AudioConfig) -> Self {
        Self::with_decoder(config, Arc::new(WavDecoder))
    }

    /// Create a normalizer with a custom decode collaborator
    pub fn with_decoder(config: AudioConfig, decoder: Arc<dyn AudioDecoder>) -> Self {
        Self { config, decoder }
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Normalize a clip
    ///
    /// # Arguments
    /// * `clip` - Raw clip bytes plus optional declared sample rate
    ///
    /// # Returns
    /// Mono PCM at the canonical rate. Decoding failures fall back to raw
    /// 16-bit PCM at the declared rate (canonical rate if undeclared).
    pub fn normalize(&self, clip: &AudioClip) -> NormalizedAudio {
        let canonical_rate = self.config.sample_rate;

        let (mono, source_rate, decode_path) = match self.decoder.decode(clip.bytes()) {
            Ok(decoded) => {
                let rate = decoded.sample_rate;
                (decoded.into_mono(), rate, DecodePath::Container)
            }
            Err(err) => {
                log_detection_error(&err, "normalize_decode");
                let rate = clip.declared_sample_rate().unwrap_or(canonical_rate);
                (decode_raw_pcm16(clip.bytes()), rate, DecodePath::RawPcm)
            }
        };

        let source_rate = if is_supported_rate(source_rate) {
            source_rate
        } else {
            let err = DetectionError::DecodeFailure {
                reason: format!(
                    "sample rate {} Hz outside {}..={} Hz, treating as {} Hz",
                    source_rate, MIN_SOURCE_RATE, MAX_SOURCE_RATE, canonical_rate
                ),
            };
            warn!("[Normalizer] {}", err);
            canonical_rate
        };

        let resampled = resample_clip(&mono, source_rate, canonical_rate);
        let normalized = peak_normalize(resampled);
        let trimmed = trim_silence(&normalized, self.config.trim_top_db);
        let samples = pre_emphasis(&trimmed, self.config.pre_emphasis);

        debug!(
            "[Normalizer] {:?} decode, {} Hz -> {} Hz, {} samples after trim",
            decode_path,
            source_rate,
            canonical_rate,
            samples.len()
        );

        NormalizedAudio {
            samples,
            sample_rate: canonical_rate,
            decode_path,
        }
    }
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}

/// Scale so the largest absolute sample is 1.0; non-finite samples become 0.0
pub fn peak_normalize(mut samples: Vec<f32>) -> Vec<f32> {
    for sample in samples.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
        }
    }

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
    }
    samples
}

/// Trim leading and trailing silence
///
/// Loudness is the RMS of `TRIM_FRAME_LENGTH` frames. Frames more than
/// `top_db` below the loudest frame are silent. Returns an empty vector when
/// every frame is silent (including all-zero input).
pub fn trim_silence(samples: &[f32], top_db: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let frame_rms: Vec<f32> = frame_starts(samples.len())
        .map(|start| {
            let end = (start + TRIM_FRAME_LENGTH).min(samples.len());
            let frame = &samples[start..end];
            (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
        })
        .collect();

    let max_rms = frame_rms.iter().copied().fold(0.0f32, f32::max);
    if max_rms <= 0.0 {
        return Vec::new();
    }

    let floor = max_rms * 10f32.powf(-top_db / 20.0);
    let loud: Vec<usize> = frame_rms
        .iter()
        .enumerate()
        .filter(|(_, &rms)| rms > floor)
        .map(|(i, _)| i)
        .collect();

    match (loud.first(), loud.last()) {
        (Some(&first), Some(&last)) => {
            let start = first * TRIM_HOP_LENGTH;
            let end = (last * TRIM_HOP_LENGTH + TRIM_FRAME_LENGTH).min(samples.len());
            samples[start..end].to_vec()
        }
        _ => Vec::new(),
    }
}

fn frame_starts(len: usize) -> impl Iterator<Item = usize> {
    let count = if len <= TRIM_FRAME_LENGTH {
        1
    } else {
        1 + (len - TRIM_FRAME_LENGTH + TRIM_HOP_LENGTH - 1) / TRIM_HOP_LENGTH
    };
    (0..count).map(|i| i * TRIM_HOP_LENGTH)
}

/// First-order pre-emphasis filter, clamped to [-1, 1]
pub fn pre_emphasis(samples: &[f32], coefficient: f32) -> Vec<f32> {
    let mut previous = 0.0f32;
    samples
        .iter()
        .map(|&sample| {
            let emphasized = sample - coefficient * previous;
            previous = sample;
            emphasized.clamp(-1.0, 1.0)
        })
        .collect()
}
