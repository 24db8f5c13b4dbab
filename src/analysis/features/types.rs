// Types module - the canonical feature record shared by extractor and classifier
//
// The column table below is the single source of truth for feature order.
// Model artifacts are validated against it at load time, and the classifier
// reads vectors through `to_columns()`, so extractor output and model input
// cannot drift apart.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of cepstral coefficients summarized per clip
pub const N_MFCC: usize = 13;

/// Scalar columns, in model order, preceding the cepstral pairs
pub const SCALAR_COLUMNS: [&str; 19] = [
    "duration",
    "rms_energy",
    "zero_crossing_rate",
    "spectral_centroid_mean",
    "spectral_centroid_std",
    "spectral_rolloff_mean",
    "spectral_rolloff_std",
    "mel_mean",
    "mel_std",
    "chroma_mean",
    "chroma_std",
    "tempo",
    "spectral_contrast_mean",
    "spectral_contrast_std",
    "tonnetz_mean",
    "tonnetz_std",
    "onset_strength_mean",
    "onset_strength_std",
    "voice_activity_ratio",
];

/// Total number of model columns
pub const FEATURE_COUNT: usize = SCALAR_COLUMNS.len() + 2 * N_MFCC;

/// Full ordered column list: scalar columns, then `mfcc_{i}_mean`, `mfcc_{i}_std`
pub fn column_names() -> Vec<String> {
    let mut names: Vec<String> = SCALAR_COLUMNS.iter().map(|s| s.to_string()).collect();
    for i in 0..N_MFCC {
        names.push(format!("mfcc_{}_mean", i));
        names.push(format!("mfcc_{}_std", i));
    }
    names
}

/// Fixed-schema numeric summary of one audio clip
///
/// Every column is always present; anything that could not be computed is
/// 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    /// Clip length in seconds after trimming
    pub duration: f32,
    /// Root-mean-square amplitude of the whole clip
    pub rms_energy: f32,
    /// Mean per-frame zero-crossing rate (0.0 to 1.0)
    pub zero_crossing_rate: f32,
    pub spectral_centroid_mean: f32,
    pub spectral_centroid_std: f32,
    pub spectral_rolloff_mean: f32,
    pub spectral_rolloff_std: f32,
    /// Mel power spectrogram statistics over all bands and frames
    pub mel_mean: f32,
    pub mel_std: f32,
    pub chroma_mean: f32,
    pub chroma_std: f32,
    /// Dominant periodicity of the onset envelope in BPM (0.0 if none)
    pub tempo: f32,
    pub spectral_contrast_mean: f32,
    pub spectral_contrast_std: f32,
    pub tonnetz_mean: f32,
    pub tonnetz_std: f32,
    pub onset_strength_mean: f32,
    pub onset_strength_std: f32,
    /// Fraction of 20 ms frames above 2% of the peak frame energy
    pub voice_activity_ratio: f32,
    pub mfcc_mean: [f32; N_MFCC],
    pub mfcc_std: [f32; N_MFCC],
}

impl FeatureVector {
    /// All-zero vector used when extraction fails
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Values in model column order
    pub fn to_columns(&self) -> [f32; FEATURE_COUNT] {
        let mut columns = [0.0f32; FEATURE_COUNT];
        let scalars = self.scalars();
        columns[..scalars.len()].copy_from_slice(&scalars);
        for i in 0..N_MFCC {
            columns[scalars.len() + 2 * i] = self.mfcc_mean[i];
            columns[scalars.len() + 2 * i + 1] = self.mfcc_std[i];
        }
        columns
    }

    /// Rebuild a vector from model-ordered values; short input is zero-padded
    pub fn from_columns(values: &[f32]) -> Self {
        let mut vector = Self::default();
        for (index, &value) in values.iter().take(FEATURE_COUNT).enumerate() {
            vector.set_column(index, value);
        }
        vector
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<f32> {
        column_index(name).map(|index| self.to_columns()[index])
    }

    /// Replace every non-finite value with 0.0
    ///
    /// Returns the number of values that were replaced.
    pub fn sanitize(&mut self) -> usize {
        let mut columns = self.to_columns();
        let mut replaced = 0;
        for value in columns.iter_mut() {
            if !value.is_finite() {
                *value = 0.0;
                replaced += 1;
            }
        }
        if replaced > 0 {
            *self = Self::from_columns(&columns);
        }
        replaced
    }

    fn scalars(&self) -> [f32; 19] {
        [
            self.duration,
            self.rms_energy,
            self.zero_crossing_rate,
            self.spectral_centroid_mean,
            self.spectral_centroid_std,
            self.spectral_rolloff_mean,
            self.spectral_rolloff_std,
            self.mel_mean,
            self.mel_std,
            self.chroma_mean,
            self.chroma_std,
            self.tempo,
            self.spectral_contrast_mean,
            self.spectral_contrast_std,
            self.tonnetz_mean,
            self.tonnetz_std,
            self.onset_strength_mean,
            self.onset_strength_std,
            self.voice_activity_ratio,
        ]
    }

    fn set_column(&mut self, index: usize, value: f32) {
        match index {
            0 => self.duration = value,
            1 => self.rms_energy = value,
            2 => self.zero_crossing_rate = value,
            3 => self.spectral_centroid_mean = value,
            4 => self.spectral_centroid_std = value,
            5 => self.spectral_rolloff_mean = value,
            6 => self.spectral_rolloff_std = value,
            7 => self.mel_mean = value,
            8 => self.mel_std = value,
            9 => self.chroma_mean = value,
            10 => self.chroma_std = value,
            11 => self.tempo = value,
            12 => self.spectral_contrast_mean = value,
            13 => self.spectral_contrast_std = value,
            14 => self.tonnetz_mean = value,
            15 => self.tonnetz_std = value,
            16 => self.onset_strength_mean = value,
            17 => self.onset_strength_std = value,
            18 => self.voice_activity_ratio = value,
            i if i < FEATURE_COUNT => {
                let offset = i - SCALAR_COLUMNS.len();
                if offset % 2 == 0 {
                    self.mfcc_mean[offset / 2] = value;
                } else {
                    self.mfcc_std[offset / 2] = value;
                }
            }
            _ => {}
        }
    }
}

fn column_index(name: &str) -> Option<usize> {
    if let Some(index) = SCALAR_COLUMNS.iter().position(|&c| c == name) {
        return Some(index);
    }

    let rest = name.strip_prefix("mfcc_")?;
    let (number, stat) = rest.split_once('_')?;
    let coefficient: usize = number.parse().ok()?;
    if coefficient >= N_MFCC {
        return None;
    }
    let base = SCALAR_COLUMNS.len() + 2 * coefficient;
    match stat {
        "mean" => Some(base),
        "std" => Some(base + 1),
        _ => None,
    }
}

/// Serialized as an ordered `name -> value` map in column order
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.to_columns();
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in column_names().iter().zip(columns.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Unknown names are ignored and missing names default to 0.0
impl<'de> Deserialize<'de> for FeatureVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeatureVisitor;

        impl<'de> Visitor<'de> for FeatureVisitor {
            type Value = FeatureVector;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of feature names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut vector = FeatureVector::default();
                while let Some((name, value)) = access.next_entry::<String, f32>()? {
                    if let Some(index) = column_index(&name) {
                        vector.set_column(index, value);
                    }
                }
                Ok(vector)
            }
        }

        deserializer.deserialize_map(FeatureVisitor)
    }
}

/// Auxiliary per-clip measurements outside the model schema
///
/// These drive the rule-based fall cues and the acoustic distress
/// predicates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioCharacteristics {
    pub max_amplitude: f32,
    pub mean_amplitude: f32,
    /// Frequency (Hz) of the strongest spectral bin
    pub dominant_frequency: f32,
    /// Summed spectral magnitude below 1 kHz
    pub low_freq_energy: f32,
    /// Summed spectral magnitude from 1 kHz to 4 kHz
    pub mid_freq_energy: f32,
    /// Summed spectral magnitude at and above 4 kHz
    pub high_freq_energy: f32,
    pub spectral_bandwidth_mean: f32,
    /// Mean fundamental frequency over voiced frames (0.0 if unvoiced)
    pub pitch_mean: f32,
    pub pitch_std: f32,
    /// Standard deviation over every cepstral coefficient of every frame
    pub cepstral_spread: f32,
}

impl AudioCharacteristics {
    pub fn sanitize(&mut self) {
        for value in [
            &mut self.max_amplitude,
            &mut self.mean_amplitude,
            &mut self.dominant_frequency,
            &mut self.low_freq_energy,
            &mut self.mid_freq_energy,
            &mut self.high_freq_energy,
            &mut self.spectral_bandwidth_mean,
            &mut self.pitch_mean,
            &mut self.pitch_std,
            &mut self.cepstral_spread,
        ] {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
    }
}
