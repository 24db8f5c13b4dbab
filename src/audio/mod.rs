// Audio module - clip intake, decoding and normalization
//
// Raw clips arrive as opaque byte buffers. The decoder turns them into PCM,
// the resampler brings them to the canonical analysis rate and the
// normalizer produces the peak-normalized, trimmed, pre-emphasized mono
// signal consumed by feature extraction.

pub mod decode;
pub mod normalize;
pub mod resample;

pub use decode::{decode_raw_pcm16, AudioDecoder, DecodedAudio, WavDecoder};
pub use normalize::{AudioNormalizer, DecodePath, NormalizedAudio};

/// Immutable audio clip as received from a monitoring device
///
/// The declared sample rate is only consulted when the bytes carry no
/// container header and have to be interpreted as raw PCM.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    declared_sample_rate: Option<u32>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            declared_sample_rate: None,
        }
    }

    pub fn with_sample_rate(bytes: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            bytes,
            declared_sample_rate: Some(sample_rate),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn declared_sample_rate(&self) -> Option<u32> {
        self.declared_sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for AudioClip {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
