// Decode collaborator - container bytes to PCM
//
// The default decoder understands RIFF/WAVE via hound. Anything it rejects
// is reported as DetectionError::DecodeFailure so the normalizer can fall
// back to raw 16-bit PCM.

use std::io::Cursor;

use crate::error::DetectionError;

/// PCM produced by a decoder, interleaved when `channels > 1`
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Average interleaved channels into a single mono track
    pub fn into_mono(self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples;
        }

        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

/// Byte buffer → PCM decoding seam
///
/// Implementations must not panic; every failure is an explicit
/// `DecodeFailure`.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio, DetectionError>;
}

/// WAV decoder backed by hound
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio, DetectionError> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|err| {
            DetectionError::DecodeFailure {
                reason: err.to_string(),
            }
        })?;

        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<f32>, _>>(),
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1) as u32)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<Result<Vec<f32>, _>>()
            }
        }
        .map_err(|err| DetectionError::DecodeFailure {
            reason: err.to_string(),
        })?;

        Ok(DecodedAudio {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

/// Interpret a buffer as headerless little-endian signed 16-bit mono PCM
///
/// A trailing odd byte is ignored.
pub fn decode_raw_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_wav_decoder_reads_int16() {
        let bytes = write_wav(&[0, 16384, -16384, 32767], 16_000, 1);
        let decoded = WavDecoder.decode(&bytes).unwrap();

        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), 4);
        assert!((decoded.samples[1] - 0.5).abs() < 1e-6);
        assert!((decoded.samples[2] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_wav_decoder_rejects_garbage() {
        let result = WavDecoder.decode(&[1, 2, 3, 4, 5, 6, 7, 8]);
        match result {
            Err(DetectionError::DecodeFailure { .. }) => {}
            other => panic!("Expected DecodeFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_stereo_downmix() {
        let bytes = write_wav(&[16384, 0, -16384, -16384], 8_000, 2);
        let mono = WavDecoder.decode(&bytes).unwrap().into_mono();

        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.25).abs() < 1e-6);
        assert!((mono[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_raw_pcm16_ignores_trailing_byte() {
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0x7F];
        let samples = decode_raw_pcm16(&bytes);

        assert_eq!(samples, vec![0.5, -0.5]);
    }
}
