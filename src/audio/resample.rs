// Whole-clip sample-rate conversion to the canonical analysis rate

use log::{debug, warn};
use rubato::{FftFixedIn, Resampler};

/// Input chunk size fed to the FFT resampler
const RESAMPLER_CHUNK: usize = 1024;

/// Lowest source rate accepted for resampling (Hz)
pub const MIN_SOURCE_RATE: u32 = 4_000;

/// Highest source rate accepted for resampling (Hz)
///
/// The FFT resampler's size grows with `rate / gcd(rate, target)`, so the
/// source rate bounds the per-clip cost.
pub const MAX_SOURCE_RATE: u32 = 192_000;

/// Whether a declared or decoded rate can be resampled
pub fn is_supported_rate(rate: u32) -> bool {
    (MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&rate)
}

/// Resample a complete mono clip from `from_rate` to `to_rate`
///
/// The resampler's output delay is compensated so the returned clip is
/// time-aligned with the input and has `ceil(len * to / from)` samples.
/// On resampler construction or processing failure the input is returned
/// unchanged; the caller keeps working at the wrong rate rather than
/// dropping the clip.
pub fn resample_clip(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    if !is_supported_rate(from_rate) || !is_supported_rate(to_rate) {
        warn!(
            "[Resampler] {} Hz -> {} Hz outside {}..={} Hz. Keeping original rate.",
            from_rate, to_rate, MIN_SOURCE_RATE, MAX_SOURCE_RATE
        );
        return samples.to_vec();
    }

    match try_resample(samples, from_rate, to_rate) {
        Ok(resampled) => resampled,
        Err(err) => {
            warn!(
                "[Resampler] {} Hz -> {} Hz failed: {}. Keeping original rate.",
                from_rate, to_rate, err
            );
            samples.to_vec()
        }
    }
}

fn try_resample(
    samples: &[f32],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>, String> {
    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLER_CHUNK,
        2,
        1,
    )
    .map_err(|err| err.to_string())?;

    let expected_len =
        ((samples.len() as u64 * to_rate as u64 + from_rate as u64 - 1) / from_rate as u64) as usize;
    let delay = resampler.output_delay();

    debug!(
        "[Resampler] {} Hz -> {} Hz, {} samples in, {} expected out, delay {}",
        from_rate,
        to_rate,
        samples.len(),
        expected_len,
        delay
    );

    let mut input = vec![vec![0.0f32; RESAMPLER_CHUNK]; 1];
    let mut output_buffer = resampler.output_buffer_allocate(true);
    let mut collected: Vec<f32> = Vec::with_capacity(expected_len + delay);
    let mut offset = 0;

    while collected.len() < expected_len + delay {
        input[0].fill(0.0);
        if offset < samples.len() {
            let end = (offset + RESAMPLER_CHUNK).min(samples.len());
            input[0][..end - offset].copy_from_slice(&samples[offset..end]);
        }
        offset += RESAMPLER_CHUNK;

        let (_, frames_out) = resampler
            .process_into_buffer(&input, &mut output_buffer, None)
            .map_err(|err| err.to_string())?;
        collected.extend_from_slice(&output_buffer[0][..frames_out]);
    }

    Ok(collected
        .into_iter()
        .skip(delay)
        .take(expected_len)
        .collect())
}
