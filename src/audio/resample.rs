//! Sample rate conversion using rubato
//!
//! Decoded assets are converted to the output device rate once, at decode
//! time, so the render callback can copy frames without interpolation.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use super::buffer::DecodedBuffer;

const CHUNK_FRAMES: usize = 1024;

/// Convert `buffer` to `output_rate`, returning it unchanged if it already matches.
/// The filter delay is trimmed and the tail flushed, so the length scales exactly.
pub fn to_rate(buffer: DecodedBuffer, output_rate: u32) -> Result<DecodedBuffer, String> {
    let input_rate = buffer.sample_rate();
    if input_rate == output_rate || buffer.frames() == 0 {
        return Ok(buffer);
    }

    let channels = buffer.channels();
    debug!(
        "Resampling from {}Hz to {}Hz ({} channels)",
        input_rate, output_rate, channels
    );

    let planar_input = deinterleave(buffer.samples(), channels);
    let input_frames = planar_input[0].len();
    let ratio = output_rate as f64 / input_rate as f64;
    let expected = (input_frames as f64 * ratio).round() as usize;

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Septic,
        CHUNK_FRAMES,
        channels,
    )
    .map_err(|e| format!("Failed to create resampler: {}", e))?;
    let delay = resampler.output_delay();

    let mut planar_output = vec![Vec::with_capacity(expected + delay); channels];
    let mut position = 0;

    while position + CHUNK_FRAMES <= input_frames {
        let chunk = slice_channels(&planar_input, position, position + CHUNK_FRAMES);
        let out = resampler
            .process(&chunk, None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        append(&mut planar_output, out);
        position += CHUNK_FRAMES;
    }

    if position < input_frames {
        let chunk = slice_channels(&planar_input, position, input_frames);
        let out = resampler
            .process_partial(Some(chunk.as_slice()), None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        append(&mut planar_output, out);
    }

    // Push silence through until the delayed tail is out
    while planar_output[0].len() < delay + expected {
        let out = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        if out[0].is_empty() {
            break;
        }
        append(&mut planar_output, out);
    }

    for channel in planar_output.iter_mut() {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }

    Ok(DecodedBuffer::new(interleave(planar_output), output_rate, channels))
}

fn slice_channels(planar: &[Vec<f32>], start: usize, end: usize) -> Vec<&[f32]> {
    planar.iter().map(|channel| &channel[start..end]).collect()
}

fn append(planar: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (channel, samples) in planar.iter_mut().zip(chunk) {
        channel.extend(samples);
    }
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let num_frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(num_frames); channels];

    for frame in samples.chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }

    planar
}

fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
    if planar.is_empty() {
        return Vec::new();
    }

    let num_channels = planar.len();
    let num_frames = planar[0].len();
    let mut interleaved = Vec::with_capacity(num_frames * num_channels);

    for frame in 0..num_frames {
        for channel in &planar {
            interleaved.push(channel[frame]);
        }
    }

    interleaved
}
