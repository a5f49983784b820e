//! Band-limited resampling by an arbitrary ratio using rubato.

use crate::error::Result;
use ddspice_core::ResampleQuality;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

fn chunk_size(quality: ResampleQuality) -> usize {
    match quality {
        ResampleQuality::Fast => 512,
        ResampleQuality::Medium => 1024,
        ResampleQuality::High => 2048,
        ResampleQuality::Best => 4096,
    }
}

fn sinc_parameters(quality: ResampleQuality) -> SincInterpolationParameters {
    let (sinc_len, f_cutoff, oversampling_factor, interpolation, window) = match quality {
        ResampleQuality::Fast => (
            64,
            0.85,
            128,
            SincInterpolationType::Linear,
            WindowFunction::Blackman,
        ),
        ResampleQuality::Medium => (
            128,
            0.9,
            256,
            SincInterpolationType::Linear,
            WindowFunction::Blackman2,
        ),
        ResampleQuality::High => (
            256,
            0.95,
            256,
            SincInterpolationType::Cubic,
            WindowFunction::BlackmanHarris2,
        ),
        ResampleQuality::Best => (
            512,
            0.97,
            512,
            SincInterpolationType::Cubic,
            WindowFunction::BlackmanHarris2,
        ),
    };
    SincInterpolationParameters {
        sinc_len,
        f_cutoff,
        interpolation,
        oversampling_factor,
        window,
    }
}

/// Resample mono `input` so that the output holds `ceil(len * ratio)` samples,
/// `ratio` being output rate over input rate. The filter delay is removed.
pub fn resample(input: &[f32], ratio: f64, quality: ResampleQuality) -> Result<Vec<f32>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if (ratio - 1.0).abs() < f64::EPSILON {
        return Ok(input.to_vec());
    }

    let chunk = chunk_size(quality);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, sinc_parameters(quality), chunk, 1)?;

    let delay = resampler.output_delay();
    let expected = (input.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(expected + delay + chunk);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let frames: &[&[f32]] = &[&input[pos..pos + needed]];
        let processed = resampler.process(frames, None)?;
        output.extend_from_slice(&processed[0]);
        pos += needed;
    }
    if pos < input.len() {
        let tail: &[&[f32]] = &[&input[pos..]];
        let processed = resampler.process_partial(Some(tail), None)?;
        output.extend_from_slice(&processed[0]);
    }

    // Flush the filter tail with silence until the delayed output is complete.
    while output.len() < expected + delay {
        let processed = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if processed[0].is_empty() {
            break;
        }
        output.extend_from_slice(&processed[0]);
    }

    let mut output = output.split_off(delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}
