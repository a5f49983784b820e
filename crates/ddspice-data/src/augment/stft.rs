//! Phase vocoder time stretching
//!
//! Centered STFT with a periodic Hann window, per-bin phase advance between
//! interpolated frames, then overlap-add resynthesis normalized by the squared
//! window sum. Stretching by `rate` maps a signal of length `n` to
//! `round(n / rate)` samples at unchanged pitch.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const DEFAULT_N_FFT: usize = 2048;
pub const DEFAULT_HOP: usize = DEFAULT_N_FFT / 4;

type Frame = Vec<Complex<f32>>;

/// Phase vocoder with fixed analysis parameters.
pub struct PhaseVocoder {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl PhaseVocoder {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Stretch `signal` in time by `1 / rate` without changing pitch.
    pub fn time_stretch(&self, signal: &[f32], rate: f32) -> Vec<f32> {
        let target_len = (signal.len() as f32 / rate).round() as usize;
        if signal.is_empty() || target_len == 0 {
            return Vec::new();
        }

        let spectrum = self.stft(signal);
        let stretched = self.advance_phases(&spectrum, rate);
        self.istft(&stretched, target_len)
    }

    fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    fn stft(&self, signal: &[f32]) -> Vec<Frame> {
        let padded = center_pad(signal, self.n_fft / 2);
        let num_frames = 1 + (padded.len() - self.n_fft) / self.hop;
        let bins = self.num_bins();

        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];
        for t in 0..num_frames {
            let start = t * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            frames.push(buffer[..bins].to_vec());
        }
        frames
    }

    /// Resample the frame sequence at `rate`, interpolating magnitudes and
    /// accumulating phase so partials stay coherent across frames.
    fn advance_phases(&self, frames: &[Frame], rate: f32) -> Vec<Frame> {
        let bins = self.num_bins();
        let expected: Vec<f32> = (0..bins)
            .map(|k| 2.0 * PI * k as f32 * self.hop as f32 / self.n_fft as f32)
            .collect();
        let zero = vec![Complex::new(0.0, 0.0); bins];
        let column = |i: usize| frames.get(i).unwrap_or(&zero);

        let mut phase: Vec<f32> = frames[0].iter().map(|c| c.arg()).collect();
        let num_out = (frames.len() as f32 / rate).ceil() as usize;

        let mut out = Vec::with_capacity(num_out);
        for t in 0..num_out {
            let step = t as f32 * rate;
            let index = step.floor() as usize;
            if index >= frames.len() {
                break;
            }
            let alpha = step - index as f32;
            let (left, right) = (column(index), column(index + 1));

            let mut frame = Vec::with_capacity(bins);
            for k in 0..bins {
                let magnitude = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                frame.push(Complex::from_polar(magnitude, phase[k]));

                let delta = right[k].arg() - left[k].arg() - expected[k];
                let wrapped = delta - 2.0 * PI * (delta / (2.0 * PI)).round();
                phase[k] += expected[k] + wrapped;
            }
            out.push(frame);
        }
        out
    }

    fn istft(&self, frames: &[Frame], length: usize) -> Vec<f32> {
        let n_fft = self.n_fft;
        let bins = self.num_bins();
        let full_len = n_fft + self.hop * frames.len().saturating_sub(1);

        let mut output = vec![0.0f32; full_len];
        let mut window_sum = vec![0.0f32; full_len];
        let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
        let scale = 1.0 / n_fft as f32;

        for (t, frame) in frames.iter().enumerate() {
            // Hermitian extension of the one-sided spectrum.
            buffer[..bins].copy_from_slice(frame);
            for k in bins..n_fft {
                buffer[k] = frame[n_fft - k].conj();
            }
            self.inverse.process(&mut buffer);

            let start = t * self.hop;
            for i in 0..n_fft {
                output[start + i] += buffer[i].re * scale * self.window[i];
                window_sum[start + i] += self.window[i] * self.window[i];
            }
        }

        for (sample, norm) in output.iter_mut().zip(&window_sum) {
            if *norm > f32::MIN_POSITIVE {
                *sample /= norm;
            }
        }

        let offset = n_fft / 2;
        let mut trimmed: Vec<f32> = output.into_iter().skip(offset).take(length).collect();
        trimmed.resize(length, 0.0);
        trimmed
    }
}

impl Default for PhaseVocoder {
    fn default() -> Self {
        Self::new(DEFAULT_N_FFT, DEFAULT_HOP)
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Reflect-pad both ends by `pad`; signals too short to reflect are zero-padded.
fn center_pad(signal: &[f32], pad: usize) -> Vec<f32> {
    let n = signal.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);
    if n > pad {
        padded.extend((1..=pad).rev().map(|i| signal[i]));
        padded.extend_from_slice(signal);
        padded.extend((0..pad).map(|i| signal[n - 2 - i]));
    } else {
        padded.resize(pad, 0.0);
        padded.extend_from_slice(signal);
        padded.resize(n + 2 * pad, 0.0);
    }
    padded
}
