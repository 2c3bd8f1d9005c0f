//! NSDF-style autocorrelation pitch estimator (C5).
//!
//! Runs entirely on the worker thread: forward real FFT, power spectrum,
//! inverse real FFT gives an unnormalized autocorrelation, which is then
//! bias-corrected into a normalized square-difference-like curve, searched
//! for the first "tall enough" local maximum, and refined with a parabolic
//! fit around that bin.

use realfft::{num_complex::Complex32, ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

use crate::error::TrackerError;

const MAX_MAXIMA: usize = 10;
const SUB_MAXIMUM_THRESHOLD: f32 = 0.99;
const FREQUENCY_CLAMP_HZ: f32 = 999.0;

/// Owns the FFT plans and scratch buffers for one `analysis_window` size.
/// Rebuilt only when that size changes; every other call is allocation-free.
///
/// Holds no "last published frequency" state of its own: that belongs to
/// whoever compares successive results (the worker closure in
/// `dsp::tracker`), since it also has to fold in the gate-closed
/// zero-publish case. A second copy here would drift out of sync with
/// that comparison, as happened before this was consolidated.
pub struct PitchEstimator {
    analysis_window: usize,
    fft_size: usize,
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    time_buf: Vec<f32>,
    freq_buf: Vec<Complex32>,
    autocorr: Vec<f32>,
}

impl PitchEstimator {
    /// Build the estimator's FFT plans for a given analysis window length.
    /// `fft_size = analysis_window + ceil(analysis_window / 2)`, matching
    /// the original implementation's zero-padded transform length.
    pub fn new(analysis_window: usize) -> Result<Self, TrackerError> {
        let fft_size = analysis_window + (analysis_window + 1) / 2;
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);
        let c2r = planner.plan_fft_inverse(fft_size);

        let time_buf = r2c.make_input_vec();
        let freq_buf = r2c.make_output_vec();
        if time_buf.len() != fft_size || freq_buf.len() != fft_size / 2 + 1 {
            return Err(TrackerError::InitError {
                reason: format!("unexpected FFT scratch sizes for fft_size={fft_size}"),
            });
        }

        Ok(Self {
            analysis_window,
            fft_size,
            r2c,
            c2r,
            time_buf,
            freq_buf,
            autocorr: vec![0.0; fft_size],
        })
    }

    pub fn analysis_window(&self) -> usize {
        self.analysis_window
    }

    /// Run one full estimation pass over `input` (length `analysis_window`)
    /// and return the refined fundamental frequency in Hz, or `0.0` if no
    /// usable maximum was found or the refined frequency exceeded the
    /// precision cap.
    pub fn estimate(&mut self, input: &[f32], internal_rate: f32) -> f32 {
        debug_assert_eq!(input.len(), self.analysis_window);

        self.time_buf[..input.len()].copy_from_slice(input);
        self.time_buf[input.len()..].fill(0.0);

        self.r2c
            .process(&mut self.time_buf, &mut self.freq_buf)
            .expect("real FFT on a correctly sized buffer cannot fail");

        for bin in self.freq_buf.iter_mut() {
            *bin = Complex32::new(bin.re * bin.re + bin.im * bin.im, 0.0);
        }

        self.c2r
            .process(&mut self.freq_buf, &mut self.autocorr)
            .expect("inverse real FFT on a correctly sized buffer cannot fail");

        let fft_size = self.fft_size as f64;
        let mut sum_sq = 2.0 * self.autocorr[0] as f64 / fft_size;

        let count = (self.analysis_window + 1) / 2;
        let mut nsdf = vec![0.0_f32; count];
        for k in 0..count {
            sum_sq -= (input[self.analysis_window - 1 - k] as f64).powi(2)
                + (input[k] as f64).powi(2);
            nsdf[k] = if sum_sq > 0.0 {
                (2.0 * self.autocorr[k + 1] as f64 / (fft_size * sum_sq)) as f32
            } else {
                0.0
            };
        }

        let mut frequency = 0.0_f32;
        if let Some(index) = find_sub_maximum(&nsdf, SUB_MAXIMUM_THRESHOLD) {
            let x_refined = parabola_turning_point(
                nsdf[index - 1],
                nsdf[index],
                nsdf[index + 1],
                (index + 1) as f32,
            );
            frequency = internal_rate / x_refined;
            if frequency > FREQUENCY_CLAMP_HZ {
                frequency = 0.0;
            }
        }

        frequency
    }
}

/// Parabolic refinement of the turning point around `(y_minus1, y0, y1)`,
/// anchored at `x_offset`.
fn parabola_turning_point(y_minus1: f32, y0: f32, y1: f32, x_offset: f32) -> f32 {
    let y_top = y_minus1 - y1;
    let y_bottom = y1 + y_minus1 - 2.0 * y0;
    if y_bottom != 0.0 {
        x_offset + y_top / (2.0 * y_bottom)
    } else {
        x_offset
    }
}

/// Find the first local maximum whose value clears the dynamic cutoff
/// derived from the tallest maximum in `input`. Returns `None` if no maxima
/// were found at all.
fn find_sub_maximum(input: &[f32], threshold: f32) -> Option<usize> {
    let mut maxima = Vec::with_capacity(MAX_MAXIMA);
    let overall_max_index = find_maxima(input, &mut maxima, MAX_MAXIMA)?;

    let adjusted = threshold + (1.0 - threshold) * (1.0 - input[overall_max_index]);
    let cutoff = input[overall_max_index] * adjusted;

    maxima.iter().copied().find(|&i| input[i] >= cutoff)
}

/// Walk `input`, tracking the tallest local maximum within each positive
/// lobe (between negative zero crossings). Returns the index of the tallest
/// maximum overall, or `None` if none were found.
///
/// The initial advance over the leading positive lobe is capped at
/// `(len - 1) / 3` samples: a quirk of the source this was derived from,
/// preserved exactly rather than "fixed", since changing it would shift
/// which lobe is treated as the fundamental on short buffers.
fn find_maxima(input: &[f32], maxima: &mut Vec<usize>, max_len: usize) -> Option<usize> {
    let len = input.len();
    if len < 3 {
        return None;
    }

    let mut pos = 0usize;
    let cap = (len - 1) / 3;
    while pos < cap && input[pos] > 0.0 {
        pos += 1;
    }
    while pos < len - 1 && input[pos] <= 0.0 {
        pos += 1;
    }
    if pos == 0 {
        pos = 1;
    }

    let mut cur_max_pos = 0usize;
    let mut overall_max_index = 0usize;

    while pos < len - 1 {
        if input[pos] > input[pos - 1] && input[pos] >= input[pos + 1] {
            if cur_max_pos == 0 {
                cur_max_pos = pos;
            } else if input[pos] > input[cur_max_pos] {
                cur_max_pos = pos;
            }
        }
        pos += 1;
        if pos < len - 1 && input[pos] <= 0.0 {
            if cur_max_pos > 0 {
                maxima.push(cur_max_pos);
                if overall_max_index == 0 || input[cur_max_pos] > input[overall_max_index] {
                    overall_max_index = cur_max_pos;
                }
                if maxima.len() >= max_len {
                    return Some(overall_max_index);
                }
                cur_max_pos = 0;
            }
            while pos < len - 1 && input[pos] <= 0.0 {
                pos += 1;
            }
        }
    }
    if cur_max_pos > 0 {
        maxima.push(cur_max_pos);
        if overall_max_index == 0 || input[cur_max_pos] > input[overall_max_index] {
            overall_max_index = cur_max_pos;
        }
    }

    if maxima.is_empty() {
        None
    } else {
        Some(overall_max_index)
    }
}
