//! Biquad low-cut / high-cut filter chain (C1).
//!
//! Two cascaded 2nd-order IIR sections precondition the signal before it
//! reaches the resampler: a high-pass removes DC and sub-audio rumble, a
//! low-pass keeps the downstream analysis inside the band the pitch
//! estimator actually cares about. Coefficients depend only on the host
//! sample rate and are recomputed whenever it changes.

use biquad::{Biquad as _, Coefficients, DirectForm1, ToHertz, Type as FilterType, Q_BUTTERWORTH_F32};

use crate::error::TrackerError;

const LOW_CUT_HZ: f32 = 20.0;
const HIGH_CUT_HZ: f32 = 1_000.0;

/// Cascaded low-cut + high-cut biquad chain, operated in place on a block.
pub struct BiquadChain {
    low_cut: DirectForm1<f32>,
    high_cut: DirectForm1<f32>,
}

impl BiquadChain {
    /// Build the chain for a given host sample rate.
    pub fn new(sample_rate: f32) -> Result<Self, TrackerError> {
        let low_cut_coeffs = Coefficients::<f32>::from_params(
            FilterType::HighPass,
            sample_rate.hz(),
            LOW_CUT_HZ.hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|e| TrackerError::InitError {
            reason: format!("low-cut biquad coefficients: {e:?}"),
        })?;
        let high_cut_coeffs = Coefficients::<f32>::from_params(
            FilterType::LowPass,
            sample_rate.hz(),
            HIGH_CUT_HZ.hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|e| TrackerError::InitError {
            reason: format!("high-cut biquad coefficients: {e:?}"),
        })?;

        Ok(Self {
            low_cut: DirectForm1::<f32>::new(low_cut_coeffs),
            high_cut: DirectForm1::<f32>::new(high_cut_coeffs),
        })
    }

    /// Filter `block` in place, low-cut then high-cut, sample by sample.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            let low_cut_out = self.low_cut.run(*sample);
            *sample = self.high_cut.run(low_cut_out);
        }
    }
}
