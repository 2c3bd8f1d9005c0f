//! Host-rate to internal-rate polyphase resampler (C2).
//!
//! The original implementation drives a streaming resampler with a manual
//! "consume what you can, produce what you can, loop" protocol around a
//! fixed-size output window. `rubato`'s `SincFixedIn` wants fixed-size input
//! chunks instead, so this wraps it with a small staging buffer that plays
//! the same role as the original's leftover-sample bookkeeping: host blocks
//! almost never line up with the resampler's chunk size, so samples
//! accumulate here between `push` calls and whole chunks drain out to the
//! ring buffer as soon as there are enough of them.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::config::INTERNAL_RATE;
use crate::dsp::ring_buffer::RingBuffer;
use crate::error::TrackerError;

/// Input chunk size the inner `SincFixedIn` is configured for. Small enough
/// to keep latency low, large enough that the sinc interpolator's quality
/// settings are meaningful.
const CHUNK_SIZE: usize = 256;

/// Converts a mono host-rate stream into the fixed internal analysis rate
/// and writes the result straight into a [`RingBuffer`].
pub struct Resampler32 {
    inner: SincFixedIn<f32>,
    staging: Vec<f32>,
    // scratch reused across calls to avoid per-block allocation.
    chunk_in: Vec<Vec<f32>>,
}

impl Resampler32 {
    /// Build a resampler converting from `host_rate` Hz down to
    /// [`INTERNAL_RATE`]. Fails if `rubato` rejects the resulting ratio.
    pub fn new(host_rate: f32) -> Result<Self, TrackerError> {
        let ratio = INTERNAL_RATE as f64 / host_rate as f64;
        // least-quality tier: short sinc table, low oversampling, cheap
        // window, matching the original resampler's `setup(..., 16)` (16 ==
        // least quality) rather than rubato's high-quality preset.
        let params = SincInterpolationParameters {
            sinc_len: 16,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 16,
            window: WindowFunction::Hann,
        };
        let inner = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1).map_err(|e| {
            TrackerError::ResamplerConfig {
                reason: format!("host rate {host_rate} Hz -> internal rate {INTERNAL_RATE} Hz: {e:?}"),
            }
        })?;

        Ok(Self {
            inner,
            staging: Vec::with_capacity(CHUNK_SIZE * 2),
            chunk_in: vec![Vec::with_capacity(CHUNK_SIZE)],
        })
    }

    /// Reset internal resampler state and drop any staged input. Called
    /// whenever the host sample rate changes and a fresh resampler is built
    /// in its place, or when the tracker itself is reset.
    pub fn reset(&mut self) {
        self.inner.reset();
        self.staging.clear();
    }

    /// Feed `input` (host-rate mono samples) through the resampler, writing
    /// every complete internal-rate chunk it produces into `ring`. Drains
    /// the staging buffer in `CHUNK_SIZE` units, looping until fewer than a
    /// full chunk remains staged.
    pub fn push(&mut self, input: &[f32], ring: &mut RingBuffer) -> Result<(), TrackerError> {
        self.staging.extend_from_slice(input);

        let mut offset = 0;
        while self.staging.len() - offset >= CHUNK_SIZE {
            self.chunk_in[0].clear();
            self.chunk_in[0].extend_from_slice(&self.staging[offset..offset + CHUNK_SIZE]);
            offset += CHUNK_SIZE;

            let out = self
                .inner
                .process(&self.chunk_in, None)
                .map_err(|e| TrackerError::ResamplerConfig {
                    reason: format!("resample process failed: {e:?}"),
                })?;
            ring.write(&out[0]);
        }

        if offset > 0 {
            self.staging.drain(..offset);
        }
        Ok(())
    }
}
