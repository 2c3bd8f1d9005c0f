//! Compile-time-constant tracker configuration.
//!
//! Grouping the thresholds here (rather than scattering literals through
//! `dsp::tracker`) is what lets fast-note mode and tests build a tracker with
//! non-default thresholds without touching the estimation algorithm.

/// Ring buffer / FFT analysis window size, in analysis-rate samples.
pub const FFT_SIZE: usize = 2048;

/// Declared internal sample rate before the downsample factor is applied.
///
/// The original implementation passes `41000`, not `44100`; preserved exactly
/// per the source this specification was distilled from.
pub const FIXED_SAMPLE_RATE: u32 = 41_000;

/// Downsample factor applied to `FIXED_SAMPLE_RATE` to get the internal
/// analysis rate.
pub const DOWNSAMPLE: u32 = 2;

/// `FIXED_SAMPLE_RATE / DOWNSAMPLE`.
pub const INTERNAL_RATE: u32 = FIXED_SAMPLE_RATE / DOWNSAMPLE;

const SIGNAL_THRESHOLD_ON: f32 = 0.001;
const SIGNAL_THRESHOLD_OFF: f32 = 0.0009;
const TRACKER_PERIOD: f32 = 0.1;

/// Runtime-tunable thresholds for the signal gate and tracker clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Mean(|x|) at or above which the gate opens.
    pub signal_threshold_on: f32,
    /// Mean(|x|) below which the gate closes.
    pub signal_threshold_off: f32,
    /// Wall-clock seconds between analysis passes.
    pub tracker_period: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            signal_threshold_on: SIGNAL_THRESHOLD_ON,
            signal_threshold_off: SIGNAL_THRESHOLD_OFF,
            tracker_period: TRACKER_PERIOD,
        }
    }
}

impl TrackerConfig {
    /// Set an explicit "activation" threshold; the deactivation threshold
    /// trails it at 90%, mirroring the original `set_threshold` behavior.
    pub fn with_threshold(mut self, on: f32) -> Self {
        self.signal_threshold_on = on;
        self.signal_threshold_off = on * 0.9;
        self
    }

    /// Fast-note mode scales both thresholds by 5x and shortens the tracker
    /// period to a tenth, trading robustness for faster response.
    pub fn fast_note(enabled: bool) -> Self {
        if enabled {
            Self {
                signal_threshold_on: SIGNAL_THRESHOLD_ON * 5.0,
                signal_threshold_off: SIGNAL_THRESHOLD_OFF * 5.0,
                tracker_period: TRACKER_PERIOD / 10.0,
            }
        } else {
            Self::default()
        }
    }
}
