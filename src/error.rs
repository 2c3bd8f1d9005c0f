//! Error types for the pitch-tracking core.
//!
//! These never unwind onto the audio thread: `initialize` surfaces them
//! synchronously and logs via `nih_log`, after which the plugin degrades to
//! dry pass-through until the host retries initialization.

use thiserror::Error;

/// Failures that can occur while (re)configuring the tracker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// FFT plan creation or scratch-buffer allocation failed.
    #[error("pitch tracker init failed: {reason}")]
    InitError { reason: String },

    /// The resampler could not represent the requested host/internal rate ratio.
    #[error("resampler configuration rejected: {reason}")]
    ResamplerConfig { reason: String },
}
