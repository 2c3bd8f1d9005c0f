//! Asynchronous pitch tracker facade: wires C2 (resampler) through C3 (ring
//! buffer) and C4–C6 (gate, estimator, worker) into the single `add`/`reset`
//! surface the plugin facade (C8) drives per audio block.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::{TrackerConfig, DOWNSAMPLE, FFT_SIZE, INTERNAL_RATE};
use crate::dsp::estimator::PitchEstimator;
use crate::dsp::gate::SignalGate;
use crate::dsp::resampler::Resampler32;
use crate::dsp::ring_buffer::RingBuffer;
use crate::dsp::worker::{Trigger, Worker};
use crate::error::TrackerError;

/// Runs on the audio thread: resamples, ring-buffers, and on the scheduled
/// period hands a snapshot frame off to the worker thread.
pub struct PitchTracker {
    resampler: Resampler32,
    ring: RingBuffer,
    tick: u32,
    trigger: Arc<Trigger>,
    snapshot: Arc<Mutex<Vec<f32>>>,
    worker: Worker,
    /// Mirrors the worker's last published frequency so `process` can read
    /// it without crossing back through the callback.
    last_published: Arc<AtomicU32>,
    config: TrackerConfig,
}

impl PitchTracker {
    /// Build the tracker for a given host sample rate, spawning the worker
    /// thread immediately. `on_freq_changed` is invoked on the worker thread
    /// (and, for the silence-on-bypass case, by the caller itself) whenever
    /// the published frequency changes.
    pub fn new(
        host_rate: f32,
        config: TrackerConfig,
        on_freq_changed: Arc<dyn Fn(f32) + Send + Sync>,
    ) -> Result<Self, TrackerError> {
        let resampler = Resampler32::new(host_rate)?;
        let ring = RingBuffer::new(FFT_SIZE);
        let estimator = PitchEstimator::new(FFT_SIZE)?;

        let trigger = Trigger::new();
        let snapshot = Arc::new(Mutex::new(vec![0.0_f32; FFT_SIZE]));
        let last_published = Arc::new(AtomicU32::new(u32::MAX));

        let worker = Worker::start(Arc::clone(&trigger), {
            let snapshot = Arc::clone(&snapshot);
            let last_published = Arc::clone(&last_published);
            let mut estimator = estimator;
            let mut gate = SignalGate::default();
            let config = config;
            move || {
                let frame = snapshot.lock();
                let gate_open =
                    gate.update(&frame, config.signal_threshold_on, config.signal_threshold_off);
                // gate-closed and gate-open both funnel through the same
                // `last_published` compare-and-swap, mirroring the original
                // single `m_freq` field: a reopen to an unchanged pitch must
                // still re-fire the callback after a gate-closed 0 publish.
                let new_freq = if gate_open {
                    estimator.estimate(&frame, INTERNAL_RATE as f32)
                } else {
                    0.0
                };
                drop(frame);
                let prev_bits = last_published.swap(new_freq.to_bits(), Ordering::AcqRel);
                if prev_bits != new_freq.to_bits() {
                    on_freq_changed(new_freq);
                }
            }
        });

        Ok(Self {
            resampler,
            ring,
            tick: 0,
            trigger,
            snapshot,
            worker,
            last_published,
            config,
        })
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    pub fn set_config(&mut self, config: TrackerConfig) {
        self.config = config;
    }

    /// Last frequency published by the worker (or 0.0 before the first
    /// analysis pass).
    pub fn last_frequency(&self) -> f32 {
        let bits = self.last_published.load(Ordering::Acquire);
        if bits == u32::MAX {
            0.0
        } else {
            f32::from_bits(bits)
        }
    }

    pub fn reset(&mut self) {
        self.tick = 0;
        self.ring.reset();
        self.resampler.reset();
        self.last_published.store(u32::MAX, Ordering::Release);
    }

    /// Feed one block of host-rate mono samples through the resampler and,
    /// once enough wall-clock time has elapsed, trigger the worker with a
    /// fresh analysis-window snapshot.
    ///
    /// The wake period is measured in host-rate sample counts against the
    /// *fixed* internal rate, not the host rate itself: this mirrors the
    /// original implementation's `tick * count >= fixed_sample_rate *
    /// tracker_period` check exactly, quirky as it is.
    pub fn add(&mut self, input: &[f32]) -> Result<(), TrackerError> {
        self.resampler.push(input, &mut self.ring)?;

        self.tick += 1;
        // internal_rate * downsample == fixed_sample_rate exactly, so this
        // reduces to fixed_sample_rate * tracker_period.
        let threshold = (INTERNAL_RATE * DOWNSAMPLE) as f32 * self.config.tracker_period;
        if (self.tick as f32) * (input.len() as f32) >= threshold {
            if self.trigger.is_busy() {
                return Ok(());
            }
            self.tick = 0;
            {
                let mut frame = self.snapshot.lock();
                self.ring.copy_into(FFT_SIZE, &mut frame);
            }
            self.trigger.notify();
        }
        Ok(())
    }

    /// Stop the worker thread. Idempotent; also called from `Drop`.
    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

impl Drop for PitchTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn sine(len: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
            .collect()
    }

    #[test]
    fn constructs_and_stops_cleanly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cb_calls = Arc::clone(&calls);
        let mut tracker = PitchTracker::new(
            48_000.0,
            TrackerConfig::default(),
            Arc::new(move |_f| {
                cb_calls.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        tracker.stop();
    }

    #[test]
    fn publishes_a_frequency_near_440hz_under_sustained_sine() {
        let last_freq = Arc::new(Mutex::new(0.0_f32));
        let cb_last = Arc::clone(&last_freq);
        let mut tracker = PitchTracker::new(
            48_000.0,
            TrackerConfig::default(),
            Arc::new(move |f| {
                *cb_last.lock() = f;
            }),
        )
        .unwrap();

        let block = sine(256, 440.0, 48_000.0);
        for _ in 0..400 {
            tracker.add(&block).unwrap();
        }
        std::thread::sleep(Duration::from_millis(100));

        let freq = *last_freq.lock();
        assert!(freq == 0.0 || (freq - 440.0).abs() < 5.0, "got {freq} Hz");
        tracker.stop();
    }

    #[test]
    fn silence_never_publishes_a_nonzero_frequency() {
        let saw_nonzero = Arc::new(Mutex::new(false));
        let cb_flag = Arc::clone(&saw_nonzero);
        let mut tracker = PitchTracker::new(
            48_000.0,
            TrackerConfig::default(),
            Arc::new(move |f| {
                if f != 0.0 {
                    *cb_flag.lock() = true;
                }
            }),
        )
        .unwrap();

        let block = vec![0.0_f32; 512];
        for _ in 0..200 {
            tracker.add(&block).unwrap();
        }
        std::thread::sleep(Duration::from_millis(100));
        assert!(!*saw_nonzero.lock());
        tracker.stop();
    }

    #[test]
    fn gate_reopen_to_identical_frequency_republishes_after_zero() {
        let published = Arc::new(Mutex::new(Vec::new()));
        let cb_published = Arc::clone(&published);
        let mut tracker = PitchTracker::new(
            48_000.0,
            TrackerConfig::default(),
            Arc::new(move |f| cb_published.lock().push(f)),
        )
        .unwrap();

        let tone = sine(256, 440.0, 48_000.0);
        let silence = vec![0.0_f32; 256];

        for _ in 0..400 {
            tracker.add(&tone).unwrap();
        }
        std::thread::sleep(Duration::from_millis(100));

        for _ in 0..400 {
            tracker.add(&silence).unwrap();
        }
        std::thread::sleep(Duration::from_millis(100));

        for _ in 0..400 {
            tracker.add(&tone).unwrap();
        }
        std::thread::sleep(Duration::from_millis(100));
        tracker.stop();

        let values = published.lock().clone();
        assert!(
            values.iter().any(|&f| f == 0.0),
            "expected a zero publish when the gate closed: {values:?}"
        );
        assert!(
            values.last().is_some_and(|&f| (f - 440.0).abs() < 5.0),
            "expected the tracker to republish ~440Hz after reopening to the same tone: {values:?}"
        );
    }

    #[test]
    fn reset_clears_published_frequency_mirror() {
        let mut tracker =
            PitchTracker::new(48_000.0, TrackerConfig::default(), Arc::new(|_f| {})).unwrap();
        tracker.reset();
        assert_eq!(tracker.last_frequency(), 0.0);
        tracker.stop();
    }
}
