/*
 * Copyright (C) 2026 Convolution DEV
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use nih_plug::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod config;
pub mod dsp;
pub mod error;

use crate::config::TrackerConfig;
use crate::dsp::biquad_chain::BiquadChain;
use crate::dsp::bypass::{BypassRamp, RampOutcome};
use crate::dsp::tracker::PitchTracker;

/// Real-time monophonic pitch-detection core, packaged as the audio effect
/// it accompanies: bypass-crossfaded biquad preconditioning feeding an
/// asynchronous autocorrelation pitch tracker.
pub struct GuitarTunerPitch {
    params: Arc<TunerParams>,

    filters: Option<BiquadChain>,
    tracker: Option<PitchTracker>,
    bypass_ramp: BypassRamp,

    sample_rate: f32,
    /// Set for the duration of a sample-rate reconfiguration; gates
    /// `process` back to dry pass-through until `initialize` completes.
    sr_changed: Arc<AtomicBool>,
    /// Mirrors the tracker's last published frequency into the `freq`
    /// output parameter on the next `process` call.
    freq_output: Arc<AtomicF32>,

    dry: Vec<f32>,
}

#[derive(Params)]
struct TunerParams {
    #[id = "bypass"]
    pub bypass: BoolParam,
    #[id = "freq"]
    pub freq: FloatParam,
    #[id = "ref_freq"]
    pub ref_freq: FloatParam,
}

impl Default for TunerParams {
    fn default() -> Self {
        Self {
            bypass: BoolParam::new("Bypass", false)
                .with_value_to_string(formatters::v2s_bool_bypass())
                .with_string_to_value(formatters::s2v_bool_bypass()),

            freq: FloatParam::new("Frequency", 0.0, FloatRange::Linear { min: 0.0, max: 1000.0 })
                .with_unit(" Hz")
                .with_value_to_string(formatters::v2s_f32_rounded(1))
                .non_automatable(),

            ref_freq: FloatParam::new(
                "Reference Frequency",
                440.0,
                FloatRange::Linear { min: 432.0, max: 452.0 },
            )
            .with_unit(" Hz")
            .with_value_to_string(formatters::v2s_f32_rounded(1)),
        }
    }
}

impl Default for GuitarTunerPitch {
    fn default() -> Self {
        Self {
            params: Arc::new(TunerParams::default()),
            filters: None,
            tracker: None,
            bypass_ramp: BypassRamp::new(44_100.0),
            sample_rate: 44_100.0,
            sr_changed: Arc::new(AtomicBool::new(false)),
            freq_output: Arc::new(AtomicF32::new(0.0)),
            dry: Vec::new(),
        }
    }
}

impl GuitarTunerPitch {
    /// (Re)build the filter chain and pitch tracker for `sample_rate`,
    /// wiring the tracker's freq-changed callback to mirror into
    /// `freq_output`. Logs and returns `false` on failure, per the
    /// "never unwind onto the audio thread" discipline.
    fn reinitialize(&mut self, sample_rate: f32) -> bool {
        self.sample_rate = sample_rate;
        self.bypass_ramp.set_sample_rate(sample_rate);

        let filters = match BiquadChain::new(sample_rate) {
            Ok(f) => f,
            Err(e) => {
                nih_error!("failed to build biquad chain: {e}");
                return false;
            }
        };

        let freq_output = Arc::clone(&self.freq_output);
        let tracker = match PitchTracker::new(
            sample_rate,
            TrackerConfig::default(),
            Arc::new(move |freq| {
                freq_output.store(freq, Ordering::Relaxed);
            }),
        ) {
            Ok(t) => t,
            Err(e) => {
                nih_error!("failed to build pitch tracker: {e}");
                return false;
            }
        };

        self.filters = Some(filters);
        self.tracker = Some(tracker);
        true
    }
}

impl Plugin for GuitarTunerPitch {
    const NAME: &'static str = "Guitar Tuner Pitch Core";
    const VENDOR: &'static str = "Convolution DEV";
    const URL: &'static str = "https://github.com/minburg/stomp-tuner";
    const EMAIL: &'static str = "email@example.com";
    const VERSION: &'static str = "0.1.0";

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(1),
        main_output_channels: NonZeroU32::new(1),
        ..AudioIOLayout::const_default()
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _ctx: &mut impl InitContext<Self>,
    ) -> bool {
        self.sr_changed.store(true, Ordering::Release);
        let ok = self.reinitialize(buffer_config.sample_rate);
        self.dry = vec![0.0; buffer_config.max_buffer_size as usize];
        self.sr_changed.store(false, Ordering::Release);
        ok
    }

    fn reset(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _ctx: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        if self.sr_changed.load(Ordering::Acquire) {
            return ProcessStatus::Normal;
        }

        let channel_samples = buffer.as_slice();
        let Some(channel) = channel_samples.first_mut() else {
            return ProcessStatus::Normal;
        };
        let channel: &mut [f32] = channel;
        let frames = channel.len();

        if self.dry.len() < frames {
            self.dry.resize(frames, 0.0);
        }
        self.dry[..frames].copy_from_slice(channel);

        self.bypass_ramp
            .set_bypass_requested(self.params.bypass.value());

        let outcome = if self.bypass_ramp.bypassed() {
            // already fully bypassed: nothing to filter or track, dry
            // output was already copied into `channel`.
            RampOutcome {
                run_analysis: false,
                just_fully_bypassed: false,
            }
        } else {
            if let (Some(filters), Some(tracker)) = (self.filters.as_mut(), self.tracker.as_mut())
            {
                filters.process_block(channel);
                if let Err(e) = tracker.add(channel) {
                    nih_error!("pitch tracker add() failed: {e}");
                }
            }
            self.bypass_ramp
                .process_block(channel, &self.dry[..frames])
        };

        if outcome.just_fully_bypassed {
            self.freq_output.store(0.0, Ordering::Relaxed);
        }

        self.params
            .freq
            .set_plain_value(self.freq_output.load(Ordering::Relaxed));

        ProcessStatus::Normal
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        None
    }
}

impl Vst3Plugin for GuitarTunerPitch {
    const VST3_CLASS_ID: [u8; 16] = *b"GtrTunerPitchCor";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Tools, Vst3SubCategory::Analyzer];
}

nih_export_vst3!(GuitarTunerPitch);
