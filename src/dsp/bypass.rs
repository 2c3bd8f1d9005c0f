//! Bypass cross-fade ramp (C7).
//!
//! Flipping the bypass switch mid-stream would otherwise click: instead the
//! wet and dry signals are cross-faded over `ramp_step` samples, and the
//! tracker/filter path is only actually skipped once the ramp-down has
//! fully completed.

/// Result of running one block through the ramp: whether the analysis path
/// (filters + pitch tracker) should run this block, and whether the ramp
/// just finished bringing the plugin fully into bypass (in which case the
/// caller must publish `freq = 0`).
pub struct RampOutcome {
    pub run_analysis: bool,
    pub just_fully_bypassed: bool,
}

/// Cross-fade ramp state machine, one instance per plugin.
pub struct BypassRamp {
    ramp_step: f32,
    ramp_down: f32,
    ramp_up: f32,
    needs_ramp_down: bool,
    needs_ramp_up: bool,
    bypassed: bool,
    /// Last bypass parameter value observed, to detect toggles.
    last_bypass: bool,
}

impl BypassRamp {
    /// `ramp_step = 32 * 256 * host_rate / 48000`, matching the original's
    /// sample-rate-scaled ramp duration.
    pub fn new(host_rate: f32) -> Self {
        let ramp_step = 32.0 * 256.0 * host_rate / 48_000.0;
        Self {
            ramp_step,
            ramp_down: ramp_step,
            ramp_up: 0.0,
            needs_ramp_down: false,
            needs_ramp_up: false,
            bypassed: false,
            last_bypass: false,
        }
    }

    pub fn bypassed(&self) -> bool {
        self.bypassed
    }

    /// Recompute `ramp_step` for a new host sample rate and reset ramp
    /// progress, without touching `bypassed`/`needs_ramp_*` state.
    pub fn set_sample_rate(&mut self, host_rate: f32) {
        self.ramp_step = 32.0 * 256.0 * host_rate / 48_000.0;
        self.ramp_down = self.ramp_step;
        self.ramp_up = 0.0;
    }

    /// Inform the ramp of the current `bypass` parameter value. Call once
    /// per block before [`BypassRamp::process_block`].
    pub fn set_bypass_requested(&mut self, bypass: bool) {
        if bypass != self.last_bypass {
            self.last_bypass = bypass;
            if bypass {
                self.needs_ramp_down = true;
                self.needs_ramp_up = false;
            } else {
                self.needs_ramp_down = false;
                self.needs_ramp_up = true;
                self.bypassed = false;
            }
        }
    }

    /// Cross-fade `wet` (already filtered/tracked output) against `dry`
    /// (the untouched input) in place, advancing ramp state by `wet.len()`
    /// samples. Returns whether the analysis path should run and whether
    /// bypass just fully engaged.
    pub fn process_block(&mut self, wet: &mut [f32], dry: &[f32]) -> RampOutcome {
        debug_assert_eq!(wet.len(), dry.len());
        let mut just_fully_bypassed = false;

        if self.needs_ramp_down {
            for (w, d) in wet.iter_mut().zip(dry.iter()) {
                if self.ramp_down >= 0.0 {
                    self.ramp_down -= 1.0;
                }
                let fade = self.ramp_down.max(0.0) / self.ramp_step;
                *w = *w * fade + d * (1.0 - fade);
            }
            if self.ramp_down <= 0.0 {
                self.needs_ramp_down = false;
                self.bypassed = true;
                just_fully_bypassed = true;
                self.ramp_down = self.ramp_step;
                self.ramp_up = 0.0;
            } else {
                self.ramp_up = self.ramp_down;
            }
        } else if self.needs_ramp_up {
            for (w, d) in wet.iter_mut().zip(dry.iter()) {
                if self.ramp_up < self.ramp_step {
                    self.ramp_up += 1.0;
                }
                let fade = self.ramp_up.min(self.ramp_step) / self.ramp_step;
                *w = *w * fade + d * (1.0 - fade);
            }
            if self.ramp_up >= self.ramp_step {
                self.needs_ramp_up = false;
                self.ramp_up = 0.0;
                self.ramp_down = self.ramp_step;
            } else {
                self.ramp_down = self.ramp_up;
            }
        }

        RampOutcome {
            run_analysis: !self.bypassed,
            just_fully_bypassed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_step_scales_with_sample_rate() {
        let ramp = BypassRamp::new(48_000.0);
        assert_eq!(ramp.ramp_step, 32.0 * 256.0);
        let ramp96 = BypassRamp::new(96_000.0);
        assert_eq!(ramp96.ramp_step, 32.0 * 256.0 * 2.0);
    }

    #[test]
    fn toggling_bypass_on_starts_ramp_down() {
        let mut ramp = BypassRamp::new(48_000.0);
        ramp.set_bypass_requested(true);
        let mut wet = vec![1.0_f32; 64];
        let dry = vec![0.5_f32; 64];
        let outcome = ramp.process_block(&mut wet, &dry);
        assert!(outcome.run_analysis);
        assert!(!outcome.just_fully_bypassed);
        // partway through the fade, output should sit strictly between wet and dry.
        assert!(wet[0] < 1.0 && wet[0] > 0.5);
    }

    #[test]
    fn ramp_down_completes_and_reports_fully_bypassed() {
        let mut ramp = BypassRamp::new(48_000.0);
        ramp.set_bypass_requested(true);
        let step = ramp.ramp_step.ceil() as usize;
        let mut saw_complete = false;
        for _ in 0..(step / 64 + 2) {
            let mut wet = vec![1.0_f32; 64];
            let dry = vec![0.0_f32; 64];
            let outcome = ramp.process_block(&mut wet, &dry);
            if outcome.just_fully_bypassed {
                saw_complete = true;
                assert!(!outcome.run_analysis);
                break;
            }
        }
        assert!(saw_complete);
        assert!(ramp.bypassed());
    }

    #[test]
    fn toggling_bypass_off_resumes_analysis_and_ramps_up() {
        let mut ramp = BypassRamp::new(48_000.0);
        ramp.set_bypass_requested(true);
        let step = ramp.ramp_step.ceil() as usize;
        for _ in 0..(step / 64 + 2) {
            let mut wet = vec![0.0_f32; 64];
            let dry = vec![0.0_f32; 64];
            ramp.process_block(&mut wet, &dry);
        }
        assert!(ramp.bypassed());

        ramp.set_bypass_requested(false);
        let mut wet = vec![1.0_f32; 64];
        let dry = vec![0.3_f32; 64];
        let outcome = ramp.process_block(&mut wet, &dry);
        assert!(outcome.run_analysis);
        assert!(!ramp.bypassed());
    }

    #[test]
    fn mid_ramp_reversal_resumes_from_current_fade_level() {
        let mut ramp = BypassRamp::new(48_000.0);
        ramp.set_bypass_requested(true);
        let mut wet = vec![1.0_f32; 64];
        let dry = vec![0.0_f32; 64];
        ramp.process_block(&mut wet, &dry);
        let ramp_down_after_one_block = ramp.ramp_down;

        // reverse direction before the down-ramp completes.
        ramp.set_bypass_requested(false);
        assert_eq!(ramp.ramp_up, ramp_down_after_one_block);
    }
}
